use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {0}")]
    Invalid(&'static str),
}

/// Token-signing settings, read once at startup. The key is never logged
/// and never appears in responses.
#[derive(Clone)]
pub struct JwtSettings {
    pub key: String,
    pub issuer: String,
    pub lifetime_hours: i64,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("lifetime_hours", &self.lifetime_hours)
            .finish()
    }
}

/// Process-wide configuration. Loaded from the environment exactly once;
/// request input never feeds into any of these values.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub max_page_size: u32,
    pub jwt: JwtSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let key = env::var("JWT_KEY").map_err(|_| ConfigError::Missing("JWT_KEY"))?;
        let issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "HotelListingApi".to_string());
        let lifetime_hours = match env::var("JWT_LIFETIME_HOURS") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or(ConfigError::Invalid("JWT_LIFETIME_HOURS"))?,
            Err(_) => 24,
        };
        let max_page_size = match env::var("MAX_PAGE_SIZE") {
            Ok(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::Invalid("MAX_PAGE_SIZE"))?,
            Err(_) => 50,
        };
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3002".to_string());

        Ok(Self {
            database_url,
            bind_addr,
            max_page_size,
            jwt: JwtSettings {
                key,
                issuer,
                lifetime_hours,
            },
        })
    }
}
