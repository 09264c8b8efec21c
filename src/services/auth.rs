use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use pwhash::bcrypt;
use serde::{Deserialize, Serialize};

use crate::adapters::postgres::repositories::UnitOfWorkFactory;
use crate::config::JwtSettings;
use crate::dtos::users::UserDBDTO;
use crate::errors::{ApiError, RepoError};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub email: String,
    pub roles: Vec<String>,
    pub iss: String,
    pub iat: usize,
    pub exp: usize,
}

/// Two-phase login helper: `validate_user` must succeed before
/// `create_token` will sign anything.
pub struct AuthManager {
    settings: JwtSettings,
    uow_factory: UnitOfWorkFactory,
    validated: Option<UserDBDTO>,
}

impl AuthManager {
    pub fn new(settings: JwtSettings, uow_factory: UnitOfWorkFactory) -> Self {
        Self {
            settings,
            uow_factory,
            validated: None,
        }
    }

    /// Looks the user up by email and checks the password against the stored
    /// bcrypt hash. A missing user and a wrong password are indistinguishable
    /// to the caller.
    pub async fn validate_user(&mut self, email: &str, password: &str) -> Result<bool, RepoError> {
        use crate::adapters::postgres::{
            repositories::{Repository, UsersRepo},
            specifications::{CompType, UsersSpecification},
        };

        let mut uow = self.uow_factory.create_uow().await?;
        let user = UsersRepo::get_one_by(
            UsersSpecification::Email(CompType::Equals(email.to_string())),
            &[],
            &mut uow,
        )
        .await?;

        match user {
            Some(user) if bcrypt::verify(password, &user.hashed_pwd) => {
                self.validated = Some(user);
                Ok(true)
            }
            _ => {
                self.validated = None;
                Ok(false)
            }
        }
    }

    pub fn create_token(&self) -> Result<String, RepoError> {
        let user = self.validated.as_ref().ok_or(RepoError::InvalidState)?;

        let now = Utc::now();
        let exp = now + Duration::hours(self.settings.lifetime_hours);
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            iss: self.settings.issuer.clone(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.key.as_bytes()),
        )
        .map_err(RepoError::TokenSigning)
    }
}

pub fn decode_token(token: &str, settings: &JwtSettings) -> Result<Claims, ApiError> {
    let mut validation = Validation::default();
    validation.set_issuer(&[&settings.issuer]);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.key.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::InvalidToken)
}

/// Authenticated caller, extracted from the `Authorization: Bearer` header.
pub struct AuthUser {
    pub claims: Claims,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.claims.roles.iter().any(|r| r == "Administrator")
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;
        let claims = decode_token(token, &state.jwt)?;
        Ok(AuthUser { claims })
    }
}
