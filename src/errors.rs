use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

/// Failures raised by the persistence layer and the auth token service.
///
/// Absence of an entity on a `get` is not an error (it surfaces as
/// `Ok(None)`); `NotFound` is reserved for operations that were told to act
/// on a specific identifier.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("unknown include '{name}' for {entity}")]
    InvalidInclude { entity: &'static str, name: String },

    #[error("{entity} conflicts with an existing row: {detail}")]
    Conflict { entity: &'static str, detail: String },

    #[error("storage failure during {operation} on {entity}")]
    Storage {
        entity: &'static str,
        operation: &'static str,
        #[source]
        source: diesel::result::Error,
    },

    #[error("could not acquire a database connection")]
    Pool(#[source] deadpool::managed::PoolError<diesel_async::pooled_connection::PoolError>),

    #[error("{entity} insert did not report an assigned id")]
    MissingAssignedId { entity: &'static str },

    #[error("token requested before credential validation")]
    InvalidState,

    #[error("token signing failed")]
    TokenSigning(#[source] jsonwebtoken::errors::Error),

    #[error("password hashing failed")]
    PasswordHash(#[source] pwhash::error::Error),
}

impl RepoError {
    pub(crate) fn storage(
        entity: &'static str,
        operation: &'static str,
        source: diesel::result::Error,
    ) -> Self {
        Self::Storage {
            entity,
            operation,
            source,
        }
    }

    /// Like [`RepoError::storage`], but recognizes unique violations so the
    /// API layer can answer with a conflict instead of a blanket 500.
    pub(crate) fn on_write(
        entity: &'static str,
        operation: &'static str,
        source: diesel::result::Error,
    ) -> Self {
        match source {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => Self::Conflict {
                entity,
                detail: info.message().to_string(),
            },
            other => Self::storage(entity, operation, other),
        }
    }
}

/// One field-level validation failure, reported back to the client as part
/// of a 400 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Everything a handler can fail with, mapped onto HTTP statuses in one
/// place so the handlers stay thin.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("invalid credentials")]
    Unauthorized,

    #[error("missing or invalid bearer token")]
    InvalidToken,

    #[error("insufficient role")]
    Forbidden,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Repo(err) => match err {
                RepoError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, json!({ "error": err.to_string() }))
                }
                RepoError::InvalidInclude { .. } => {
                    (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() }))
                }
                RepoError::Conflict { .. } => {
                    (StatusCode::CONFLICT, json!({ "error": err.to_string() }))
                }
                RepoError::Storage { .. }
                | RepoError::Pool(_)
                | RepoError::MissingAssignedId { .. }
                | RepoError::InvalidState
                | RepoError::TokenSigning(_)
                | RepoError::PasswordHash(_) => {
                    // Full cause stays in the log; the body must not leak
                    // keys, hashes, or driver detail.
                    error!(error = %err, "internal failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({ "error": "Internal Server Error. Please try again later." }),
                    )
                }
            },
            ApiError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation failed", "fields": fields }),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "invalid credentials" }),
            ),
            ApiError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "missing or invalid bearer token" }),
            ),
            ApiError::Forbidden => {
                (StatusCode::FORBIDDEN, json!({ "error": "insufficient role" }))
            }
        };
        (status, Json(body)).into_response()
    }
}
