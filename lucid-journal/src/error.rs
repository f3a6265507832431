//! Error types for lucid-journal

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lucid_common::models::Module;
use serde_json::{json, Value};
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed or rejected bearer token (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found or owned by someone else (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Caller lacks the role for this operation (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Free plan active-case limit for one module (403)
    #[error("Free plan allows {limit} active cases in {module}")]
    CaseLimitReached { module: Module, limit: i64 },

    /// State transition not allowed (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Auth provider unreachable (500)
    #[error("Auth provider unavailable: {0}")]
    AuthUnavailable(String),

    /// lucid-common error
    #[error("Common error: {0}")]
    Common(lucid_common::Error),
}

impl From<lucid_common::Error> for ApiError {
    fn from(err: lucid_common::Error) -> Self {
        match err {
            lucid_common::Error::NotFound(what) => ApiError::NotFound(what),
            lucid_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Common(other),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Common(lucid_common::Error::Database(err))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) | ApiError::CaseLimitReached { .. } => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::AuthUnavailable(_) | ApiError::Common(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::CaseLimitReached { module, limit } => json!({
                "error": "case_limit_reached",
                "message": self.to_string(),
                "module": module,
                "limit": limit,
            }),
            ApiError::AuthUnavailable(_) | ApiError::Common(_) => {
                json!({ "error": "Internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self);
        } else {
            tracing::debug!(status = status.as_u16(), "Request rejected: {}", self);
        }

        (status, Json(self.body())).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
