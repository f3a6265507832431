//! Error type for the AI-assist endpoint
//!
//! Every variant maps to one HTTP status and a JSON body of the form
//! `{ "error": <message>, ...context }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("Missing authorization header")]
    MissingToken,

    #[error("Invalid or expired token")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Action {action} is not available in module {module}")]
    ActionModuleMismatch { action: String, module: String },

    #[error("Action {0} requires a Pro subscription")]
    ProRequired(String),

    #[error("Monthly AI usage limit reached ({used}/{limit})")]
    UsageLimitReached { limit: i64, used: i64 },

    #[error("AI gateway rate limit exceeded")]
    GatewayRateLimited,

    #[error("AI credits exhausted")]
    GatewayPaymentRequired,

    #[error("AI gateway error: {0}")]
    Gateway(String),

    #[error("Failed to parse AI response: {0}")]
    InvalidOutput(String),

    #[error("Auth provider unavailable: {0}")]
    AuthUnavailable(String),

    #[error(transparent)]
    Common(#[from] lucid_common::Error),
}

impl From<GatewayError> for AssistError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Status { status: 429, .. } => AssistError::GatewayRateLimited,
            GatewayError::Status { status: 402, .. } => AssistError::GatewayPaymentRequired,
            GatewayError::Status { status, .. } => {
                AssistError::Gateway(format!("gateway returned {}", status))
            }
            GatewayError::Network(msg) | GatewayError::Decode(msg) => AssistError::Gateway(msg),
            GatewayError::MissingToolCall => {
                AssistError::InvalidOutput("no tool call in response".to_string())
            }
            GatewayError::InvalidArguments(msg) => AssistError::InvalidOutput(msg),
        }
    }
}

impl AssistError {
    pub fn status(&self) -> StatusCode {
        match self {
            AssistError::MissingToken | AssistError::Unauthorized => StatusCode::UNAUTHORIZED,
            AssistError::BadRequest(_)
            | AssistError::UnknownAction(_)
            | AssistError::ActionModuleMismatch { .. } => StatusCode::BAD_REQUEST,
            AssistError::ProRequired(_) => StatusCode::FORBIDDEN,
            AssistError::UsageLimitReached { .. } | AssistError::GatewayRateLimited => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AssistError::GatewayPaymentRequired => StatusCode::PAYMENT_REQUIRED,
            AssistError::Gateway(_)
            | AssistError::InvalidOutput(_)
            | AssistError::AuthUnavailable(_)
            | AssistError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            AssistError::UnknownAction(action) => json!({
                "error": "Unknown action",
                "action": action,
            }),
            AssistError::ActionModuleMismatch { action, module } => json!({
                "error": "Action not available for this module",
                "action": action,
                "module": module,
            }),
            AssistError::ProRequired(action) => json!({
                "error": "This action requires a Pro subscription",
                "action": action,
                "requires_pro": true,
            }),
            AssistError::UsageLimitReached { limit, used } => json!({
                "error": "Monthly AI usage limit reached",
                "limit": limit,
                "used": used,
            }),
            AssistError::GatewayRateLimited => json!({
                "error": "Rate limit exceeded, please try again later",
            }),
            AssistError::GatewayPaymentRequired => json!({
                "error": "AI credits exhausted, please contact support",
            }),
            AssistError::Gateway(_) => json!({ "error": "AI gateway error" }),
            AssistError::InvalidOutput(details) => json!({
                "error": "Failed to parse AI response",
                "details": details,
            }),
            AssistError::AuthUnavailable(_) | AssistError::Common(_) => {
                json!({ "error": "Internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl IntoResponse for AssistError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "AI assist failed: {}", self);
        } else {
            tracing::info!(status = status.as_u16(), "AI assist rejected: {}", self);
        }

        (status, Json(self.body())).into_response()
    }
}

/// Result type for the dispatcher
pub type AssistResult<T> = Result<T, AssistError>;
