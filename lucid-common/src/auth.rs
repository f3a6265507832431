//! Bearer-token authentication against the identity provider
//!
//! Tokens are issued by an external GoTrue-compatible auth service. A token
//! is valid when `GET {url}/auth/v1/user` answers 2xx with the user record.
//!
//! # Pure Functions
//!
//! Header parsing here is framework-agnostic; each service wraps
//! [`AuthProvider`] in its own axum extractor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthSettings;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization: Bearer` header
    #[error("Missing authorization header")]
    MissingToken,

    /// Provider rejected the token
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Provider unreachable or answered unexpectedly
    #[error("Auth provider unavailable: {0}")]
    Unavailable(String),
}

/// Extract the token from an `Authorization` header value
///
/// The scheme is matched case-insensitively; an empty token counts as absent.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let value = header?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Validates bearer tokens
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// GoTrue-compatible provider reached over HTTP
pub struct HttpAuthProvider {
    http_client: reqwest::Client,
    settings: AuthSettings,
}

impl HttpAuthProvider {
    pub fn new(settings: AuthSettings) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            settings,
        })
    }

    fn user_endpoint(&self) -> String {
        format!("{}/auth/v1/user", self.settings.url)
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let mut request = self.http_client.get(self.user_endpoint()).bearer_auth(token);
        if !self.settings.anon_key.is_empty() {
            request = request.header("apikey", &self.settings.anon_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AuthError::InvalidToken);
        }
        if !status.is_success() {
            return Err(AuthError::Unavailable(format!(
                "auth provider returned {}",
                status.as_u16()
            )));
        }

        let user: AuthUser = response
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(format!("invalid user payload: {}", e)))?;

        tracing::debug!(user_id = %user.id, "Token verified");
        Ok(user)
    }
}
