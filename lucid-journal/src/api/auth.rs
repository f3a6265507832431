//! Bearer-token extractor
//!
//! Every `/api` handler takes a [`CurrentUser`]; its id scopes all queries.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use lucid_common::auth::{bearer_token, AuthError, AuthUser};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Verified caller
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthUser);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn email(&self) -> Option<&str> {
        self.0.email.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = bearer_token(header)
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

        let user = state.auth.verify(token).await.map_err(|e| match e {
            AuthError::MissingToken | AuthError::InvalidToken => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::Unavailable(msg) => ApiError::AuthUnavailable(msg),
        })?;

        Ok(CurrentUser(user))
    }
}
