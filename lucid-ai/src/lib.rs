//! lucid-ai library - AI-assist dispatcher
//!
//! Exposes the router and state for the binary and integration tests.

pub mod actions;
pub mod api;
pub mod dispatcher;
pub mod error;
pub mod gateway;

pub use crate::error::{AssistError, AssistResult};

use axum::Router;
use lucid_common::auth::AuthProvider;
use lucid_common::usage::FREE_MONTHLY_AI_ACTIONS;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::gateway::CompletionGateway;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared lucid.db pool (subscriptions, activity_log)
    pub db: SqlitePool,
    /// Bearer-token verification
    pub auth: Arc<dyn AuthProvider>,
    /// Chat-completions backend
    pub gateway: Arc<dyn CompletionGateway>,
    /// Model requested from the gateway
    pub model: String,
    /// AI actions per calendar month on the free plan
    pub free_monthly_limit: i64,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        auth: Arc<dyn AuthProvider>,
        gateway: Arc<dyn CompletionGateway>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            db,
            auth,
            gateway,
            model: model.into(),
            free_monthly_limit: FREE_MONTHLY_AI_ACTIONS,
        }
    }
}

/// Build application router
///
/// CORS is open: the endpoint is called from the browser app with a bearer
/// token, never with cookies.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::assist_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
