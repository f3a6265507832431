//! lucid-journal library - journal entities, reports and account read-outs
//!
//! Exposes the router and state for the binary and integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod report;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use lucid_common::auth::AuthProvider;
use lucid_common::usage::FREE_MONTHLY_AI_ACTIONS;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::cases::FREE_ACTIVE_CASES_PER_MODULE;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared lucid.db pool
    pub db: SqlitePool,
    /// Bearer-token verification
    pub auth: Arc<dyn AuthProvider>,
    /// Active cases per module on the free plan
    pub free_case_limit: i64,
    /// AI actions per calendar month on the free plan, for the read-out
    pub free_monthly_limit: i64,
}

impl AppState {
    pub fn new(db: SqlitePool, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            db,
            auth,
            free_case_limit: FREE_ACTIVE_CASES_PER_MODULE,
            free_monthly_limit: FREE_MONTHLY_AI_ACTIONS,
        }
    }
}

/// Build application router
///
/// Everything under `/api` authenticates through the `CurrentUser`
/// extractor; `/health` is public.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::case_routes())
        .merge(api::entry_routes())
        .merge(api::template_routes())
        .merge(api::silva_routes())
        .merge(api::workspace_routes())
        .merge(api::account_routes())
        .merge(api::report_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
