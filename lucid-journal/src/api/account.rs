//! Subscription read-out and AI activity history

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use lucid_common::models::{ActivityLogEntry, Subscription};
use lucid_common::usage::{self, UsageSummary};
use lucid_common::{activity, time};
use serde::{Deserialize, Serialize};

use super::auth::CurrentUser;
use super::extract::ApiQuery;
use crate::error::ApiResult;
use crate::AppState;

const DEFAULT_ACTIVITY_LIMIT: i64 = 50;
const MAX_ACTIVITY_LIMIT: i64 = 200;

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: Subscription,
    pub usage: UsageSummary,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

/// GET /api/subscription
///
/// The usage figures reflect a pending monthly reset without writing it;
/// the counter itself is only reset by the AI-assist service.
pub async fn get_subscription(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<SubscriptionResponse>> {
    let now = time::now();
    let subscription = usage::get_or_create_subscription(&state.db, user.id(), now).await?;
    let usage = UsageSummary::projected(&subscription, state.free_monthly_limit, now);

    Ok(Json(SubscriptionResponse {
        subscription,
        usage,
    }))
}

/// GET /api/activity?limit=
pub async fn list_activity(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> ApiResult<Json<Vec<ActivityLogEntry>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);
    Ok(Json(activity::list_for_user(&state.db, user.id(), limit).await?))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/api/subscription", get(get_subscription))
        .route("/api/activity", get(list_activity))
}
