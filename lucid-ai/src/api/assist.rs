//! AI-assist endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::actions::{self, ActionInfo};
use crate::dispatcher::{self, AssistRequest, AssistResponse};
use crate::error::{AssistError, AssistResult};
use crate::AppState;

/// POST /ai-assist
///
/// The body is taken as a `Result` so that a missing token is reported as
/// 401 even when the body is also malformed.
pub async fn post_assist(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AssistRequest>, JsonRejection>,
) -> AssistResult<Json<AssistResponse>> {
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if lucid_common::auth::bearer_token(authorization).is_none() {
        return Err(AssistError::MissingToken);
    }

    let Json(request) = body.map_err(|e| AssistError::BadRequest(e.body_text()))?;

    let response = dispatcher::dispatch(&state, authorization, request).await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct ActionsResponse {
    pub actions: Vec<ActionInfo>,
}

/// GET /ai-assist/actions
///
/// Public registry listing so clients can render Pro gating.
pub async fn list_actions() -> Json<ActionsResponse> {
    Json(ActionsResponse {
        actions: actions::all().iter().map(ActionInfo::from).collect(),
    })
}

pub fn assist_routes() -> Router<AppState> {
    Router::new()
        .route("/ai-assist", post(post_assist))
        .route("/ai-assist/actions", get(list_actions))
}
