//! SILVA space endpoints

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use lucid_common::models::SilvaSpace;
use lucid_common::time;
use uuid::Uuid;

use super::auth::CurrentUser;
use super::extract::{ApiJson, ApiPath};
use crate::db::silva::{self, NewSilvaSpace, SilvaSpaceUpdate};
use crate::db::workspaces;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/silva
pub async fn list_spaces(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<SilvaSpace>>> {
    Ok(Json(silva::list(&state.db, user.id()).await?))
}

/// POST /api/silva
pub async fn create_space(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(new): ApiJson<NewSilvaSpace>,
) -> ApiResult<(StatusCode, Json<SilvaSpace>)> {
    if let Some(workspace_id) = new.workspace_id {
        if workspaces::membership(&state.db, workspace_id, user.id())
            .await?
            .is_none()
        {
            return Err(ApiError::Forbidden(format!(
                "not a member of workspace {}",
                workspace_id
            )));
        }
    }

    let space = silva::insert(&state.db, user.id(), &new, time::now()).await?;
    Ok((StatusCode::CREATED, Json(space)))
}

/// GET /api/silva/:id
pub async fn get_space(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<SilvaSpace>> {
    Ok(Json(silva::get(&state.db, user.id(), id).await?))
}

/// PATCH /api/silva/:id
pub async fn update_space(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<SilvaSpaceUpdate>,
) -> ApiResult<Json<SilvaSpace>> {
    Ok(Json(
        silva::update(&state.db, user.id(), id, &changes, time::now()).await?,
    ))
}

/// DELETE /api/silva/:id
pub async fn delete_space(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    silva::delete(&state.db, user.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn silva_routes() -> Router<AppState> {
    Router::new()
        .route("/api/silva", get(list_spaces).post(create_space))
        .route(
            "/api/silva/:id",
            get(get_space).patch(update_space).delete(delete_space),
        )
}
