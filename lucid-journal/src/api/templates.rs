//! Template endpoints

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use lucid_common::models::{Module, Template};
use lucid_common::time;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::CurrentUser;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::db::templates::{self, NewTemplate};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub module: Option<Module>,
}

/// GET /api/templates?module=
pub async fn list_templates(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<TemplateQuery>,
) -> ApiResult<Json<Vec<Template>>> {
    Ok(Json(templates::list(&state.db, user.id(), query.module).await?))
}

/// POST /api/templates
pub async fn create_template(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(new): ApiJson<NewTemplate>,
) -> ApiResult<(StatusCode, Json<Template>)> {
    let template = templates::insert(&state.db, user.id(), &new, time::now()).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// DELETE /api/templates/:id
pub async fn delete_template(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    templates::delete(&state.db, user.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn template_routes() -> Router<AppState> {
    Router::new()
        .route("/api/templates", get(list_templates).post(create_template))
        .route("/api/templates/:id", delete(delete_template))
}
