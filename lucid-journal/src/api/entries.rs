//! Entry endpoints for the three structured modules

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use lucid_common::models::{Absence, InvisibleThreshold, Module, Threshold};
use lucid_common::time;
use uuid::Uuid;

use super::auth::CurrentUser;
use super::extract::{ApiJson, ApiPath};
use crate::db::entries::{
    self, AbsenceUpdate, InvisibleThresholdUpdate, NewAbsence, NewInvisibleThreshold,
    NewThreshold, ThresholdUpdate,
};
use crate::error::ApiResult;
use crate::AppState;

// ============================================================================
// IRREVERSA
// ============================================================================

/// GET /api/cases/:id/thresholds
pub async fn list_thresholds(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(case_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Threshold>>> {
    entries::case_for_entries(&state.db, user.id(), case_id, Module::Irreversa).await?;
    Ok(Json(entries::list_thresholds(&state.db, user.id(), case_id).await?))
}

/// POST /api/cases/:id/thresholds
pub async fn create_threshold(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(case_id): ApiPath<Uuid>,
    ApiJson(new): ApiJson<NewThreshold>,
) -> ApiResult<(StatusCode, Json<Threshold>)> {
    let row = entries::insert_threshold(&state.db, user.id(), case_id, &new, time::now()).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/thresholds/:id
pub async fn update_threshold(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<ThresholdUpdate>,
) -> ApiResult<Json<Threshold>> {
    Ok(Json(
        entries::update_threshold(&state.db, user.id(), id, &changes, time::now()).await?,
    ))
}

/// POST /api/thresholds/:id/cross
pub async fn cross_threshold(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Threshold>> {
    Ok(Json(
        entries::cross_threshold(&state.db, user.id(), id, time::now()).await?,
    ))
}

/// DELETE /api/thresholds/:id
pub async fn delete_threshold(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    entries::delete_threshold(&state.db, user.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// THRESH
// ============================================================================

/// GET /api/cases/:id/invisible-thresholds
pub async fn list_invisible_thresholds(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(case_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<InvisibleThreshold>>> {
    entries::case_for_entries(&state.db, user.id(), case_id, Module::Thresh).await?;
    Ok(Json(
        entries::list_invisible_thresholds(&state.db, user.id(), case_id).await?,
    ))
}

/// POST /api/cases/:id/invisible-thresholds
pub async fn create_invisible_threshold(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(case_id): ApiPath<Uuid>,
    ApiJson(new): ApiJson<NewInvisibleThreshold>,
) -> ApiResult<(StatusCode, Json<InvisibleThreshold>)> {
    let row =
        entries::insert_invisible_threshold(&state.db, user.id(), case_id, &new, time::now()).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/invisible-thresholds/:id
pub async fn update_invisible_threshold(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<InvisibleThresholdUpdate>,
) -> ApiResult<Json<InvisibleThreshold>> {
    Ok(Json(
        entries::update_invisible_threshold(&state.db, user.id(), id, &changes, time::now())
            .await?,
    ))
}

/// DELETE /api/invisible-thresholds/:id
pub async fn delete_invisible_threshold(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    entries::delete_invisible_threshold(&state.db, user.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// NULLA
// ============================================================================

/// GET /api/cases/:id/absences
pub async fn list_absences(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(case_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Absence>>> {
    entries::case_for_entries(&state.db, user.id(), case_id, Module::Nulla).await?;
    Ok(Json(entries::list_absences(&state.db, user.id(), case_id).await?))
}

/// POST /api/cases/:id/absences
pub async fn create_absence(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(case_id): ApiPath<Uuid>,
    ApiJson(new): ApiJson<NewAbsence>,
) -> ApiResult<(StatusCode, Json<Absence>)> {
    let row = entries::insert_absence(&state.db, user.id(), case_id, &new, time::now()).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/absences/:id
pub async fn update_absence(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<AbsenceUpdate>,
) -> ApiResult<Json<Absence>> {
    Ok(Json(
        entries::update_absence(&state.db, user.id(), id, &changes, time::now()).await?,
    ))
}

/// DELETE /api/absences/:id
pub async fn delete_absence(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    entries::delete_absence(&state.db, user.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn entry_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/cases/:id/thresholds",
            get(list_thresholds).post(create_threshold),
        )
        .route(
            "/api/thresholds/:id",
            patch(update_threshold).delete(delete_threshold),
        )
        .route("/api/thresholds/:id/cross", post(cross_threshold))
        .route(
            "/api/cases/:id/invisible-thresholds",
            get(list_invisible_thresholds).post(create_invisible_threshold),
        )
        .route(
            "/api/invisible-thresholds/:id",
            patch(update_invisible_threshold).delete(delete_invisible_threshold),
        )
        .route(
            "/api/cases/:id/absences",
            get(list_absences).post(create_absence),
        )
        .route(
            "/api/absences/:id",
            patch(update_absence).delete(delete_absence),
        )
}
