//! Case endpoints

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lucid_common::models::Case;
use lucid_common::{time, usage};
use tracing::info;
use uuid::Uuid;

use super::auth::CurrentUser;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::db::cases::{self, CaseFilter, CaseUpdate, Gated, ModuleCounts, NewCase};
use crate::db::workspaces;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Active-case limit for the caller: `None` on an active Pro plan
pub(crate) async fn case_limit(state: &AppState, user_id: Uuid) -> ApiResult<Option<i64>> {
    let is_pro = usage::get_subscription(&state.db, user_id)
        .await?
        .map(|s| s.is_pro())
        .unwrap_or(false);
    Ok(if is_pro {
        None
    } else {
        Some(state.free_case_limit)
    })
}

/// GET /api/cases?module=&status=
pub async fn list_cases(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(filter): ApiQuery<CaseFilter>,
) -> ApiResult<Json<Vec<Case>>> {
    Ok(Json(cases::list(&state.db, user.id(), &filter).await?))
}

/// POST /api/cases
pub async fn create_case(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(new): ApiJson<NewCase>,
) -> ApiResult<(StatusCode, Json<Case>)> {
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

    let limit = case_limit(&state, user.id()).await?;
    match cases::insert(&state.db, user.id(), &new, limit, time::now()).await? {
        Gated::Done(case) => {
            info!(user_id = %user.id(), case_id = %case.id, module = %case.module, "Case created");
            Ok((StatusCode::CREATED, Json(case)))
        }
        Gated::LimitReached => Err(ApiError::CaseLimitReached {
            module: new.module,
            limit: state.free_case_limit,
        }),
    }
}

/// GET /api/cases/counts
pub async fn case_counts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<ModuleCounts>>> {
    Ok(Json(cases::counts(&state.db, user.id()).await?))
}

/// GET /api/cases/:id
pub async fn get_case(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Case>> {
    Ok(Json(cases::get(&state.db, user.id(), id).await?))
}

/// PATCH /api/cases/:id
pub async fn update_case(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<CaseUpdate>,
) -> ApiResult<Json<Case>> {
    Ok(Json(
        cases::update(&state.db, user.id(), id, &changes, time::now()).await?,
    ))
}

/// POST /api/cases/:id/archive
pub async fn archive_case(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Case>> {
    Ok(Json(cases::archive(&state.db, user.id(), id, time::now()).await?))
}

/// POST /api/cases/:id/restore
pub async fn restore_case(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Case>> {
    let limit = case_limit(&state, user.id()).await?;
    match cases::restore(&state.db, user.id(), id, limit, time::now()).await? {
        Gated::Done(case) => Ok(Json(case)),
        Gated::LimitReached => {
            let case = cases::get(&state.db, user.id(), id).await?;
            Err(ApiError::CaseLimitReached {
                module: case.module,
                limit: state.free_case_limit,
            })
        }
    }
}

/// DELETE /api/cases/:id
pub async fn delete_case(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    cases::delete(&state.db, user.id(), id).await?;
    info!(user_id = %user.id(), case_id = %id, "Case deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub fn case_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cases", get(list_cases).post(create_case))
        .route("/api/cases/counts", get(case_counts))
        .route(
            "/api/cases/:id",
            get(get_case).patch(update_case).delete(delete_case),
        )
        .route("/api/cases/:id/archive", post(archive_case))
        .route("/api/cases/:id/restore", post(restore_case))
}
