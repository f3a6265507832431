//! HTML report downloads

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use lucid_common::models::Module;
use lucid_common::time;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::CurrentUser;
use super::extract::{ApiPath, ApiQuery};
use crate::db::{cases, entries, silva};
use crate::error::ApiResult;
use crate::report::{self, CaseEntries};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// Render in the browser instead of downloading
    #[serde(default)]
    pub inline: bool,
}

fn html_response(html: String, stem: &str, inline: bool) -> Response {
    let content_type = (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string());
    if inline {
        ([content_type], html).into_response()
    } else {
        let disposition = (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}-report.html\"", report::slugify(stem)),
        );
        ([content_type, disposition], html).into_response()
    }
}

/// GET /api/cases/:id/report?inline=
pub async fn case_report(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Response> {
    let case = cases::get(&state.db, user.id(), id).await?;

    let rows = match case.module {
        Module::Irreversa => {
            CaseEntries::Thresholds(entries::list_thresholds(&state.db, user.id(), id).await?)
        }
        Module::Thresh => CaseEntries::InvisibleThresholds(
            entries::list_invisible_thresholds(&state.db, user.id(), id).await?,
        ),
        Module::Nulla => {
            CaseEntries::Absences(entries::list_absences(&state.db, user.id(), id).await?)
        }
        Module::Silva => CaseEntries::None,
    };

    let html = report::render_case_report(&case, &rows, time::now());
    Ok(html_response(html, &case.title, query.inline))
}

/// GET /api/silva/:id/report?inline=
pub async fn silva_report(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Response> {
    let space = silva::get(&state.db, user.id(), id).await?;
    let html = report::render_silva_report(&space, time::now());
    Ok(html_response(html, &space.title, query.inline))
}

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cases/:id/report", get(case_report))
        .route("/api/silva/:id/report", get(silva_report))
}
