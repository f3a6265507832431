//! Workspace, membership and invitation endpoints
//!
//! Non-members see a workspace as missing (404). Members without the
//! owner or admin role get 403 on invitation management.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lucid_common::models::{Invitation, InvitationStatus, Member, MemberRole, Organization};
use lucid_common::time;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::auth::CurrentUser;
use super::extract::{ApiJson, ApiPath};
use crate::db::workspaces;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateWorkspace {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvitation {
    pub email: String,
    #[serde(default = "default_role")]
    pub role: MemberRole,
}

fn default_role() -> MemberRole {
    MemberRole::Member
}

async fn require_manager(state: &AppState, workspace_id: Uuid, user_id: Uuid) -> ApiResult<Member> {
    let member = workspaces::require_member(&state.db, workspace_id, user_id).await?;
    if !member.role.can_invite() {
        return Err(ApiError::Forbidden(
            "only owners and admins manage invitations".to_string(),
        ));
    }
    Ok(member)
}

/// POST /api/workspaces
pub async fn create_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<CreateWorkspace>,
) -> ApiResult<(StatusCode, Json<Organization>)> {
    let org = workspaces::create(&state.db, user.id(), &body.name, time::now()).await?;
    info!(user_id = %user.id(), workspace_id = %org.id, "Workspace created");
    Ok((StatusCode::CREATED, Json(org)))
}

/// GET /api/workspaces
pub async fn list_workspaces(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Organization>>> {
    Ok(Json(workspaces::list_for_user(&state.db, user.id()).await?))
}

/// GET /api/workspaces/:id/members
pub async fn list_members(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Member>>> {
    workspaces::require_member(&state.db, id, user.id()).await?;
    Ok(Json(workspaces::members(&state.db, id).await?))
}

/// POST /api/workspaces/:id/invitations
pub async fn create_invitation(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateInvitation>,
) -> ApiResult<(StatusCode, Json<Invitation>)> {
    require_manager(&state, id, user.id()).await?;

    let invitation =
        workspaces::create_invitation(&state.db, id, user.id(), &body.email, body.role, time::now())
            .await?;
    info!(
        workspace_id = %id,
        invitation_id = %invitation.id,
        role = %invitation.role,
        "Invitation created"
    );
    Ok((StatusCode::CREATED, Json(invitation)))
}

/// GET /api/workspaces/:id/invitations
///
/// Invitations carry their acceptance token, so only managers list them.
pub async fn list_invitations(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Invitation>>> {
    require_manager(&state, id, user.id()).await?;
    Ok(Json(workspaces::invitations(&state.db, id).await?))
}

/// POST /api/invitations/:id/accept
///
/// `:id` is the invitation token. Only a pending invitation can be accepted;
/// when the caller's account has an email it must match the invited one.
pub async fn accept_invitation(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(token): ApiPath<String>,
) -> ApiResult<Json<Member>> {
    let invitation = workspaces::invitation_by_token(&state.db, &token)
        .await?
        .ok_or_else(|| ApiError::NotFound("invitation".to_string()))?;

    if invitation.status != InvitationStatus::Pending {
        return Err(ApiError::Conflict(format!("invitation is {}", invitation.status)));
    }

    if let Some(email) = user.email() {
        if !email.trim().eq_ignore_ascii_case(&invitation.email) {
            return Err(ApiError::Forbidden(
                "invitation was sent to another address".to_string(),
            ));
        }
    }

    let member = workspaces::accept(&state.db, &invitation, user.id(), time::now())
        .await?
        .ok_or_else(|| ApiError::Conflict("invitation is no longer pending".to_string()))?;

    info!(user_id = %user.id(), workspace_id = %invitation.organization_id, "Invitation accepted");
    Ok(Json(member))
}

/// POST /api/invitations/:id/revoke
pub async fn revoke_invitation(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Invitation>> {
    let invitation = workspaces::invitation_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("invitation {}", id)))?;

    require_manager(&state, invitation.organization_id, user.id()).await?;

    if !workspaces::revoke(&state.db, id, time::now()).await? {
        return Err(ApiError::Conflict(format!(
            "invitation is {}",
            invitation.status
        )));
    }

    let revoked = workspaces::invitation_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("invitation {}", id)))?;
    Ok(Json(revoked))
}

pub fn workspace_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workspaces", get(list_workspaces).post(create_workspace))
        .route("/api/workspaces/:id/members", get(list_members))
        .route(
            "/api/workspaces/:id/invitations",
            get(list_invitations).post(create_invitation),
        )
        .route("/api/invitations/:id/accept", post(accept_invitation))
        .route("/api/invitations/:id/revoke", post(revoke_invitation))
}
