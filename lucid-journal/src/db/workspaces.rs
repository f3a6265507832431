//! Shared workspaces: organizations, members and invitations

use chrono::{DateTime, Utc};
use lucid_common::models::{Invitation, InvitationStatus, Member, MemberRole, Organization};
use lucid_common::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::require_title;

/// Create an organization with `owner_id` as its owner member
pub async fn create(
    pool: &SqlitePool,
    owner_id: Uuid,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Organization> {
    let name = require_title("name", name)?;
    let id = Uuid::new_v4();

    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO organizations (id, name, owner_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(&name)
        .bind(owner_id.to_string())
        .bind(now)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO organization_members (organization_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(owner_id.to_string())
    .bind(MemberRole::Owner.as_str())
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Organization {
        id,
        name,
        owner_id,
        created_at: now,
    })
}

/// Organizations the user belongs to, by name
pub async fn list_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Organization>> {
    let rows = sqlx::query_as::<_, Organization>(
        r#"
        SELECT o.* FROM organizations o
        JOIN organization_members m ON m.organization_id = o.id
        WHERE m.user_id = ?
        ORDER BY o.name COLLATE NOCASE
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn membership(pool: &SqlitePool, organization_id: Uuid, user_id: Uuid) -> Result<Option<Member>> {
    let member = sqlx::query_as::<_, Member>(
        "SELECT * FROM organization_members WHERE organization_id = ? AND user_id = ?",
    )
    .bind(organization_id.to_string())
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?;
    Ok(member)
}

/// The caller's membership; non-members see the workspace as missing
pub async fn require_member(pool: &SqlitePool, organization_id: Uuid, user_id: Uuid) -> Result<Member> {
    membership(pool, organization_id, user_id)
        .await?
        .ok_or_else(|| Error::not_found("workspace", organization_id))
}

pub async fn members(pool: &SqlitePool, organization_id: Uuid) -> Result<Vec<Member>> {
    let rows = sqlx::query_as::<_, Member>(
        "SELECT * FROM organization_members WHERE organization_id = ? ORDER BY joined_at",
    )
    .bind(organization_id.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create_invitation(
    pool: &SqlitePool,
    organization_id: Uuid,
    invited_by: Uuid,
    email: &str,
    role: MemberRole,
    now: DateTime<Utc>,
) -> Result<Invitation> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::InvalidInput(format!("invalid email '{}'", email)));
    }
    if role == MemberRole::Owner {
        return Err(Error::InvalidInput(
            "invitations cannot grant the owner role".to_string(),
        ));
    }

    let invitation = Invitation {
        id: Uuid::new_v4(),
        organization_id,
        email,
        role,
        token: Uuid::new_v4().simple().to_string(),
        status: InvitationStatus::Pending,
        invited_by,
        created_at: now,
        accepted_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO invitations
            (id, organization_id, email, role, token, status, invited_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(invitation.id.to_string())
    .bind(organization_id.to_string())
    .bind(&invitation.email)
    .bind(role.as_str())
    .bind(&invitation.token)
    .bind(invitation.status.as_str())
    .bind(invited_by.to_string())
    .bind(now)
    .execute(pool)
    .await?;

    Ok(invitation)
}

pub async fn invitations(pool: &SqlitePool, organization_id: Uuid) -> Result<Vec<Invitation>> {
    let rows = sqlx::query_as::<_, Invitation>(
        "SELECT * FROM invitations WHERE organization_id = ? ORDER BY created_at DESC",
    )
    .bind(organization_id.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn invitation_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Invitation>> {
    let row = sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn invitation_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Invitation>> {
    let row = sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Move a pending invitation to `status`
///
/// Returns false when it was no longer pending.
async fn settle(
    tx: &mut sqlx::SqliteConnection,
    id: Uuid,
    status: InvitationStatus,
    now: DateTime<Utc>,
) -> Result<bool> {
    let accepted_at = (status == InvitationStatus::Accepted).then_some(now);
    let updated = sqlx::query(
        "UPDATE invitations SET status = ?, accepted_at = ? WHERE id = ? AND status = 'pending'",
    )
    .bind(status.as_str())
    .bind(accepted_at)
    .bind(id.to_string())
    .execute(&mut *tx)
    .await?
    .rows_affected();
    Ok(updated == 1)
}

/// Accept a pending invitation and add the membership
///
/// Returns `None` when the invitation is no longer pending. An existing
/// membership keeps its role.
pub async fn accept(
    pool: &SqlitePool,
    invitation: &Invitation,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<Member>> {
    let mut tx = pool.begin().await?;

    if !settle(&mut *tx, invitation.id, InvitationStatus::Accepted, now).await? {
        return Ok(None);
    }

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO organization_members (organization_id, user_id, role, joined_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(invitation.organization_id.to_string())
    .bind(user_id.to_string())
    .bind(invitation.role.as_str())
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    membership(pool, invitation.organization_id, user_id).await
}

/// Revoke a pending invitation; false when it was no longer pending
pub async fn revoke(pool: &SqlitePool, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
    let mut conn = pool.acquire().await?;
    settle(&mut *conn, id, InvitationStatus::Revoked, now).await
}
