//! Shared workspaces: organizations, members and invitations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::{enum_column, text_enum, uuid_column};

text_enum! {
    MemberRole {
        Owner => "owner",
        Admin => "admin",
        Member => "member",
    }
}

impl MemberRole {
    /// Owners and admins manage invitations
    pub fn can_invite(&self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Admin)
    }
}

text_enum! {
    InvitationStatus {
        Pending => "pending",
        Accepted => "accepted",
        Revoked => "revoked",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Organization {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            name: row.try_get("name")?,
            owner_id: uuid_column(row, "owner_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Member {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            organization_id: uuid_column(row, "organization_id")?,
            user_id: uuid_column(row, "user_id")?,
            role: enum_column(row, "role")?,
            joined_at: row.try_get("joined_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub role: MemberRole,
    /// Opaque acceptance token sent to the invitee
    pub token: String,
    pub status: InvitationStatus,
    pub invited_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, SqliteRow> for Invitation {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            organization_id: uuid_column(row, "organization_id")?,
            email: row.try_get("email")?,
            role: enum_column(row, "role")?,
            token: row.try_get("token")?,
            status: enum_column(row, "status")?,
            invited_by: uuid_column(row, "invited_by")?,
            created_at: row.try_get("created_at")?,
            accepted_at: row.try_get("accepted_at")?,
        })
    }
}
