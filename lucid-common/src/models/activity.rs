//! Activity log rows (append-only)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::{enum_column, json_column, opt_uuid_column, uuid_column, Module};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workspace_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    pub module: Module,
    pub action: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for ActivityLogEntry {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            user_id: uuid_column(row, "user_id")?,
            workspace_id: opt_uuid_column(row, "workspace_id")?,
            case_id: opt_uuid_column(row, "case_id")?,
            module: enum_column(row, "module")?,
            action: row.try_get("action")?,
            metadata: json_column(row, "metadata")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
