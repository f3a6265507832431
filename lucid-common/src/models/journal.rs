//! Journal rows: cases, the three entry types, templates and SILVA spaces

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::{enum_column, json_column, opt_uuid_column, text_enum, uuid_column, Module};

text_enum! {
    CaseStatus {
        Active => "active",
        Archived => "archived",
    }
}

text_enum! {
    /// How reversible an IRREVERSA threshold is judged to be
    ThresholdType {
        Reversible => "reversible",
        PartiallyReversible => "partially_reversible",
        Irreversible => "irreversible",
    }
}

text_enum! {
    /// What kind of thing a NULLA absence concerns
    AbsenceCategory {
        Person => "person",
        Object => "object",
        Place => "place",
        Role => "role",
        Capacity => "capacity",
        Other => "other",
    }
}

/// A user folder grouping entries within one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workspace_id: Option<Uuid>,
    pub module: Module,
    pub title: String,
    pub description: Option<String>,
    pub status: CaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Case {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            user_id: uuid_column(row, "user_id")?,
            workspace_id: opt_uuid_column(row, "workspace_id")?,
            module: enum_column(row, "module")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            status: enum_column(row, "status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// IRREVERSA entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub id: Uuid,
    pub case_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub threshold_type: ThresholdType,
    /// 1..=5
    pub intensity: i64,
    pub crossed: bool,
    pub crossed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Threshold {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            case_id: uuid_column(row, "case_id")?,
            user_id: uuid_column(row, "user_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            threshold_type: enum_column(row, "threshold_type")?,
            intensity: row.try_get("intensity")?,
            crossed: row.try_get("crossed")?,
            crossed_at: row.try_get("crossed_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// THRESH entry: a threshold sensed before it becomes visible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvisibleThreshold {
    pub id: Uuid,
    pub case_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// The weak signal that announced it
    pub signal: Option<String>,
    /// 1..=5
    pub intensity: i64,
    pub sensed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for InvisibleThreshold {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            case_id: uuid_column(row, "case_id")?,
            user_id: uuid_column(row, "user_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            signal: row.try_get("signal")?,
            intensity: row.try_get("intensity")?,
            sensed_at: row.try_get("sensed_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// NULLA entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Absence {
    pub id: Uuid,
    pub case_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: AbsenceCategory,
    /// 1..=5
    pub impact: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Absence {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            case_id: uuid_column(row, "case_id")?,
            user_id: uuid_column(row, "user_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            category: enum_column(row, "category")?,
            impact: row.try_get("impact")?,
            started_at: row.try_get("started_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Reusable entry skeleton for one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub user_id: Uuid,
    pub module: Module,
    pub name: String,
    pub description: Option<String>,
    pub fields: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Template {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            user_id: uuid_column(row, "user_id")?,
            module: enum_column(row, "module")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            fields: json_column(row, "fields")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Free-text scratch area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilvaSpace {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workspace_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for SilvaSpace {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            user_id: uuid_column(row, "user_id")?,
            workspace_id: opt_uuid_column(row, "workspace_id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
