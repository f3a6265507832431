//! Activity log writes and reads

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{ActivityLogEntry, Module};
use crate::Result;

/// Row to append to `activity_log`
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Uuid,
    pub workspace_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    pub module: Module,
    pub action: String,
    pub metadata: serde_json::Value,
}

pub async fn record(pool: &SqlitePool, activity: &NewActivity, now: DateTime<Utc>) -> Result<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO activity_log
            (id, user_id, workspace_id, case_id, module, action, metadata, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(activity.user_id.to_string())
    .bind(activity.workspace_id.map(|w| w.to_string()))
    .bind(activity.case_id.map(|c| c.to_string()))
    .bind(activity.module.as_str())
    .bind(&activity.action)
    .bind(activity.metadata.to_string())
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Most recent entries first
pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<ActivityLogEntry>> {
    let entries = sqlx::query_as::<_, ActivityLogEntry>(
        "SELECT * FROM activity_log WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(user_id.to_string())
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}
