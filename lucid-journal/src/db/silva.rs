//! SILVA spaces

use chrono::{DateTime, Utc};
use lucid_common::models::SilvaSpace;
use lucid_common::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::require_title;

#[derive(Debug, Clone, Deserialize)]
pub struct NewSilvaSpace {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub workspace_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SilvaSpaceUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub async fn insert(
    pool: &SqlitePool,
    user_id: Uuid,
    new: &NewSilvaSpace,
    now: DateTime<Utc>,
) -> Result<SilvaSpace> {
    let title = require_title("title", &new.title)?;
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO silva_spaces (id, user_id, workspace_id, title, content, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(new.workspace_id.map(|w| w.to_string()))
    .bind(&title)
    .bind(&new.content)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get(pool, user_id, id).await
}

pub async fn get(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<SilvaSpace> {
    sqlx::query_as::<_, SilvaSpace>("SELECT * FROM silva_spaces WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("SILVA space", id))
}

/// Most recently edited first
pub async fn list(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<SilvaSpace>> {
    let rows = sqlx::query_as::<_, SilvaSpace>(
        "SELECT * FROM silva_spaces WHERE user_id = ? ORDER BY updated_at DESC",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn update(
    pool: &SqlitePool,
    user_id: Uuid,
    id: Uuid,
    changes: &SilvaSpaceUpdate,
    now: DateTime<Utc>,
) -> Result<SilvaSpace> {
    let mut space = get(pool, user_id, id).await?;
    if let Some(title) = &changes.title {
        space.title = require_title("title", title)?;
    }
    if let Some(content) = &changes.content {
        space.content = content.clone();
    }

    sqlx::query(
        "UPDATE silva_spaces SET title = ?, content = ?, updated_at = ? WHERE id = ? AND user_id = ?",
    )
    .bind(&space.title)
    .bind(&space.content)
    .bind(now)
    .bind(id.to_string())
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    get(pool, user_id, id).await
}

pub async fn delete(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM silva_spaces WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(user_id.to_string())
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::not_found("SILVA space", id));
    }
    Ok(())
}
