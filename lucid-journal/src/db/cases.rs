//! Case persistence and the per-module counts

use chrono::{DateTime, Utc};
use lucid_common::models::{Case, CaseStatus, Module};
use lucid_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::require_title;

/// Free plan active cases per module
pub const FREE_ACTIVE_CASES_PER_MODULE: i64 = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCase {
    pub module: Module,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Filters for `list`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseFilter {
    pub module: Option<Module>,
    pub status: Option<CaseStatus>,
}

/// Active and archived counts for one module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleCounts {
    pub module: Module,
    pub active: i64,
    pub archived: i64,
}

/// Outcome of an insert or restore gated by the active-case limit
#[derive(Debug)]
pub enum Gated {
    Done(Case),
    LimitReached,
}

const ACTIVE_IN_MODULE: &str =
    "(SELECT COUNT(*) FROM cases WHERE user_id = ? AND module = ? AND status = 'active')";

/// Insert a case; with `limit`, only while the module has fewer active cases
///
/// The count and the insert run as one statement, so concurrent creations
/// cannot overshoot the limit.
pub async fn insert(
    pool: &SqlitePool,
    user_id: Uuid,
    new: &NewCase,
    limit: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Gated> {
    let title = require_title("title", &new.title)?;
    let id = Uuid::new_v4();

    let sql = format!(
        r#"
        INSERT INTO cases
            (id, user_id, workspace_id, module, title, description, status, created_at, updated_at)
        SELECT ?, ?, ?, ?, ?, ?, 'active', ?, ?
        WHERE {} < ?
        "#,
        ACTIVE_IN_MODULE
    );

    let inserted = sqlx::query(&sql)
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(new.workspace_id.map(|w| w.to_string()))
        .bind(new.module.as_str())
        .bind(&title)
        .bind(&new.description)
        .bind(now)
        .bind(now)
        .bind(user_id.to_string())
        .bind(new.module.as_str())
        .bind(limit.unwrap_or(i64::MAX))
        .execute(pool)
        .await?
        .rows_affected();

    if inserted == 0 {
        return Ok(Gated::LimitReached);
    }

    Ok(Gated::Done(get(pool, user_id, id).await?))
}

pub async fn find(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<Option<Case>> {
    let case = sqlx::query_as::<_, Case>("SELECT * FROM cases WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;
    Ok(case)
}

/// Like `find`, but a missing case is an error
pub async fn get(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<Case> {
    find(pool, user_id, id)
        .await?
        .ok_or_else(|| Error::not_found("case", id))
}

/// Newest first
pub async fn list(pool: &SqlitePool, user_id: Uuid, filter: &CaseFilter) -> Result<Vec<Case>> {
    let cases = sqlx::query_as::<_, Case>(
        r#"
        SELECT * FROM cases
        WHERE user_id = ?
          AND (? IS NULL OR module = ?)
          AND (? IS NULL OR status = ?)
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id.to_string())
    .bind(filter.module.map(|m| m.as_str()))
    .bind(filter.module.map(|m| m.as_str()))
    .bind(filter.status.map(|s| s.as_str()))
    .bind(filter.status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;
    Ok(cases)
}

pub async fn update(
    pool: &SqlitePool,
    user_id: Uuid,
    id: Uuid,
    changes: &CaseUpdate,
    now: DateTime<Utc>,
) -> Result<Case> {
    let mut case = get(pool, user_id, id).await?;
    if let Some(title) = &changes.title {
        case.title = require_title("title", title)?;
    }
    if let Some(description) = &changes.description {
        case.description = Some(description.clone());
    }

    sqlx::query(
        "UPDATE cases SET title = ?, description = ?, updated_at = ? WHERE id = ? AND user_id = ?",
    )
    .bind(&case.title)
    .bind(&case.description)
    .bind(now)
    .bind(id.to_string())
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    get(pool, user_id, id).await
}

pub async fn archive(pool: &SqlitePool, user_id: Uuid, id: Uuid, now: DateTime<Utc>) -> Result<Case> {
    let updated = sqlx::query(
        "UPDATE cases SET status = 'archived', updated_at = ? WHERE id = ? AND user_id = ?",
    )
    .bind(now)
    .bind(id.to_string())
    .bind(user_id.to_string())
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(Error::not_found("case", id));
    }
    get(pool, user_id, id).await
}

/// Reactivate an archived case, subject to the same limit as creation
pub async fn restore(
    pool: &SqlitePool,
    user_id: Uuid,
    id: Uuid,
    limit: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Gated> {
    let case = get(pool, user_id, id).await?;
    if case.status == CaseStatus::Active {
        return Ok(Gated::Done(case));
    }

    let sql = format!(
        r#"
        UPDATE cases SET status = 'active', updated_at = ?
        WHERE id = ? AND user_id = ? AND status = 'archived'
          AND {} < ?
        "#,
        ACTIVE_IN_MODULE
    );

    let updated = sqlx::query(&sql)
        .bind(now)
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(user_id.to_string())
        .bind(case.module.as_str())
        .bind(limit.unwrap_or(i64::MAX))
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Ok(Gated::LimitReached);
    }
    Ok(Gated::Done(get(pool, user_id, id).await?))
}

/// Delete a case and, through the foreign keys, its entries
pub async fn delete(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM cases WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(user_id.to_string())
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::not_found("case", id));
    }
    Ok(())
}

/// One row per module, zeros included
pub async fn counts(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<ModuleCounts>> {
    let rows: Vec<(String, String, i64)> = sqlx::query_as(
        "SELECT module, status, COUNT(*) FROM cases WHERE user_id = ? GROUP BY module, status",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut counts: Vec<ModuleCounts> = Module::ALL
        .iter()
        .map(|&module| ModuleCounts {
            module,
            active: 0,
            archived: 0,
        })
        .collect();

    for (module, status, count) in rows {
        let (Ok(module), Ok(status)) = (module.parse::<Module>(), status.parse::<CaseStatus>())
        else {
            continue;
        };
        if let Some(entry) = counts.iter_mut().find(|c| c.module == module) {
            match status {
                CaseStatus::Active => entry.active = count,
                CaseStatus::Archived => entry.archived = count,
            }
        }
    }

    Ok(counts)
}
