//! Case entries: IRREVERSA thresholds, THRESH invisible thresholds and
//! NULLA absences
//!
//! An entry can only be attached to a case of its own module.

use chrono::{DateTime, Utc};
use lucid_common::models::{
    Absence, AbsenceCategory, Case, InvisibleThreshold, Module, Threshold, ThresholdType,
};
use lucid_common::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{cases, require_scale, require_title};

/// Load the caller's case and check it belongs to `module`
pub async fn case_for_entries(
    pool: &SqlitePool,
    user_id: Uuid,
    case_id: Uuid,
    module: Module,
) -> Result<Case> {
    let case = cases::get(pool, user_id, case_id).await?;
    if case.module != module {
        return Err(Error::InvalidInput(format!(
            "case {} belongs to {}, not {}",
            case_id,
            case.module.label(),
            module.label()
        )));
    }
    Ok(case)
}

async fn delete_row(pool: &SqlitePool, table: &str, user_id: Uuid, id: Uuid) -> Result<()> {
    let sql = format!("DELETE FROM {} WHERE id = ? AND user_id = ?", table);
    let deleted = sqlx::query(&sql)
        .bind(id.to_string())
        .bind(user_id.to_string())
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::not_found(table, id));
    }
    Ok(())
}

// ============================================================================
// Thresholds (IRREVERSA)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewThreshold {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub threshold_type: ThresholdType,
    pub intensity: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThresholdUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub threshold_type: Option<ThresholdType>,
    pub intensity: Option<i64>,
}

pub async fn insert_threshold(
    pool: &SqlitePool,
    user_id: Uuid,
    case_id: Uuid,
    new: &NewThreshold,
    now: DateTime<Utc>,
) -> Result<Threshold> {
    case_for_entries(pool, user_id, case_id, Module::Irreversa).await?;
    let title = require_title("title", &new.title)?;
    let intensity = require_scale("intensity", new.intensity)?;
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO thresholds
            (id, case_id, user_id, title, description, threshold_type, intensity, crossed, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(case_id.to_string())
    .bind(user_id.to_string())
    .bind(&title)
    .bind(&new.description)
    .bind(new.threshold_type.as_str())
    .bind(intensity)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get_threshold(pool, user_id, id).await
}

pub async fn get_threshold(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<Threshold> {
    sqlx::query_as::<_, Threshold>("SELECT * FROM thresholds WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("threshold", id))
}

/// Oldest first, the order they were recorded in
pub async fn list_thresholds(pool: &SqlitePool, user_id: Uuid, case_id: Uuid) -> Result<Vec<Threshold>> {
    let rows = sqlx::query_as::<_, Threshold>(
        "SELECT * FROM thresholds WHERE case_id = ? AND user_id = ? ORDER BY created_at, rowid",
    )
    .bind(case_id.to_string())
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn update_threshold(
    pool: &SqlitePool,
    user_id: Uuid,
    id: Uuid,
    changes: &ThresholdUpdate,
    now: DateTime<Utc>,
) -> Result<Threshold> {
    let mut row = get_threshold(pool, user_id, id).await?;
    if let Some(title) = &changes.title {
        row.title = require_title("title", title)?;
    }
    if let Some(description) = &changes.description {
        row.description = Some(description.clone());
    }
    if let Some(threshold_type) = changes.threshold_type {
        row.threshold_type = threshold_type;
    }
    if let Some(intensity) = changes.intensity {
        row.intensity = require_scale("intensity", intensity)?;
    }

    sqlx::query(
        r#"
        UPDATE thresholds
        SET title = ?, description = ?, threshold_type = ?, intensity = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&row.title)
    .bind(&row.description)
    .bind(row.threshold_type.as_str())
    .bind(row.intensity)
    .bind(now)
    .bind(id.to_string())
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    get_threshold(pool, user_id, id).await
}

/// Mark a threshold as crossed; the first crossing time is kept
pub async fn cross_threshold(
    pool: &SqlitePool,
    user_id: Uuid,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Threshold> {
    let updated = sqlx::query(
        r#"
        UPDATE thresholds
        SET crossed = 1, crossed_at = COALESCE(crossed_at, ?), updated_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(now)
    .bind(now)
    .bind(id.to_string())
    .bind(user_id.to_string())
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(Error::not_found("threshold", id));
    }
    get_threshold(pool, user_id, id).await
}

pub async fn delete_threshold(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<()> {
    delete_row(pool, "thresholds", user_id, id).await
}

// ============================================================================
// Invisible thresholds (THRESH)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewInvisibleThreshold {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub signal: Option<String>,
    pub intensity: i64,
    #[serde(default)]
    pub sensed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvisibleThresholdUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub signal: Option<String>,
    pub intensity: Option<i64>,
    pub sensed_at: Option<DateTime<Utc>>,
}

pub async fn insert_invisible_threshold(
    pool: &SqlitePool,
    user_id: Uuid,
    case_id: Uuid,
    new: &NewInvisibleThreshold,
    now: DateTime<Utc>,
) -> Result<InvisibleThreshold> {
    case_for_entries(pool, user_id, case_id, Module::Thresh).await?;
    let title = require_title("title", &new.title)?;
    let intensity = require_scale("intensity", new.intensity)?;
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO invisible_thresholds
            (id, case_id, user_id, title, description, signal, intensity, sensed_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(case_id.to_string())
    .bind(user_id.to_string())
    .bind(&title)
    .bind(&new.description)
    .bind(&new.signal)
    .bind(intensity)
    .bind(new.sensed_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get_invisible_threshold(pool, user_id, id).await
}

pub async fn get_invisible_threshold(
    pool: &SqlitePool,
    user_id: Uuid,
    id: Uuid,
) -> Result<InvisibleThreshold> {
    sqlx::query_as::<_, InvisibleThreshold>(
        "SELECT * FROM invisible_thresholds WHERE id = ? AND user_id = ?",
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::not_found("invisible threshold", id))
}

pub async fn list_invisible_thresholds(
    pool: &SqlitePool,
    user_id: Uuid,
    case_id: Uuid,
) -> Result<Vec<InvisibleThreshold>> {
    let rows = sqlx::query_as::<_, InvisibleThreshold>(
        "SELECT * FROM invisible_thresholds WHERE case_id = ? AND user_id = ? ORDER BY created_at, rowid",
    )
    .bind(case_id.to_string())
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn update_invisible_threshold(
    pool: &SqlitePool,
    user_id: Uuid,
    id: Uuid,
    changes: &InvisibleThresholdUpdate,
    now: DateTime<Utc>,
) -> Result<InvisibleThreshold> {
    let mut row = get_invisible_threshold(pool, user_id, id).await?;
    if let Some(title) = &changes.title {
        row.title = require_title("title", title)?;
    }
    if let Some(description) = &changes.description {
        row.description = Some(description.clone());
    }
    if let Some(signal) = &changes.signal {
        row.signal = Some(signal.clone());
    }
    if let Some(intensity) = changes.intensity {
        row.intensity = require_scale("intensity", intensity)?;
    }
    if let Some(sensed_at) = changes.sensed_at {
        row.sensed_at = Some(sensed_at);
    }

    sqlx::query(
        r#"
        UPDATE invisible_thresholds
        SET title = ?, description = ?, signal = ?, intensity = ?, sensed_at = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&row.title)
    .bind(&row.description)
    .bind(&row.signal)
    .bind(row.intensity)
    .bind(row.sensed_at)
    .bind(now)
    .bind(id.to_string())
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    get_invisible_threshold(pool, user_id, id).await
}

pub async fn delete_invisible_threshold(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<()> {
    delete_row(pool, "invisible_thresholds", user_id, id).await
}

// ============================================================================
// Absences (NULLA)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewAbsence {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: AbsenceCategory,
    pub impact: i64,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AbsenceUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<AbsenceCategory>,
    pub impact: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
}

pub async fn insert_absence(
    pool: &SqlitePool,
    user_id: Uuid,
    case_id: Uuid,
    new: &NewAbsence,
    now: DateTime<Utc>,
) -> Result<Absence> {
    case_for_entries(pool, user_id, case_id, Module::Nulla).await?;
    let title = require_title("title", &new.title)?;
    let impact = require_scale("impact", new.impact)?;
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO absences
            (id, case_id, user_id, title, description, category, impact, started_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(case_id.to_string())
    .bind(user_id.to_string())
    .bind(&title)
    .bind(&new.description)
    .bind(new.category.as_str())
    .bind(impact)
    .bind(new.started_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get_absence(pool, user_id, id).await
}

pub async fn get_absence(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<Absence> {
    sqlx::query_as::<_, Absence>("SELECT * FROM absences WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("absence", id))
}

pub async fn list_absences(pool: &SqlitePool, user_id: Uuid, case_id: Uuid) -> Result<Vec<Absence>> {
    let rows = sqlx::query_as::<_, Absence>(
        "SELECT * FROM absences WHERE case_id = ? AND user_id = ? ORDER BY created_at, rowid",
    )
    .bind(case_id.to_string())
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn update_absence(
    pool: &SqlitePool,
    user_id: Uuid,
    id: Uuid,
    changes: &AbsenceUpdate,
    now: DateTime<Utc>,
) -> Result<Absence> {
    let mut row = get_absence(pool, user_id, id).await?;
    if let Some(title) = &changes.title {
        row.title = require_title("title", title)?;
    }
    if let Some(description) = &changes.description {
        row.description = Some(description.clone());
    }
    if let Some(category) = changes.category {
        row.category = category;
    }
    if let Some(impact) = changes.impact {
        row.impact = require_scale("impact", impact)?;
    }
    if let Some(started_at) = changes.started_at {
        row.started_at = Some(started_at);
    }

    sqlx::query(
        r#"
        UPDATE absences
        SET title = ?, description = ?, category = ?, impact = ?, started_at = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&row.title)
    .bind(&row.description)
    .bind(row.category.as_str())
    .bind(row.impact)
    .bind(row.started_at)
    .bind(now)
    .bind(id.to_string())
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    get_absence(pool, user_id, id).await
}

pub async fn delete_absence(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<()> {
    delete_row(pool, "absences", user_id, id).await
}
