//! Entry templates

use chrono::{DateTime, Utc};
use lucid_common::models::{Module, Template};
use lucid_common::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::require_title;

#[derive(Debug, Clone, Deserialize)]
pub struct NewTemplate {
    pub module: Module,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_fields")]
    pub fields: Value,
}

fn empty_fields() -> Value {
    Value::Array(Vec::new())
}

pub async fn insert(
    pool: &SqlitePool,
    user_id: Uuid,
    new: &NewTemplate,
    now: DateTime<Utc>,
) -> Result<Template> {
    let name = require_title("name", &new.name)?;
    if !(new.fields.is_array() || new.fields.is_object()) {
        return Err(Error::InvalidInput(
            "fields must be a JSON array or object".to_string(),
        ));
    }
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO templates (id, user_id, module, name, description, fields, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(new.module.as_str())
    .bind(&name)
    .bind(&new.description)
    .bind(new.fields.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Template>("SELECT * FROM templates WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await
        .map_err(Error::from)
}

/// Alphabetical by name
pub async fn list(pool: &SqlitePool, user_id: Uuid, module: Option<Module>) -> Result<Vec<Template>> {
    let rows = sqlx::query_as::<_, Template>(
        r#"
        SELECT * FROM templates
        WHERE user_id = ? AND (? IS NULL OR module = ?)
        ORDER BY name COLLATE NOCASE
        "#,
    )
    .bind(user_id.to_string())
    .bind(module.map(|m| m.as_str()))
    .bind(module.map(|m| m.as_str()))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn delete(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM templates WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(user_id.to_string())
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::not_found("template", id));
    }
    Ok(())
}
