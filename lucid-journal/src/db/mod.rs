//! Journal queries
//!
//! Every read and write is scoped by `user_id`. A row that exists but belongs
//! to someone else is indistinguishable from a missing one.

pub mod cases;
pub mod entries;
pub mod silva;
pub mod templates;
pub mod workspaces;

use lucid_common::{Error, Result};

/// Trimmed, non-empty title
pub(crate) fn require_title(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

/// Intensity and impact ratings run from 1 to 5
pub(crate) fn require_scale(field: &str, value: i64) -> Result<i64> {
    if !(1..=5).contains(&value) {
        return Err(Error::InvalidInput(format!(
            "{} must be between 1 and 5, got {}",
            field, value
        )));
    }
    Ok(value)
}
