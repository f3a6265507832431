//! Errors shared by the lucid services
//!
//! Services map these onto HTTP statuses: `NotFound` and `InvalidInput`
//! reach the caller as 404 and 400, everything else is reported as an
//! internal error without detail.

use std::fmt::Display;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// sqlx failure on `lucid.db`
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder or database file could not be prepared
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable config.toml or missing auth/gateway settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Row absent or owned by another user
    #[error("Not found: {0}")]
    NotFound(String),

    /// Field value rejected before reaching the database
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invariant broken inside the service
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// `NotFound` for one row, e.g. `not_found("case", id)`
    pub fn not_found(kind: &str, id: impl Display) -> Self {
        Error::NotFound(format!("{} {}", kind, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_kind_and_id() {
        let err = Error::not_found("case", 42);
        assert_eq!(err.to_string(), "Not found: case 42");
    }

    #[test]
    fn test_io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "lucid.db");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().starts_with("IO error"));
    }
}
