//! Row models for the lucid database
//!
//! Identifiers are stored as hyphenated UUID text and timestamps as RFC 3339
//! text, so the `FromRow` impls here are written by hand on top of the
//! column helpers below.

pub mod activity;
pub mod journal;
pub mod subscription;
pub mod workspace;

pub use activity::ActivityLogEntry;
pub use journal::{
    Absence, AbsenceCategory, Case, CaseStatus, InvisibleThreshold, SilvaSpace, Template,
    Threshold, ThresholdType,
};
pub use subscription::{Plan, Subscription, SubscriptionStatus};
pub use workspace::{Invitation, InvitationStatus, Member, MemberRole, Organization};

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error for a string that names no variant of a text-backed enum
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares an enum stored and serialized as lowercase text.
///
/// Parsing is case-insensitive and ignores surrounding whitespace.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err($crate::models::ParseEnumError {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::models::ParseEnumError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.as_str()
            }
        }
    };
}

pub(crate) use text_enum;

text_enum! {
    /// The four journaling modules
    Module {
        Irreversa => "irreversa",
        Nulla => "nulla",
        Thresh => "thresh",
        Silva => "silva",
    }
}

impl Module {
    /// Display label used in reports and prompts
    pub fn label(&self) -> &'static str {
        match self {
            Module::Irreversa => "IRREVERSA",
            Module::Nulla => "NULLA",
            Module::Thresh => "THRESH",
            Module::Silva => "SILVA",
        }
    }
}

fn decode_error(column: &str, source: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

pub(crate) fn uuid_column(row: &SqliteRow, column: &str) -> Result<Uuid, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| decode_error(column, e))
}

pub(crate) fn opt_uuid_column(row: &SqliteRow, column: &str) -> Result<Option<Uuid>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| Uuid::parse_str(&s).map_err(|e| decode_error(column, e)))
        .transpose()
}

pub(crate) fn enum_column<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e| decode_error(column, e))
}

pub(crate) fn json_column(row: &SqliteRow, column: &str) -> Result<serde_json::Value, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).map_err(|e| decode_error(column, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_parse_is_case_insensitive() {
        assert_eq!("IRREVERSA".parse::<Module>().unwrap(), Module::Irreversa);
        assert_eq!(" Silva ".parse::<Module>().unwrap(), Module::Silva);
    }

    #[test]
    fn test_module_rejects_unknown() {
        let err = "lucidity".parse::<Module>().unwrap_err();
        assert_eq!(err.kind, "Module");
        assert_eq!(err.value, "lucidity");
    }

    #[test]
    fn test_module_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Module::Thresh).unwrap(), "\"thresh\"");
        let parsed: Module = serde_json::from_str("\"Nulla\"").unwrap();
        assert_eq!(parsed, Module::Nulla);
        assert!(serde_json::from_str::<Module>("\"other\"").is_err());
    }

    #[test]
    fn test_module_labels() {
        let labels: Vec<_> = Module::ALL.iter().map(Module::label).collect();
        assert_eq!(labels, vec!["IRREVERSA", "NULLA", "THRESH", "SILVA"]);
    }
}
