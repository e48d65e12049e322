//! Error types for map loading, validation and signing.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignError>;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("Invalid signing map: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid {what} \"{}\": {reason}", path.display())]
    Path {
        what: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("Entitlement file \"{}\" could not be read", .0.display())]
    Entitlement(PathBuf),

    #[error("map[{index}]: file pattern \"{pattern}\" {reason}")]
    Pattern {
        index: usize,
        pattern: String,
        reason: String,
    },

    #[error("Command execution failed: {0}")]
    CommandExecution(String),

    #[error("{failed} of {total} codesign invocation(s) failed")]
    SigningFailed { failed: usize, total: usize },

    #[error("Signing cancelled before map[{0}]")]
    Cancelled(usize),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Structural problems in the map document itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("document is not valid JSON: {0}")]
    Document(String),

    #[error("document must be a JSON object with a \"map\" array")]
    DocumentNotObject,

    #[error("top-level \"map\" array is missing")]
    MissingMap,

    #[error("top-level \"map\" must be an array")]
    MapNotArray,

    #[error("map[{index}] must be an object")]
    EntryNotObject { index: usize },

    #[error("map[{index}] is missing required field \"{field}\"")]
    MissingField { index: usize, field: &'static str },

    #[error("map[{index}] field \"{field}\" is malformed: {reason}")]
    Malformed {
        index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("map[{index}] lists {count} entitlement files, at most one is allowed")]
    TooManyEntitlements { index: usize, count: usize },

    #[error("map[{index}] must list at least one glob pattern")]
    EmptyGlobs { index: usize },
}

impl SignError {
    pub(crate) fn path(what: &'static str, path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Path {
            what,
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn pattern(index: usize, pattern: &str, reason: impl Into<String>) -> Self {
        Self::Pattern {
            index,
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}
