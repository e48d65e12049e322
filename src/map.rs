//! Signing map document: loading and schema validation.
//!
//! A map file is a JSON object with a single `map` array. Each element
//! describes one codesign invocation:
//!
//! ```json
//! {
//!   "map": [
//!     {
//!       "deep": false,
//!       "runtime": true,
//!       "entitlements": ["default.xml"],
//!       "globs": ["/Contents/MacOS/XUL", "/Contents/MacOS/*.dylib"]
//!     }
//!   ]
//! }
//! ```
//!
//! Parsing is a single fallible step. Either every entry is complete and
//! well typed and a [`SigningMap`] is returned, or the first violation is
//! reported as a [`SchemaError`] naming the entry index and field.

use crate::error::{Result, SchemaError, SignError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// Fields every map entry must carry, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 4] = ["deep", "runtime", "entitlements", "globs"];

/// One codesign invocation as declared in the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningEntry {
    /// Pass `--deep` so nested bundles are signed too
    pub deep: bool,
    /// Pass `--options runtime` (hardened runtime, required for notarization)
    pub hardened_runtime: bool,
    /// Entitlements filename relative to the entitlements directory
    pub entitlements: Option<String>,
    /// Root-relative glob patterns, in signing order
    pub globs: Vec<String>,
}

/// The whole signing map. Entry order is execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningMap {
    entries: Vec<SigningEntry>,
}

impl SigningMap {
    /// Parse and validate a map document.
    pub fn parse(text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text)
            .map_err(|e| SchemaError::Document(e.to_string()))?;
        let Value::Object(mut document) = document else {
            return Err(SchemaError::DocumentNotObject.into());
        };

        let entries = match document.remove("map") {
            None | Some(Value::Null) => return Err(SchemaError::MissingMap.into()),
            Some(Value::Array(entries)) => entries,
            Some(_) => return Err(SchemaError::MapNotArray.into()),
        };

        let entries = entries
            .iter()
            .enumerate()
            .map(|(index, value)| parse_entry(index, value))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }

    /// Read a map file from disk and parse it.
    ///
    /// An unreadable file is a path error, malformed content a schema error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SignError::path("map file", path, e.to_string()))?;
        Self::parse(&text)
    }

    #[must_use]
    pub fn entries(&self) -> &[SigningEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SigningEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a SigningMap {
    type Item = &'a SigningEntry;
    type IntoIter = std::slice::Iter<'a, SigningEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn parse_entry(index: usize, value: &Value) -> std::result::Result<SigningEntry, SchemaError> {
    let Value::Object(fields) = value else {
        return Err(SchemaError::EntryNotObject { index });
    };

    // Report a missing field before any type problem on the same entry
    if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !fields.contains_key(**f)) {
        return Err(SchemaError::MissingField {
            index,
            field: *missing,
        });
    }

    let deep: bool = field(fields, index, "deep")?;
    let hardened_runtime: bool = field(fields, index, "runtime")?;
    let mut entitlements: Vec<String> = field(fields, index, "entitlements")?;
    let globs: Vec<String> = field(fields, index, "globs")?;

    if entitlements.len() > 1 {
        return Err(SchemaError::TooManyEntitlements {
            index,
            count: entitlements.len(),
        });
    }
    if globs.is_empty() {
        return Err(SchemaError::EmptyGlobs { index });
    }

    Ok(SigningEntry {
        deep,
        hardened_runtime,
        entitlements: entitlements.pop(),
        globs,
    })
}

fn field<T: DeserializeOwned>(
    fields: &Map<String, Value>,
    index: usize,
    field: &'static str,
) -> std::result::Result<T, SchemaError> {
    let value = fields
        .get(field)
        .ok_or(SchemaError::MissingField { index, field })?;
    <T as Deserialize>::deserialize(value).map_err(|e| SchemaError::Malformed {
        index,
        field,
        reason: e.to_string(),
    })
}
