//! Settings for signing runs.
//!
//! Settings can be read from an optional TOML file; command-line flags
//! override whatever the file provides.
//!
//! ```toml
//! codesign_path = "/usr/bin/codesign"
//! failure_policy = "fail-fast"
//! dedupe = true
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the codesign tool
pub const DEFAULT_CODESIGN_PATH: &str = "/usr/bin/codesign";

/// What to do when a codesign invocation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Run every entry, then fail the run if any entry failed
    #[default]
    Continue,
    /// Stop at the first failed entry
    FailFast,
}

/// Settings shared by every entry of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignSettings {
    /// Path to the codesign executable
    #[serde(default = "default_codesign_path")]
    pub codesign_path: PathBuf,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Drop repeated paths within one entry, keeping the first occurrence
    #[serde(default)]
    pub dedupe: bool,

    /// Print resolved settings and every command line
    #[serde(default)]
    pub verbose: bool,

    /// Print command lines without running codesign
    #[serde(default)]
    pub simulate: bool,
}

impl Default for SignSettings {
    fn default() -> Self {
        Self {
            codesign_path: default_codesign_path(),
            failure_policy: FailurePolicy::default(),
            dedupe: false,
            verbose: false,
            simulate: false,
        }
    }
}

impl SignSettings {
    /// Read settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Whether command lines should be shown to the user.
    #[must_use]
    pub fn echo_commands(&self) -> bool {
        self.verbose || self.simulate
    }
}

fn default_codesign_path() -> PathBuf {
    PathBuf::from(DEFAULT_CODESIGN_PATH)
}
