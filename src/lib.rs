//! Run codesign(1) over a directory tree as described by a JSON signing map
//!
//! Each entry of the map becomes one codesign invocation over the files
//! matching its glob patterns. Entries run in map order, one at a time, so a
//! framework can be signed before the bundle that embeds it.
//!
//! The whole map is validated before anything is signed: schema, readable
//! entitlement files and rooted patterns. Output goes through an injected
//! [`Reporter`], and the tool itself through a [`ToolRunner`].

pub mod config;
pub mod entitlements;
pub mod error;
pub mod executor;
pub mod globs;
pub mod invocation;
pub mod map;
pub mod paths;
pub mod reporter;
pub mod runner;

use std::path::PathBuf;

// Re-export common types
pub use config::{DEFAULT_CODESIGN_PATH, FailurePolicy, SignSettings};
pub use error::{Result, SchemaError, SignError};
pub use executor::{CancelToken, EntryOutcome, EntryReport, RunSummary, TreeSigner};
pub use invocation::{Invocation, ResolvedEntry};
pub use map::{SigningEntry, SigningMap};
pub use reporter::{Level, MemoryReporter, Reporter, TerminalReporter};
pub use runner::{ProcessRunner, ToolExit, ToolRunner};

/// Inputs for one signing run, as given on the command line.
#[derive(Debug, Clone)]
pub struct SignRequest {
    pub map_file: PathBuf,
    pub entitlements_dir: PathBuf,
    pub root_dir: PathBuf,
    pub identity: String,
    pub settings: SignSettings,
}

/// Validate the request and sign the tree.
///
/// Returns the per-entry summary when every invocation succeeded (or the run
/// was simulated) and [`SignError::SigningFailed`] when any did not. No
/// invocation runs unless the paths, the map and every entry validate.
pub fn codesign_tree(
    request: &SignRequest,
    runner: &mut dyn ToolRunner,
    reporter: &mut dyn Reporter,
    cancel: &CancelToken,
) -> Result<RunSummary> {
    let map_file = paths::validate_map_file(&request.map_file)?;
    let entitlements_dir = paths::validate_directory("entitlements directory", &request.entitlements_dir)?;
    let root_dir = paths::validate_directory("root directory", &request.root_dir)?;

    if request.settings.verbose {
        reporter.info(&format!("JSON map file:          {}", map_file.display()));
        reporter.info(&format!("Entitlement directory:  {}", entitlements_dir.display()));
        reporter.info(&format!("Root directory:         {}", root_dir.display()));
        reporter.info(&format!("Codesigning identity:   {}", request.identity));
    }

    let map = SigningMap::load(&map_file)?;
    let signer = TreeSigner {
        root_dir,
        entitlements_dir,
        identity: request.identity.clone(),
        settings: request.settings.clone(),
    };

    signer.validate(&map, reporter)?;
    let summary = signer.execute(&map, runner, reporter, cancel)?;

    if !summary.is_success() {
        return Err(SignError::SigningFailed {
            failed: summary.failed(),
            total: summary.entries.len(),
        });
    }

    Ok(summary)
}
