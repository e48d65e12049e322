//! Validation pre-pass and sequential execution of a signing map
//!
//! Entries are signed strictly one after another. An entry's file list is
//! resolved immediately before it runs, so anything an earlier entry wrote
//! into the tree (for example `_CodeSignature` directories) is visible to
//! later patterns.

use crate::config::{FailurePolicy, SignSettings};
use crate::entitlements::resolve_entitlements;
use crate::error::{Result, SignError};
use crate::globs::{flatten_matches, resolve_patterns};
use crate::invocation::{Invocation, ResolvedEntry};
use crate::map::{SigningEntry, SigningMap};
use crate::reporter::Reporter;
use crate::runner::{ToolExit, ToolRunner};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation, checked before each entry starts.
///
/// An invocation already running is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one map entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Signed,
    /// Simulate mode, codesign was not run
    Simulated,
    Failed(String),
    /// Not attempted because an earlier entry failed under fail-fast
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub index: usize,
    pub file_count: usize,
    pub outcome: EntryOutcome,
}

/// Per-entry results of a run, in map order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub entries: Vec<EntryReport>,
}

impl RunSummary {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, EntryOutcome::Failed(_)))
            .count()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Everything needed to sign one tree, independent of the map.
#[derive(Debug, Clone)]
pub struct TreeSigner {
    pub root_dir: PathBuf,
    pub entitlements_dir: PathBuf,
    pub identity: String,
    pub settings: SignSettings,
}

impl TreeSigner {
    /// Check every entry before anything is signed.
    ///
    /// Entitlement files must be readable and every pattern rooted and well
    /// formed. The first violation aborts. Patterns that match nothing are
    /// reported as warnings.
    pub fn validate(&self, map: &SigningMap, reporter: &mut dyn Reporter) -> Result<()> {
        for (index, entry) in map.iter().enumerate() {
            resolve_entitlements(entry, &self.entitlements_dir)?;

            for matches in resolve_patterns(index, entry, &self.root_dir)? {
                if matches.paths.is_empty() {
                    reporter.warn(&format!(
                        "map[{index}]: file pattern \"{}\" matches no files",
                        matches.pattern
                    ));
                }
            }
        }
        Ok(())
    }

    /// Resolve one entry against the current state of the tree.
    pub fn resolve<'a>(&self, index: usize, entry: &'a SigningEntry) -> Result<ResolvedEntry<'a>> {
        let entitlements = resolve_entitlements(entry, &self.entitlements_dir)?;
        let matches = resolve_patterns(index, entry, &self.root_dir)?;

        Ok(ResolvedEntry {
            index,
            entry,
            entitlements,
            files: flatten_matches(matches, self.settings.dedupe),
        })
    }

    /// Build the invocation for one entry.
    pub fn invocation(&self, index: usize, entry: &SigningEntry) -> Result<Invocation> {
        let resolved = self.resolve(index, entry)?;
        Ok(Invocation::build(
            &self.settings.codesign_path,
            &self.identity,
            &resolved,
        ))
    }

    /// Run every entry in map order.
    ///
    /// Tool failures are collected into the summary rather than returned as
    /// errors; under [`FailurePolicy::FailFast`] the entries after the first
    /// failure are marked skipped. Resolution errors and cancellation abort
    /// the run.
    pub fn execute(
        &self,
        map: &SigningMap,
        runner: &mut dyn ToolRunner,
        reporter: &mut dyn Reporter,
        cancel: &CancelToken,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut stopped = false;

        for (index, entry) in map.iter().enumerate() {
            if stopped {
                summary.entries.push(EntryReport {
                    index,
                    file_count: 0,
                    outcome: EntryOutcome::Skipped,
                });
                continue;
            }

            if cancel.is_cancelled() {
                reporter.warn(&format!("Cancelled, map[{index}] and later entries not signed"));
                return Err(SignError::Cancelled(index));
            }

            let invocation = self.invocation(index, entry)?;
            if self.settings.echo_commands() {
                reporter.command(&invocation.command_line());
            }

            let outcome = if self.settings.simulate {
                EntryOutcome::Simulated
            } else {
                self.run_one(index, &invocation, runner, reporter)
            };

            if matches!(outcome, EntryOutcome::Failed(_))
                && self.settings.failure_policy == FailurePolicy::FailFast
            {
                stopped = true;
            }

            summary.entries.push(EntryReport {
                index,
                file_count: invocation.files.len(),
                outcome,
            });
        }

        Ok(summary)
    }

    fn run_one(
        &self,
        index: usize,
        invocation: &Invocation,
        runner: &mut dyn ToolRunner,
        reporter: &mut dyn Reporter,
    ) -> EntryOutcome {
        let reason = match runner.run(invocation) {
            Ok(ToolExit::Success) => {
                if self.settings.verbose {
                    reporter.success(&format!(
                        "map[{index}]: signed {} path(s)",
                        invocation.files.len()
                    ));
                }
                return EntryOutcome::Signed;
            }
            Ok(ToolExit::Failed(Some(code))) => format!("codesign exited with status {code}"),
            Ok(ToolExit::Failed(None)) => "codesign was terminated by a signal".to_string(),
            Err(e) => e.to_string(),
        };

        reporter.error(&format!("map[{index}]: {reason}"));
        EntryOutcome::Failed(reason)
    }
}
