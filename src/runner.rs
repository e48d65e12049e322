//! Running codesign as a child process

use crate::error::{Result, SignError};
use crate::invocation::Invocation;
use std::process::Command;

/// How a codesign invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolExit {
    Success,
    /// Non-zero exit. `None` when the process was killed by a signal.
    Failed(Option<i32>),
}

/// Something that can carry out an [`Invocation`].
///
/// [`ProcessRunner`] runs the real tool; tests substitute a recorder.
pub trait ToolRunner {
    /// Run `invocation` to completion. `Err` means the tool could not be
    /// started at all.
    fn run(&mut self, invocation: &Invocation) -> Result<ToolExit>;
}

/// Runs the invocation's program synchronously, inheriting stdio so the
/// tool's own `-v` output reaches the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<ToolExit> {
        let status = Command::new(&invocation.program)
            .args(invocation.argv())
            .status()
            .map_err(|e| {
                SignError::CommandExecution(format!(
                    "could not start {}: {e}",
                    invocation.program.display()
                ))
            })?;

        if status.success() {
            Ok(ToolExit::Success)
        } else {
            Ok(ToolExit::Failed(status.code()))
        }
    }
}
