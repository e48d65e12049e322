//! Translation of resolved map entries into codesign command lines

use crate::map::SigningEntry;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// A map entry with its entitlements and file list resolved on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry<'a> {
    /// Position in the map
    pub index: usize,
    pub entry: &'a SigningEntry,
    pub entitlements: Option<PathBuf>,
    /// Matched paths in pattern order, then match order
    pub files: Vec<PathBuf>,
}

/// One codesign invocation: program, flags, then the files to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub files: Vec<PathBuf>,
}

impl Invocation {
    /// Build the invocation for `resolved`.
    ///
    /// codesign requires every option before the first file, so arguments
    /// are always laid out as:
    /// `--force -v --sign <identity> [--deep] [--options runtime]
    /// [--entitlements <path>] <file>...`
    #[must_use]
    pub fn build(program: &Path, identity: &str, resolved: &ResolvedEntry<'_>) -> Self {
        let mut args: Vec<OsString> = ["--force", "-v", "--sign", identity]
            .into_iter()
            .map(OsString::from)
            .collect();

        if resolved.entry.deep {
            args.push("--deep".into());
        }

        // Hardened runtime (required for notarization)
        if resolved.entry.hardened_runtime {
            args.push("--options".into());
            args.push("runtime".into());
        }

        if let Some(entitlements) = &resolved.entitlements {
            args.push("--entitlements".into());
            args.push(entitlements.clone().into_os_string());
        }

        Self {
            program: program.to_path_buf(),
            args,
            files: resolved.files.clone(),
        }
    }

    /// Every argument after the program name, files last.
    pub fn argv(&self) -> impl Iterator<Item = &OsStr> {
        self.args
            .iter()
            .map(OsString::as_os_str)
            .chain(self.files.iter().map(|f| f.as_os_str()))
    }

    /// The invocation as a single space separated line, as printed in
    /// verbose and simulate modes.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.argv())
            .map(OsStr::to_string_lossy)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
