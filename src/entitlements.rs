//! Entitlements file resolution

use crate::error::{Result, SignError};
use crate::map::SigningEntry;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Resolve an entry's entitlements file against `entitlements_dir`.
///
/// Returns `Ok(None)` when the entry has no entitlements. A referenced file
/// that is missing, not a regular file, or cannot be opened for reading is an
/// [`SignError::Entitlement`] naming the full path.
pub fn resolve_entitlements(entry: &SigningEntry, entitlements_dir: &Path) -> Result<Option<PathBuf>> {
    let Some(name) = entry.entitlements.as_deref() else {
        return Ok(None);
    };

    let full_path = entitlements_dir.join(name.trim_start_matches('/'));
    if !full_path.is_file() || File::open(&full_path).is_err() {
        return Err(SignError::Entitlement(full_path));
    }

    Ok(Some(full_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn entry(entitlements: Option<&str>) -> SigningEntry {
        SigningEntry {
            deep: false,
            hardened_runtime: true,
            entitlements: entitlements.map(str::to_string),
            globs: vec!["/a".into()],
        }
    }

    #[test]
    fn no_entitlements_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_entitlements(&entry(None), dir.path()).unwrap(), None);
    }

    #[test]
    fn existing_file_resolves_to_full_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("e.plist"), "<plist/>").unwrap();

        let resolved = resolve_entitlements(&entry(Some("e.plist")), dir.path()).unwrap();
        assert_eq!(resolved, Some(dir.path().join("e.plist")));
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        match resolve_entitlements(&entry(Some("e.plist")), dir.path()) {
            Err(SignError::Entitlement(path)) => assert_eq!(path, dir.path().join("e.plist")),
            other => panic!("expected entitlement error, got {other:?}"),
        }
    }

    #[test]
    fn directory_is_not_an_entitlements_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("e.plist")).unwrap();
        assert!(matches!(
            resolve_entitlements(&entry(Some("e.plist")), dir.path()),
            Err(SignError::Entitlement(_))
        ));
    }
}
