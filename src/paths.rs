//! Validation of the map file, entitlements directory and root directory

use crate::error::{Result, SignError};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Expand a leading `~` in a path, returning an error if HOME is not set
///
/// When HOME is unset, `shellexpand` leaves the `~` unchanged; that case is
/// reported instead of silently producing a relative path named `~`.
pub fn expand_tilde_path(what: &'static str, path: &Path) -> Result<PathBuf> {
    let Some(raw) = path.to_str() else {
        return Ok(path.to_path_buf());
    };

    let expanded = shellexpand::tilde(raw).to_string();
    if raw.starts_with('~') && expanded.starts_with('~') {
        return Err(SignError::path(
            what,
            path,
            "could not expand ~ (HOME environment variable not set), use an absolute path",
        ));
    }

    Ok(PathBuf::from(expanded))
}

/// Check that the map file exists and can be opened, returning its real path.
pub fn validate_map_file(path: &Path) -> Result<PathBuf> {
    let path = expand_tilde_path("map file", path)?;

    if !path.is_file() {
        return Err(SignError::path("map file", &path, "not found"));
    }
    File::open(&path).map_err(|e| SignError::path("map file", &path, format!("read access error: {e}")))?;

    path.canonicalize()
        .map_err(|e| SignError::path("map file", &path, e.to_string()))
}

/// Check that `path` is a directory and return its real path.
///
/// The returned path never carries a trailing separator, so entitlement
/// names and root-relative patterns can be appended directly.
pub fn validate_directory(what: &'static str, path: &Path) -> Result<PathBuf> {
    let path = expand_tilde_path(what, path)?;

    if !path.is_dir() {
        return Err(SignError::path(what, &path, "not a directory"));
    }

    path.canonicalize()
        .map_err(|e| SignError::path(what, &path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn directory_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("root")).unwrap();

        let with_slash = PathBuf::from(format!("{}/root/", dir.path().display()));
        let resolved = validate_directory("root directory", &with_slash).unwrap();

        assert_eq!(resolved, dir.path().join("root").canonicalize().unwrap());
        assert!(!resolved.to_string_lossy().ends_with('/'));
    }

    #[test]
    fn file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, "x").unwrap();

        let err = validate_directory("entitlements directory", &file).unwrap_err();
        assert!(matches!(
            err,
            SignError::Path {
                what: "entitlements directory",
                ..
            }
        ));
    }

    #[test]
    fn map_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_map_file(&dir.path().join("nope.json")).is_err());

        let map = dir.path().join("map.json");
        fs::write(&map, "{}").unwrap();
        assert_eq!(validate_map_file(&map).unwrap(), map.canonicalize().unwrap());
    }

    #[test]
    fn directories_are_not_map_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_map_file(dir.path()).is_err());
    }

    #[test]
    fn plain_paths_are_untouched_by_expansion() {
        let path = Path::new("/tmp/some/where");
        assert_eq!(expand_tilde_path("root directory", path).unwrap(), path);
    }
}
