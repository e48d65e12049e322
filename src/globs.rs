//! Root-relative glob pattern resolution
//!
//! Patterns in a map entry always start with `/`, meaning the root directory
//! given on the command line. Matching follows shell rules:
//! - `*`, `?` and `[...]` never cross a `/`
//! - a `**` component matches any number of directory levels
//! - `{`, `}` and `\` are ordinary characters
//! - a wildcard component skips dot-prefixed names unless it starts with `.`
//!   itself. Below a `**`, hidden names are allowed only when some component
//!   after the `**` starts with `.`
//! - directories match as well as files, since bundles are directories
//!
//! Results keep pattern order. Within a single pattern, matches are sorted by
//! path so repeated runs sign in the same order.

use crate::error::{Result, SignError};
use crate::map::SigningEntry;
use globset::{GlobBuilder, GlobMatcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Separator every pattern must begin with.
pub const ROOT_SEPARATOR: char = '/';

const GLOB_META: [char; 3] = ['*', '?', '['];

/// A validated pattern ready to be matched against a root directory.
#[derive(Debug, Clone)]
pub struct RootedPattern {
    raw: String,
    /// Leading components without wildcards, walked to directly
    prefix: Vec<String>,
    /// Components from the first wildcard on
    rest: Vec<String>,
    matcher: Option<GlobMatcher>,
    /// Position in `rest` of the first `**` component
    recursive_at: Option<usize>,
    /// Per `rest` component: may it match a dot-prefixed name
    hidden_ok: Vec<bool>,
    hidden_below_recursive: bool,
}

/// Matches for one pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatches {
    pub pattern: String,
    pub paths: Vec<PathBuf>,
}

impl RootedPattern {
    /// Validate `pattern` from map entry `index`.
    pub fn parse(index: usize, pattern: &str) -> Result<Self> {
        if !pattern.starts_with(ROOT_SEPARATOR) {
            return Err(SignError::pattern(
                index,
                pattern,
                format!("must start with \"{ROOT_SEPARATOR}\""),
            ));
        }

        let components: Vec<String> = pattern
            .split(ROOT_SEPARATOR)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();

        let split = components
            .iter()
            .position(|c| c.contains(GLOB_META))
            .unwrap_or(components.len());
        let (prefix, rest) = components.split_at(split);

        let matcher = if rest.is_empty() {
            None
        } else {
            let relative = escape_braces(&components.join("/"));
            let glob = GlobBuilder::new(&relative)
                .literal_separator(true)
                .backslash_escape(false)
                .build()
                .map_err(|e| SignError::pattern(index, pattern, format!("is not a valid glob: {e}")))?;
            Some(glob.compile_matcher())
        };

        let recursive_at = rest.iter().position(|c| c.contains("**"));
        let hidden_below_recursive =
            recursive_at.is_some_and(|r| rest[r + 1..].iter().any(|c| c.starts_with('.')));

        Ok(Self {
            raw: pattern.to_string(),
            prefix: prefix.to_vec(),
            rest: rest.to_vec(),
            matcher,
            recursive_at,
            hidden_ok: rest.iter().map(|c| c.starts_with('.')).collect(),
            hidden_below_recursive,
        })
    }

    /// Whether a dot-prefixed name may be matched `depth` levels below the
    /// literal prefix.
    fn allows_hidden_at(&self, depth: usize) -> bool {
        let position = depth.saturating_sub(1);
        match self.recursive_at {
            Some(r) if position >= r => self.hidden_below_recursive,
            _ => self.hidden_ok.get(position).copied().unwrap_or(false),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// All paths under `root` matching this pattern.
    #[must_use]
    pub fn matches(&self, root: &Path) -> Vec<PathBuf> {
        let base = self.prefix.iter().fold(root.to_path_buf(), |p, c| p.join(c));

        let Some(matcher) = &self.matcher else {
            // No wildcards: the literal path, if anything is there
            return if base.symlink_metadata().is_ok() {
                vec![base]
            } else {
                Vec::new()
            };
        };

        if !base.is_dir() {
            return Vec::new();
        }

        let mut walker = WalkDir::new(&base)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        if self.recursive_at.is_none() {
            walker = walker.max_depth(self.rest.len());
        }

        walker
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_name().to_string_lossy().starts_with('.')
                    || self.allows_hidden_at(e.depth())
            })
            .filter_map(std::result::Result::ok)
            .filter(|e| {
                e.path()
                    .strip_prefix(root)
                    .is_ok_and(|relative| matcher.is_match(relative))
            })
            .map(walkdir::DirEntry::into_path)
            .collect()
    }
}

/// Make `{` and `}` match themselves instead of starting an alternation.
///
/// Braces inside a `[...]` class are already literal and are left alone.
fn escape_braces(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len());
    // Characters seen since the opening `[` of the current class
    let mut class: Option<usize> = None;
    let mut negated = false;

    for c in glob.chars() {
        match (class, c) {
            (None, '[') => {
                class = Some(0);
                negated = false;
                out.push(c);
            }
            (None, '{') => out.push_str("[{]"),
            (None, '}') => out.push_str("[}]"),
            (None, _) => out.push(c),
            (Some(0), '!' | '^') if !negated => {
                negated = true;
                out.push(c);
            }
            (Some(n), ']') if n > 0 => {
                class = None;
                out.push(c);
            }
            (Some(n), _) => {
                class = Some(n + 1);
                out.push(c);
            }
        }
    }
    out
}

/// Validate every pattern of an entry without touching the filesystem.
pub fn compile_patterns(index: usize, entry: &SigningEntry) -> Result<Vec<RootedPattern>> {
    entry
        .globs
        .iter()
        .map(|pattern| RootedPattern::parse(index, pattern))
        .collect()
}

/// Resolve every pattern of an entry against `root`, in pattern order.
pub fn resolve_patterns(index: usize, entry: &SigningEntry, root: &Path) -> Result<Vec<PatternMatches>> {
    Ok(compile_patterns(index, entry)?
        .into_iter()
        .map(|pattern| PatternMatches {
            paths: pattern.matches(root),
            pattern: pattern.raw,
        })
        .collect())
}

/// Flatten per-pattern matches into the file list handed to codesign.
///
/// Paths are concatenated in pattern order. With `dedupe`, a path seen
/// earlier in the same entry is dropped.
#[must_use]
pub fn flatten_matches(matches: Vec<PatternMatches>, dedupe: bool) -> Vec<PathBuf> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files: Vec<PathBuf> = Vec::new();
    for path in matches.into_iter().flat_map(|m| m.paths) {
        if dedupe && !seen.insert(path.clone()) {
            continue;
        }
        files.push(path);
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x").unwrap();
        }
        dir
    }

    fn matched(root: &Path, pattern: &str) -> Vec<String> {
        RootedPattern::parse(0, pattern)
            .unwrap()
            .matches(root)
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn unrooted_pattern_is_rejected_even_if_it_would_match() {
        let dir = tree(&["bin/a"]);
        assert!(dir.path().join("bin/a").exists());
        match RootedPattern::parse(3, "bin/a") {
            Err(SignError::Pattern { index, pattern, .. }) => {
                assert_eq!(index, 3);
                assert_eq!(pattern, "bin/a");
            }
            other => panic!("expected pattern error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_glob_syntax_is_a_pattern_error() {
        assert!(matches!(
            RootedPattern::parse(0, "/bin/[a"),
            Err(SignError::Pattern { .. })
        ));
    }

    #[test]
    fn literal_pattern_matches_existing_path_only() {
        let dir = tree(&["bin/a"]);
        assert_eq!(matched(dir.path(), "/bin/a"), vec!["bin/a"]);
        assert!(matched(dir.path(), "/bin/missing").is_empty());
    }

    #[test]
    fn star_stays_within_one_directory() {
        let dir = tree(&["bin/b1", "bin/b2", "bin/sub/b3", "lib/b4"]);
        assert_eq!(matched(dir.path(), "/bin/b*"), vec!["bin/b1", "bin/b2"]);
    }

    #[test]
    fn double_star_crosses_directories() {
        let dir = tree(&["a/x.dylib", "a/b/y.dylib", "a/b/c/z.dylib", "a/b/c/z.txt"]);
        assert_eq!(
            matched(dir.path(), "/a/**/*.dylib"),
            vec!["a/b/c/z.dylib", "a/b/y.dylib", "a/x.dylib"]
        );
    }

    #[test]
    fn directories_match_too() {
        let dir = tree(&[
            "Contents/Frameworks/A.framework/A",
            "Contents/Frameworks/B.framework/B",
        ]);
        assert_eq!(
            matched(dir.path(), "/Contents/Frameworks/*.framework"),
            vec!["Contents/Frameworks/A.framework", "Contents/Frameworks/B.framework"]
        );
    }

    #[test]
    fn hidden_entries_need_an_explicit_dot() {
        let dir = tree(&["bin/.hidden", "bin/visible"]);
        assert_eq!(matched(dir.path(), "/bin/*"), vec!["bin/visible"]);
        assert_eq!(matched(dir.path(), "/bin/.*"), vec!["bin/.hidden"]);
    }

    #[test]
    fn braces_and_backslashes_are_literal() {
        let dir = tree(&["bin/a{1}", "bin/a1", "bin/x", "bin/y", "bin/c\\d"]);
        assert_eq!(matched(dir.path(), "/bin/a{1}"), vec!["bin/a{1}"]);
        assert_eq!(matched(dir.path(), "/bin/*{1}"), vec!["bin/a{1}"]);
        assert!(matched(dir.path(), "/bin/{x,y}").is_empty());
        assert_eq!(matched(dir.path(), "/bin/c\\*"), vec!["bin/c\\d"]);
    }

    #[test]
    fn braces_inside_a_class_are_untouched() {
        assert_eq!(escape_braces("a{b}"), "a[{]b[}]");
        assert_eq!(escape_braces("[{}]x{"), "[{}]x[{]");
        assert_eq!(escape_braces("[]{]{"), "[]{][{]");
        assert_eq!(escape_braces("[!]]}"), "[!]][}]");
    }

    #[test]
    fn hidden_names_are_decided_per_component() {
        let dir = tree(&["a/.x", ".h/.x", "b/c"]);
        assert_eq!(matched(dir.path(), "/*/.x"), vec!["a/.x"]);
        assert_eq!(matched(dir.path(), "/.*/.x"), vec![".h/.x"]);
    }

    #[test]
    fn double_star_skips_hidden_unless_tail_names_one() {
        let dir = tree(&["a/.git/f.dylib", "a/b/f.dylib", "a/b/.cfg"]);
        assert_eq!(matched(dir.path(), "/a/**/*.dylib"), vec!["a/b/f.dylib"]);
        assert_eq!(matched(dir.path(), "/a/**/.cfg"), vec!["a/b/.cfg"]);
    }

    #[test]
    fn dedupe_handles_many_repeats() {
        let paths: Vec<PathBuf> = (0..1000).map(|i| PathBuf::from(format!("/r/{}", i % 10))).collect();
        let files = flatten_matches(
            vec![PatternMatches {
                pattern: "/**".into(),
                paths,
            }],
            true,
        );
        assert_eq!(files.len(), 10);
        assert_eq!(files[3], PathBuf::from("/r/3"));
    }

    #[test]
    fn empty_matches_keep_their_slot() {
        let dir = tree(&["bin/a"]);
        let entry = SigningEntry {
            deep: false,
            hardened_runtime: false,
            entitlements: None,
            globs: vec!["/nothing/*".into(), "/bin/a".into()],
        };
        let matches = resolve_patterns(0, &entry, dir.path()).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches[0].paths.is_empty());
        assert_eq!(matches[1].paths, vec![dir.path().join("bin/a")]);
    }

    #[test]
    fn flatten_keeps_pattern_order_and_duplicates() {
        let a = PathBuf::from("/r/a");
        let b = PathBuf::from("/r/b");
        let matches = vec![
            PatternMatches {
                pattern: "/b".into(),
                paths: vec![b.clone()],
            },
            PatternMatches {
                pattern: "/*".into(),
                paths: vec![a.clone(), b.clone()],
            },
        ];

        assert_eq!(
            flatten_matches(matches.clone(), false),
            vec![b.clone(), a.clone(), b.clone()]
        );
        assert_eq!(flatten_matches(matches, true), vec![b, a]);
    }
}
