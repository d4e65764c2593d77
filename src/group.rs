#[cfg(feature = "rayon")]
extern crate rayon;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::fingerprint::{FingerprintResult, Fingerprinter};
use crate::Error;

/// A file and its fingerprint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub result: FingerprintResult,
}

/// A set of files sharing the same fingerprint key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub key: String,
    pub entries: Vec<Entry>,
}

/// Accumulates fingerprinted files by key.
///
/// Entries are kept in insertion order within each key. Use [DuplicateGroups::duplicates]
/// to get the groups with more than one member in presentation order.
#[derive(Debug, Default)]
pub struct DuplicateGroups {
    groups: HashMap<String, Vec<Entry>>,
    total: usize,
}

impl DuplicateGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, result: FingerprintResult) {
        self.total += 1;
        self.groups
            .entry(result.key.clone())
            .or_default()
            .push(Entry {
                path: path.into(),
                result,
            });
    }

    /// Number of files inserted.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Returns the entries recorded under `key`, in insertion order.
    pub fn get(&self, key: &str) -> Option<&[Entry]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Returns all groups with at least two members.
    ///
    /// Groups are sorted by key, and entries within a group are sorted by path.
    pub fn duplicates(&self) -> Vec<DuplicateGroup> {
        let mut duplicates: Vec<DuplicateGroup> = self
            .groups
            .iter()
            .filter(|(_, entries)| entries.len() > 1)
            .map(|(key, entries)| {
                let mut entries = entries.clone();
                entries.sort_by_cached_key(|e| e.path.to_string_lossy().into_owned());
                DuplicateGroup {
                    key: key.clone(),
                    entries,
                }
            })
            .collect();
        duplicates.sort_by(|a, b| a.key.cmp(&b.key));
        duplicates
    }
}

impl<P: Into<PathBuf>> FromIterator<(P, FingerprintResult)> for DuplicateGroups {
    fn from_iter<I: IntoIterator<Item = (P, FingerprintResult)>>(iter: I) -> Self {
        let mut groups = Self::new();
        for (path, result) in iter {
            groups.insert(path, result);
        }
        groups
    }
}

/// Result of fingerprinting a list of files.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub groups: DuplicateGroups,
    /// Files that could not be fingerprinted at all.
    pub failures: Vec<(PathBuf, Error)>,
}

/// Fingerprints each file and groups the results by key.
///
/// A failure for one file is recorded in [ScanOutcome::failures] and does not affect the
/// others. If `threading` is set (and the `rayon` feature is enabled), files are
/// fingerprinted in parallel; results are still merged in input order.
pub fn find_duplicates<P: AsRef<Path> + Sync>(
    files: &[P],
    fingerprinter: &Fingerprinter,
    threading: bool,
) -> ScanOutcome {
    let span = tracing::span!(tracing::Level::TRACE, "find_duplicates");
    let _enter = span.enter();

    let fingerprint = |path: &P| (path.as_ref().to_owned(), fingerprinter.fingerprint(path));

    let mut results = Vec::new();
    if cfg!(feature = "rayon") && threading {
        #[cfg(feature = "rayon")]
        {
            results = files.par_iter().map(fingerprint).collect::<Vec<_>>();
        }
    } else {
        results.extend(files.iter().map(fingerprint));
    }

    let mut outcome = ScanOutcome::default();
    for (path, result) in results {
        match result {
            Ok(result) => {
                tracing::debug!(kind = %result.kind, "{}: {}", path.display(), result.detail);
                outcome.groups.insert(path, result);
            }
            Err(e) => {
                tracing::warn!("failed to fingerprint {}: {}", path.display(), e);
                outcome.failures.push((path, e));
            }
        }
    }

    outcome
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fingerprint::FingerprintKind;
    use crate::Capabilities;

    fn result(key: &str) -> FingerprintResult {
        FingerprintResult {
            kind: FingerprintKind::Fallback,
            key: key.to_string(),
            detail: format!("detail:{}", key),
        }
    }

    fn sample() -> Vec<(&'static str, FingerprintResult)> {
        vec![
            ("/m/zeta.mp4", result("b")),
            ("/m/alpha.mp4", result("b")),
            ("/m/solo.mp3", result("c")),
            ("/m/beta.wav", result("a")),
            ("/m/a/gamma.wav", result("a")),
            ("/m/a-delta.wav", result("a")),
        ]
    }

    fn paths(group: &DuplicateGroup) -> Vec<&str> {
        group
            .entries
            .iter()
            .map(|e| e.path.to_str().unwrap())
            .collect()
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let groups: DuplicateGroups = sample().into_iter().collect();
        assert_eq!(groups.total(), 6);
        let b: Vec<_> = groups.get("b").unwrap().iter().map(|e| &e.path).collect();
        assert_eq!(b, vec![Path::new("/m/zeta.mp4"), Path::new("/m/alpha.mp4")]);
    }

    #[test]
    fn test_singletons_are_dropped() {
        let groups: DuplicateGroups = sample().into_iter().collect();
        let duplicates = groups.duplicates();
        assert_eq!(duplicates.len(), 2);
        assert!(duplicates.iter().all(|g| g.key != "c"));
        assert!(groups.get("c").is_some());
    }

    #[test]
    fn test_presentation_order() {
        let groups: DuplicateGroups = sample().into_iter().collect();
        let duplicates = groups.duplicates();

        assert_eq!(duplicates[0].key, "a");
        // Sorted as strings: '-' sorts before '/'.
        assert_eq!(
            paths(&duplicates[0]),
            vec!["/m/a-delta.wav", "/m/a/gamma.wav", "/m/beta.wav"]
        );
        assert_eq!(duplicates[1].key, "b");
        assert_eq!(paths(&duplicates[1]), vec!["/m/alpha.mp4", "/m/zeta.mp4"]);
    }

    #[test]
    fn test_order_independent() {
        let expected = sample().into_iter().collect::<DuplicateGroups>().duplicates();

        let mut reversed = sample();
        reversed.reverse();
        let mut rotated = sample();
        rotated.rotate_left(4);

        for input in [reversed, rotated] {
            let groups: DuplicateGroups = input.into_iter().collect();
            assert_eq!(groups.duplicates(), expected);
        }
    }

    #[test]
    fn test_empty() {
        let groups = DuplicateGroups::new();
        assert_eq!(groups.total(), 0);
        assert!(groups.duplicates().is_empty());
    }

    #[test]
    fn test_find_duplicates_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        let missing = dir.path().join("missing.bin");
        std::fs::write(&a, b"same").unwrap();
        std::fs::write(&b, b"same").unwrap();

        let fingerprinter = Fingerprinter::new(Capabilities::none());
        for threading in [false, true] {
            let files = vec![a.clone(), missing.clone(), b.clone()];
            let outcome = find_duplicates(&files, &fingerprinter, threading);

            assert_eq!(outcome.failures.len(), 1);
            assert_eq!(outcome.failures[0].0, missing);
            assert_eq!(outcome.groups.total(), 2);

            let duplicates = outcome.groups.duplicates();
            assert_eq!(duplicates.len(), 1);
            assert_eq!(duplicates[0].entries[0].path, a);
            assert_eq!(duplicates[0].entries[1].path, b);
        }
    }
}
