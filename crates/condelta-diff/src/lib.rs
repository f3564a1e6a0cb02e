//! Asymmetric content diffing between a base and a current catalog.
//!
//! The diff answers "did `current` diverge from `base` in a way that matters
//! for running against `current`": every descriptor of `current` whose
//! `(path, digest)` pair has no exact match in `base` is reported, which folds
//! "file added" and "file content changed" into one modified outcome. Files
//! present only in `base` are not reported; the asymmetry is intentional and
//! must not be "fixed" into a bidirectional delta.

#![forbid(unsafe_code)]

use std::collections::{BTreeSet, HashSet};

use condelta_catalog::ArtifactCatalog;
use condelta_types::FileDescriptor;

/// Descriptors of `current` with no exact `(path, digest)` match in `base`.
///
/// Output preserves `current`'s catalog order; membership is a hash-set probe
/// over `base`, O(|current|) expected.
#[must_use]
pub fn diff(base: &ArtifactCatalog, current: &ArtifactCatalog) -> Vec<FileDescriptor> {
    let base_pairs: HashSet<(&str, &str)> = base
        .files()
        .iter()
        .map(|f| (f.path.as_str(), f.digest.as_str()))
        .collect();

    current
        .files()
        .iter()
        .filter(|f| !base_pairs.contains(&(f.path.as_str(), f.digest.as_str())))
        .cloned()
        .collect()
}

/// The diff as a path set, for callers that only need membership checks.
#[must_use]
pub fn diff_paths(base: &ArtifactCatalog, current: &ArtifactCatalog) -> BTreeSet<String> {
    diff(base, current).into_iter().map(|f| f.path).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn catalog(entry: &str, files: &[(&str, &str)]) -> ArtifactCatalog {
        ArtifactCatalog::from_files(
            entry,
            files
                .iter()
                .map(|(path, digest)| FileDescriptor::new(*path, *digest, 1)),
        )
    }

    #[test]
    fn identical_catalogs_diff_empty() {
        let base = catalog("e", &[("a", "h1"), ("b", "h2")]);
        let current = catalog("e", &[("a", "h1"), ("b", "h2")]);
        assert!(diff(&base, &current).is_empty());
    }

    #[test]
    fn content_change_is_reported() {
        let base = catalog("e", &[("a", "h1")]);
        let current = catalog("e", &[("a", "h9")]);
        let changed = diff(&base, &current);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].path, "a");
        assert_eq!(changed[0].digest, "h9");
    }

    #[test]
    fn added_file_is_reported_once() {
        let base = catalog("e", &[("a", "h1")]);
        let current = catalog("e", &[("a", "h1"), ("new", "h2")]);
        let changed = diff(&base, &current);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].path, "new");
    }

    #[test]
    fn removed_file_is_not_reported() {
        let base = catalog("e", &[("a", "h1"), ("gone", "h2")]);
        let current = catalog("e", &[("a", "h1")]);
        assert!(diff(&base, &current).is_empty());
    }

    #[test]
    fn output_preserves_current_order() {
        let base = catalog("e", &[]);
        let current = catalog("e", &[("z", "h1"), ("a", "h2")]);
        let changed = diff(&base, &current);
        assert_eq!(changed[0].path, "z");
        assert_eq!(changed[1].path, "a");
    }

    #[test]
    fn diff_paths_is_sorted_set() {
        let base = catalog("e", &[]);
        let current = catalog("e", &[("z", "h1"), ("a", "h2")]);
        let paths: Vec<String> = diff_paths(&base, &current).into_iter().collect();
        assert_eq!(paths, vec!["a".to_string(), "z".to_string()]);
    }

    prop_compose! {
        fn arb_files()(entries in proptest::collection::btree_map(
            "[a-z]{1,6}(/[a-z]{1,6}){0,2}",
            "[0-9a-f]{8}",
            0..20,
        )) -> Vec<(String, String)> {
            entries.into_iter().collect()
        }
    }

    proptest! {
        #[test]
        fn self_diff_is_empty(files in arb_files()) {
            let cat = ArtifactCatalog::from_files(
                "e",
                files.iter().map(|(p, d)| FileDescriptor::new(p.clone(), d.clone(), 1)),
            );
            prop_assert!(diff(&cat, &cat).is_empty());
        }

        #[test]
        fn every_added_file_appears_exactly_once(
            files in arb_files(),
            added_digest in "[0-9a-f]{8}",
        ) {
            let base = ArtifactCatalog::from_files(
                "e",
                files.iter().map(|(p, d)| FileDescriptor::new(p.clone(), d.clone(), 1)),
            );
            let mut current_files: Vec<FileDescriptor> = files
                .iter()
                .map(|(p, d)| FileDescriptor::new(p.clone(), d.clone(), 1))
                .collect();
            // A path guaranteed not to collide with the [a-z/] generator.
            current_files.push(FileDescriptor::new("ADDED_FILE", added_digest, 1));
            let current = ArtifactCatalog::from_files("e", current_files);

            let changed = diff(&base, &current);
            let hits = changed.iter().filter(|f| f.path == "ADDED_FILE").count();
            prop_assert_eq!(hits, 1);
        }
    }
}
