//! # condelta-merkle
//!
//! **Tier 2 (Digesting)**
//!
//! Builds the canonical content digest of a catalog's file set, usable as a
//! cache key against a remote content-addressable store.
//!
//! The construction is: filter the catalog, sort the survivors by path, lay
//! each out as a file node `{name, digest, executable=false}`, serialize the
//! node list into one canonical directory blob, and hash the blob with the
//! same primitive used for individual file digests. Unsorted input never
//! reaches the hashing step; digest stability is the entire point.
//!
//! Executability is fixed false: the harness fingerprints content, it does
//! not reproduce filesystems.

#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use condelta_catalog::ArtifactCatalog;
use condelta_path::{file_name, normalize_rel_path, under_any_prefix};
use condelta_types::{Digest, FileDescriptor};

/// Which catalog entries participate in the digest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PathFilter {
    /// Every file in the catalog.
    #[default]
    All,
    /// Only files under any of these prefixes.
    UnderAny(Vec<String>),
    /// Files not ignored (exact path), not under any excluded prefix, and not
    /// carrying an excluded file name.
    Excluding {
        ignored_paths: BTreeSet<String>,
        excluded_prefixes: Vec<String>,
        excluded_names: Vec<String>,
    },
}

impl PathFilter {
    #[must_use]
    pub fn admits(&self, path: &str) -> bool {
        let path = normalize_rel_path(path);
        match self {
            PathFilter::All => true,
            PathFilter::UnderAny(prefixes) => {
                under_any_prefix(&path, prefixes.iter().map(String::as_str))
            }
            PathFilter::Excluding {
                ignored_paths,
                excluded_prefixes,
                excluded_names,
            } => {
                !ignored_paths.contains(&path)
                    && !under_any_prefix(&path, excluded_prefixes.iter().map(String::as_str))
                    && !excluded_names.iter().any(|name| file_name(&path) == name)
            }
        }
    }
}

/// Root digest of the filtered, sorted file set, or `None` when the filter
/// admits nothing. An empty selection has no meaningful cache key; callers
/// must not cache under an absent digest.
#[must_use]
pub fn build_digest(catalog: &ArtifactCatalog, filter: &PathFilter) -> Option<Digest> {
    let mut nodes: Vec<&FileDescriptor> = catalog
        .files()
        .iter()
        .filter(|f| filter.admits(&f.path))
        .collect();
    if nodes.is_empty() {
        return None;
    }
    nodes.sort_by(|a, b| a.path.cmp(&b.path));

    let blob = serialize_nodes(&nodes);
    Some(Digest {
        hash: hash_bytes(&blob),
        size_bytes: blob.len() as u64,
    })
}

/// Hash a byte slice with the engine's digest primitive.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Canonical directory blob: for each node, length-prefixed name and digest
/// followed by the executable flag. Length prefixes keep the encoding
/// unambiguous for any path or digest content.
fn serialize_nodes(nodes: &[&FileDescriptor]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(nodes.len() * 80);
    for node in nodes {
        let name = node.path.as_bytes();
        let digest = node.digest.as_bytes();
        blob.extend_from_slice(&(name.len() as u32).to_le_bytes());
        blob.extend_from_slice(name);
        blob.extend_from_slice(&(digest.len() as u32).to_le_bytes());
        blob.extend_from_slice(digest);
        blob.push(0); // executable: always false
    }
    blob
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fd(path: &str, digest: &str) -> FileDescriptor {
        FileDescriptor::new(path, digest, 1)
    }

    fn catalog(files: &[(&str, &str)]) -> ArtifactCatalog {
        ArtifactCatalog::from_files("e", files.iter().map(|(p, d)| fd(p, d)))
    }

    #[test]
    fn empty_catalog_has_no_digest() {
        assert_eq!(build_digest(&catalog(&[]), &PathFilter::All), None);
    }

    #[test]
    fn filter_admitting_nothing_has_no_digest() {
        let cat = catalog(&[("a", "h1")]);
        let filter = PathFilter::UnderAny(vec!["tools/".into()]);
        assert_eq!(build_digest(&cat, &filter), None);
    }

    #[test]
    fn digest_is_input_order_independent() {
        let forward = catalog(&[("a", "h1"), ("b", "h2"), ("c", "h3")]);
        let reversed = catalog(&[("c", "h3"), ("b", "h2"), ("a", "h1")]);
        assert_eq!(
            build_digest(&forward, &PathFilter::All),
            build_digest(&reversed, &PathFilter::All)
        );
    }

    #[test]
    fn digest_changes_with_any_file_digest() {
        let before = catalog(&[("a", "h1"), ("b", "h2")]);
        let after = catalog(&[("a", "h1"), ("b", "h2-modified")]);
        assert_ne!(
            build_digest(&before, &PathFilter::All),
            build_digest(&after, &PathFilter::All)
        );
    }

    #[test]
    fn digest_changes_when_a_file_is_added_or_removed() {
        let small = catalog(&[("a", "h1")]);
        let large = catalog(&[("a", "h1"), ("b", "h2")]);
        assert_ne!(
            build_digest(&small, &PathFilter::All),
            build_digest(&large, &PathFilter::All)
        );
    }

    #[test]
    fn name_digest_boundary_is_unambiguous() {
        // Same concatenated bytes, different (name, digest) split.
        let one = catalog(&[("ab", "c")]);
        let two = catalog(&[("a", "bc")]);
        assert_ne!(
            build_digest(&one, &PathFilter::All),
            build_digest(&two, &PathFilter::All)
        );
    }

    #[test]
    fn under_any_filter_restricts_the_digest() {
        let cat = catalog(&[("tools/a", "h1"), ("testcases/m/f", "h2")]);
        let tools_only = build_digest(&cat, &PathFilter::UnderAny(vec!["tools/".into()]));
        let just_tools = catalog(&[("tools/a", "h1")]);
        assert_eq!(tools_only, build_digest(&just_tools, &PathFilter::All));
    }

    #[test]
    fn excluding_filter_drops_ignored_and_prefixed() {
        let cat = catalog(&[
            ("version.txt", "h1"),
            ("IMAGES/system.img", "h2"),
            ("system/app.apk", "h3"),
        ]);
        let filter = PathFilter::Excluding {
            ignored_paths: ["version.txt".to_string()].into(),
            excluded_prefixes: vec!["IMAGES/".into()],
            excluded_names: Vec::new(),
        };
        let expect = catalog(&[("system/app.apk", "h3")]);
        assert_eq!(
            build_digest(&cat, &filter),
            build_digest(&expect, &PathFilter::All)
        );
    }

    #[test]
    fn excluded_names_match_anywhere_in_the_tree() {
        let cat = catalog(&[
            ("build.prop", "h1"),
            ("system/build.prop", "h2"),
            ("system/app.apk", "h3"),
        ]);
        let filter = PathFilter::Excluding {
            ignored_paths: BTreeSet::new(),
            excluded_prefixes: Vec::new(),
            excluded_names: vec!["build.prop".into()],
        };
        let expect = catalog(&[("system/app.apk", "h3")]);
        assert_eq!(
            build_digest(&cat, &filter),
            build_digest(&expect, &PathFilter::All)
        );
    }

    #[test]
    fn size_bytes_is_serialized_length() {
        let cat = catalog(&[("a", "h1")]);
        let digest = build_digest(&cat, &PathFilter::All).unwrap();
        // 4 + len("a") + 4 + len("h1") + 1
        assert_eq!(digest.size_bytes, 4 + 1 + 4 + 2 + 1);
    }

    proptest! {
        #[test]
        fn digest_deterministic_across_shuffles(
            entries in proptest::collection::btree_map(
                "[a-z]{1,6}(/[a-z]{1,6}){0,2}",
                "[0-9a-f]{8}",
                1..16,
            ),
            seed in 0usize..16,
        ) {
            let ordered: Vec<(String, String)> = entries.into_iter().collect();
            let mut rotated = ordered.clone();
            let rotate_by = seed % rotated.len().max(1);
            rotated.rotate_left(rotate_by);

            let a = ArtifactCatalog::from_files(
                "e",
                ordered.iter().map(|(p, d)| fd(p, d)),
            );
            let b = ArtifactCatalog::from_files(
                "e",
                rotated.iter().map(|(p, d)| fd(p, d)),
            );
            prop_assert_eq!(
                build_digest(&a, &PathFilter::All),
                build_digest(&b, &PathFilter::All)
            );
        }
    }
}
