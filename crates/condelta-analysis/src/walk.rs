//! Reference directory tree walking for the FILE analysis method.

use std::path::Path;

use ignore::WalkBuilder;

use crate::error::AnalysisError;

/// Relative file paths under `root`, normalized and sorted.
///
/// The reference tree is what will actually be used for execution, so no
/// gitignore semantics apply: hidden files are included and symlinks are not
/// followed.
pub fn walk_reference_tree(root: &Path) -> Result<Vec<String>, AnalysisError> {
    let mut builder = WalkBuilder::new(root);
    builder.standard_filters(false);
    builder.hidden(false);
    builder.follow_links(false);

    let mut paths = Vec::new();
    for entry in builder.build() {
        let entry = entry.map_err(|source| AnalysisError::ReferenceWalk {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        paths.push(condelta_path::normalize_rel_path(&rel.to_string_lossy()));
    }

    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn walk_lists_nested_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        fs::write(dir.path().join("z.txt"), b"z").unwrap();
        fs::write(dir.path().join("sub/a.txt"), b"a").unwrap();
        fs::write(dir.path().join("sub/deeper/b.bin"), b"b").unwrap();

        let paths = walk_reference_tree(dir.path()).unwrap();
        assert_eq!(paths, vec!["sub/a.txt", "sub/deeper/b.bin", "z.txt"]);
    }

    #[test]
    fn walk_includes_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".hidden"), b"h").unwrap();
        let paths = walk_reference_tree(dir.path()).unwrap();
        assert_eq!(paths, vec![".hidden"]);
    }

    #[test]
    fn missing_root_is_a_walk_error() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        assert!(walk_reference_tree(&gone).is_err());
    }
}
