//! # condelta-catalog
//!
//! **Tier 1 (Parsing)**
//!
//! Parses a build-artifact manifest into an immutable [`ArtifactCatalog`].
//!
//! A manifest is record oriented: one file per line as
//! `<path>\t<digest>\t<size>`. Blank lines and `#` comments are skipped.
//! Space-separated manifests are tolerated by taking the rightmost two fields
//! as digest and size, so paths containing spaces survive.
//!
//! Catalogs preserve the manifest's original order; callers needing
//! determinism sort explicitly before reporting or digesting.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use condelta_path::normalize_rel_path;
use condelta_types::FileDescriptor;
use thiserror::Error;

/// Errors from manifest parsing.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest {path} line {line_no}: not a path/digest/size record: {line:?}")]
    Malformed {
        path: PathBuf,
        line_no: usize,
        line: String,
    },

    #[error("manifest {path} repeats path {file_path:?}")]
    DuplicatePath { path: PathBuf, file_path: String },

    #[error("manifest {path} exceeds limit ({what})")]
    TooLarge { path: PathBuf, what: String },
}

/// Defensive bounds on manifest reads.
///
/// Manifests are caller-owned temporary files; the caps exist so a corrupt or
/// hostile manifest cannot exhaust memory, not to constrain normal builds.
#[derive(Debug, Clone, Copy)]
pub struct CatalogLimits {
    pub max_bytes: u64,
    pub max_entries: usize,
}

impl Default for CatalogLimits {
    fn default() -> Self {
        Self {
            max_bytes: 256 * 1024 * 1024,
            max_entries: 2_000_000,
        }
    }
}

/// Ordered, immutable collection of file descriptors for one
/// (content entry, build) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCatalog {
    entry: String,
    files: Vec<FileDescriptor>,
}

impl ArtifactCatalog {
    /// Parse `manifest` for `entry` with default limits.
    pub fn parse(manifest: &Path, entry: &str) -> Result<Self, CatalogError> {
        Self::parse_with_limits(manifest, entry, CatalogLimits::default())
    }

    /// Parse `manifest` for `entry`, enforcing `limits`.
    pub fn parse_with_limits(
        manifest: &Path,
        entry: &str,
        limits: CatalogLimits,
    ) -> Result<Self, CatalogError> {
        let meta = fs::metadata(manifest).map_err(|source| CatalogError::Io {
            path: manifest.to_path_buf(),
            source,
        })?;
        if meta.len() > limits.max_bytes {
            return Err(CatalogError::TooLarge {
                path: manifest.to_path_buf(),
                what: format!("{} bytes > {} max", meta.len(), limits.max_bytes),
            });
        }

        let text = fs::read_to_string(manifest).map_err(|source| CatalogError::Io {
            path: manifest.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let record = parse_record(line).ok_or_else(|| CatalogError::Malformed {
                path: manifest.to_path_buf(),
                line_no: idx + 1,
                line: line.to_string(),
            })?;
            if !seen.insert(record.path.clone()) {
                return Err(CatalogError::DuplicatePath {
                    path: manifest.to_path_buf(),
                    file_path: record.path,
                });
            }
            files.push(record);
            if files.len() > limits.max_entries {
                return Err(CatalogError::TooLarge {
                    path: manifest.to_path_buf(),
                    what: format!("more than {} entries", limits.max_entries),
                });
            }
        }

        Ok(Self {
            entry: entry.to_string(),
            files,
        })
    }

    /// Build a catalog directly from descriptors. Paths are normalized; the
    /// input order is preserved. Intended for tests and in-process callers
    /// that already hold an enumeration.
    pub fn from_files(
        entry: impl Into<String>,
        files: impl IntoIterator<Item = FileDescriptor>,
    ) -> Self {
        let files = files
            .into_iter()
            .map(|mut f| {
                f.path = normalize_rel_path(&f.path);
                f
            })
            .collect();
        Self {
            entry: entry.into(),
            files,
        }
    }

    #[must_use]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    #[must_use]
    pub fn files(&self) -> &[FileDescriptor] {
        &self.files
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Descriptors sorted lexicographically by path.
    #[must_use]
    pub fn sorted_files(&self) -> Vec<FileDescriptor> {
        let mut sorted = self.files.clone();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        sorted
    }
}

/// Split one manifest line into a descriptor.
///
/// Tab-separated is the primary format. The whitespace fallback takes the
/// rightmost two fields as digest and size so the path may contain spaces.
fn parse_record(line: &str) -> Option<FileDescriptor> {
    let (path, digest, size) = if line.contains('\t') {
        let mut fields = line.split('\t');
        let path = fields.next()?;
        let digest = fields.next()?;
        let size = fields.next()?;
        if fields.next().is_some() {
            return None;
        }
        (path, digest, size)
    } else {
        let (rest, size) = line.rsplit_once(|c: char| c.is_ascii_whitespace())?;
        let (path, digest) = rest.trim_end().rsplit_once(|c: char| c.is_ascii_whitespace())?;
        (path.trim_end(), digest, size)
    };

    let path = normalize_rel_path(path.trim());
    if path.is_empty() || digest.is_empty() {
        return None;
    }
    let size: u64 = size.trim().parse().ok()?;
    Some(FileDescriptor::new(path, digest, size))
}
