//! # condelta-types
//!
//! **Tier 0 (Core Types)**
//!
//! Core data structures and contracts for `condelta`. This crate contains only
//! data types and their Serde definitions; diffing, classification, and
//! digesting logic live in the sibling crates.
//!
//! ## What belongs here
//! * Pure data structs (descriptors, contexts, results)
//! * Serialization/Deserialization logic
//!
//! ## What does NOT belong here
//! * File I/O (use condelta-catalog)
//! * Diff/classify/digest algorithms

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One cataloged artifact file.
///
/// `path` is manifest-relative with forward slashes; `digest` is an opaque
/// content hash used only as an equality key; `size` is the byte length.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileDescriptor {
    pub path: String,
    pub digest: String,
    pub size: u64,
}

impl FileDescriptor {
    pub fn new(path: impl Into<String>, digest: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            digest: digest.into(),
            size,
        }
    }
}

/// Canonical cache-key representation of a set of files.
///
/// Produced only by the Merkle digest builder and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Digest {
    pub hash: String,
    pub size_bytes: u64,
}

/// How a content entry should be analyzed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisMethod {
    /// Whole-file compare against a reference directory tree.
    File,
    /// Per-suite-module compare for an xTS-style packaged bundle.
    ModuleXts,
    /// Multi-entry compare across a sandboxed work directory.
    SandboxWorkdir,
    /// Single build-key compare: any relevant diff is one change event.
    BuildKey,
    /// Device image compare with known-volatile paths stripped.
    DeviceImage,
}

impl fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            AnalysisMethod::File => "FILE",
            AnalysisMethod::ModuleXts => "MODULE_XTS",
            AnalysisMethod::SandboxWorkdir => "SANDBOX_WORKDIR",
            AnalysisMethod::BuildKey => "BUILD_KEY",
            AnalysisMethod::DeviceImage => "DEVICE_IMAGE",
        };
        f.write_str(tag)
    }
}

/// One unit of analysis, owned and constructed by the harness.
///
/// The engine only reads contexts; they are plain values and safe to share
/// across threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Content entry identifier, e.g. a packaged artifact name.
    pub content_entry: String,
    /// Manifest for the base build. Absent means the context is invalid and
    /// analysis fails closed.
    #[serde(default)]
    pub base_manifest: Option<PathBuf>,
    /// Manifest for the current build. Absent means the context is invalid.
    #[serde(default)]
    pub current_manifest: Option<PathBuf>,
    /// Opaque build identifiers, used only for eligibility checks.
    #[serde(default)]
    pub base_build_id: Option<String>,
    #[serde(default)]
    pub current_build_id: Option<String>,
    pub method: AnalysisMethod,
    /// Paths excluded from diff consideration (exact match).
    #[serde(default)]
    pub ignored_paths: BTreeSet<String>,
    /// Path prefixes treated as shared rather than module-specific.
    #[serde(default)]
    pub common_locations: BTreeSet<String>,
    /// When set, the orchestrator short-circuits this context and reports a
    /// conservative "changed" verdict.
    #[serde(default)]
    pub abort_reason: Option<String>,
    /// Request a content-addressed root digest for the current catalog in
    /// addition to the change verdict.
    #[serde(default)]
    pub wants_digest: bool,
    /// Reference directory tree for the FILE method; ignored elsewhere.
    #[serde(default)]
    pub reference_dir: Option<PathBuf>,
}

impl AnalysisContext {
    /// A minimal context with no manifests; callers fill in the fields the
    /// chosen method needs.
    pub fn new(content_entry: impl Into<String>, method: AnalysisMethod) -> Self {
        Self {
            content_entry: content_entry.into(),
            base_manifest: None,
            current_manifest: None,
            base_build_id: None,
            current_build_id: None,
            method,
            ignored_paths: BTreeSet::new(),
            common_locations: BTreeSet::new(),
            abort_reason: None,
            wants_digest: false,
            reference_dir: None,
        }
    }

    /// Both manifest locations are present.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.base_manifest.is_some() && self.current_manifest.is_some()
    }

    /// Both build ids are present and equal. Lets the harness skip analysis
    /// entirely for a moving-head presubmit rerun on the same build.
    #[must_use]
    pub fn same_build(&self) -> bool {
        match (&self.base_build_id, &self.current_build_id) {
            (Some(base), Some(current)) => base == current,
            _ => false,
        }
    }
}

/// Accumulated verdict for one or more analyzed contexts.
///
/// Counters are per-file or per-event depending on the method; module sets
/// track suite-module granularity. The invariant that a module never appears
/// in both `modified_modules` and `unchanged_modules` is enforced by the merge
/// reducer in `condelta-model` before results reach the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisResults {
    pub unchanged_files: u64,
    pub modified_files: u64,
    pub shared_folder_changes: u64,
    pub build_key_changes: u64,
    pub device_image_changes: u64,
    pub modified_modules: BTreeSet<String>,
    pub unchanged_modules: BTreeSet<String>,
    /// Logical name (entry or image name) to computed root digest.
    pub module_digests: BTreeMap<String, Digest>,
    /// Degradations and data-integrity notes accumulated during analysis.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl AnalysisResults {
    /// True iff any change counter is positive or any module was modified.
    #[must_use]
    pub fn has_any_change(&self) -> bool {
        self.modified_files > 0
            || self.shared_folder_changes > 0
            || self.build_key_changes > 0
            || self.device_image_changes > 0
            || !self.modified_modules.is_empty()
    }

    /// Nothing was recorded at all (distinct from "analyzed, no change").
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Outcome of an analysis request.
///
/// `Unavailable` means no determination could be made; callers must treat it
/// as "rerun everything" and must not cache under it. It is deliberately a
/// tagged variant rather than a nullable result so the two cases cannot be
/// conflated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Unavailable,
    Verdict(AnalysisResults),
}

impl AnalysisOutcome {
    /// The verdict, if one was produced.
    #[must_use]
    pub fn verdict(&self) -> Option<&AnalysisResults> {
        match self {
            AnalysisOutcome::Unavailable => None,
            AnalysisOutcome::Verdict(results) => Some(results),
        }
    }

    /// Fail-closed reading: `Unavailable` counts as changed.
    #[must_use]
    pub fn treat_as_changed(&self) -> bool {
        match self {
            AnalysisOutcome::Unavailable => true,
            AnalysisOutcome::Verdict(results) => results.has_any_change(),
        }
    }
}
