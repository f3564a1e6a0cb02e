//! Orchestrator configuration.

use std::collections::BTreeMap;

use condelta_catalog::CatalogLimits;
use serde::{Deserialize, Serialize};

/// Known common directories per sandbox work-dir entry.
///
/// The sandbox analysis refuses to guess: an entry with no mapping here fails
/// the whole analysis rather than being silently skipped. The default table
/// covers the suite bundles the harness extracts into work directories;
/// harnesses with custom bundles supply overrides via [`Self::from_json_str`]
/// or [`Self::insert`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SandboxCommonDirs {
    entries: BTreeMap<String, Vec<String>>,
}

impl SandboxCommonDirs {
    /// An empty table (every entry unknown). Prefer `default()`.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Parse a harness-supplied `{entry: [prefixes]}` JSON object.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn insert(&mut self, entry: impl Into<String>, common_dirs: Vec<String>) {
        self.entries.insert(entry.into(), common_dirs);
    }

    /// Common-directory prefixes for `entry`, or `None` when unknown.
    #[must_use]
    pub fn get(&self, entry: &str) -> Option<&[String]> {
        self.entries.get(entry).map(Vec::as_slice)
    }
}

impl Default for SandboxCommonDirs {
    fn default() -> Self {
        let mut table = Self::empty();
        for (entry, dirs) in [
            ("android-cts.zip", vec!["android-cts/tools/", "android-cts/jdk/", "android-cts/lib/", "android-cts/lib64/"]),
            ("android-gts.zip", vec!["android-gts/tools/", "android-gts/jdk/", "android-gts/lib/", "android-gts/lib64/"]),
            ("android-vts.zip", vec!["android-vts/tools/", "android-vts/jdk/", "android-vts/lib/", "android-vts/lib64/"]),
            ("general-tests.zip", vec!["tools/", "lib/", "lib64/"]),
            ("device-tests.zip", vec!["tools/", "lib/", "lib64/"]),
            ("host-unit-tests.zip", vec!["host/tools/", "host/lib/", "host/lib64/"]),
        ] {
            table.insert(entry, dirs.into_iter().map(String::from).collect());
        }
        table
    }
}

/// Knobs for one `evaluate` call.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Surface invalid contexts as errors instead of degrading to "changed".
    pub strict: bool,
    /// Defensive manifest-read bounds.
    pub limits: CatalogLimits,
    /// Per-entry common-directory table for SANDBOX_WORKDIR.
    pub sandbox_common_dirs: SandboxCommonDirs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_knows_suite_bundles() {
        let table = SandboxCommonDirs::default();
        assert!(table.get("android-cts.zip").is_some());
        assert!(table.get("general-tests.zip").is_some());
        assert_eq!(table.get("custom-bundle.zip"), None);
    }

    #[test]
    fn json_overrides_round_trip() {
        let table =
            SandboxCommonDirs::from_json_str(r#"{"custom.zip": ["custom/tools/"]}"#).unwrap();
        assert_eq!(
            table.get("custom.zip").unwrap(),
            &["custom/tools/".to_string()]
        );
    }

    #[test]
    fn insert_overrides_defaults() {
        let mut table = SandboxCommonDirs::default();
        table.insert("android-cts.zip", vec!["android-cts/tools/".into()]);
        assert_eq!(table.get("android-cts.zip").unwrap().len(), 1);
    }
}
