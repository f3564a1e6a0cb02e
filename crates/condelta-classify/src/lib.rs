//! Ignore/common/module classification of diff entries.
//!
//! Rules, applied per entry in order:
//! 1. exact path in the ignore set: dropped entirely
//! 2. path under a common location prefix: classified as a shared change
//! 3. otherwise: module/file relevant
//!
//! Ignore takes precedence over common, common over relevant. Both output
//! lists are sorted lexicographically by path so downstream reports and
//! digests are stable regardless of manifest order.

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use condelta_path::{normalize_rel_path, segments, under_any_prefix};
use condelta_types::FileDescriptor;

/// Diff entries split into module/file-relevant and shared changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub relevant: Vec<FileDescriptor>,
    pub common: Vec<FileDescriptor>,
}

/// Classify `diffs` against an ignore set and common-location prefixes.
#[must_use]
pub fn classify(
    diffs: &[FileDescriptor],
    ignored_paths: &BTreeSet<String>,
    common_locations: &BTreeSet<String>,
) -> Classified {
    let ignored: BTreeSet<String> = ignored_paths
        .iter()
        .map(|p| normalize_rel_path(p))
        .collect();

    let mut out = Classified::default();
    for entry in diffs {
        let path = normalize_rel_path(&entry.path);
        if ignored.contains(&path) {
            continue;
        }
        if under_any_prefix(&path, common_locations.iter().map(String::as_str)) {
            out.common.push(entry.clone());
        } else {
            out.relevant.push(entry.clone());
        }
    }

    sort_by_path(&mut out.relevant);
    sort_by_path(&mut out.common);
    out
}

/// Relevant diff entries grouped by suite module, with files outside any
/// module directory kept as individual loose files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleBreakdown {
    pub by_module: BTreeMap<String, Vec<FileDescriptor>>,
    pub loose_files: Vec<FileDescriptor>,
}

/// Group entries by the `<testcases_root><module>/...` convention.
///
/// `testcases_root` is a prefix such as `"android-cts/testcases/"`. The
/// segment after the root names the module; a file directly at the root (no
/// module directory) is loose, as is everything outside the root.
#[must_use]
pub fn group_by_root(entries: &[FileDescriptor], testcases_root: &str) -> ModuleBreakdown {
    let root = ensure_trailing_slash(&normalize_rel_path(testcases_root));
    let mut out = ModuleBreakdown::default();

    for entry in entries {
        let path = normalize_rel_path(&entry.path);
        match path.strip_prefix(&root) {
            Some(rest) if rest.contains('/') => {
                let module = rest.split('/').next().unwrap_or(rest).to_string();
                out.by_module.entry(module).or_default().push(entry.clone());
            }
            _ => out.loose_files.push(entry.clone()),
        }
    }

    for files in out.by_module.values_mut() {
        sort_by_path(files);
    }
    sort_by_path(&mut out.loose_files);
    out
}

/// Module name for a path under any `.../testcases/<module>/...` directory,
/// used by the sandbox work-dir analysis where several extracted entries share
/// one combined root.
#[must_use]
pub fn module_for_testcases_path(path: &str) -> Option<String> {
    let normalized = normalize_rel_path(path);
    let segs = segments(&normalized);
    let idx = segs.iter().position(|seg| *seg == "testcases")?;
    // Need a module directory and at least one file inside it.
    if segs.len() < idx + 3 {
        return None;
    }
    Some(segs[idx + 1].to_string())
}

/// Lexicographic sort by path; the mandatory ordering before any digest or
/// report is produced.
pub fn sort_by_path(files: &mut [FileDescriptor]) {
    files.sort_by(|a, b| a.path.cmp(&b.path));
}

fn ensure_trailing_slash(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}
