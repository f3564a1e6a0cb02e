//! # condelta-model
//!
//! **Tier 2 (Aggregation)**
//!
//! Deterministic accumulation and shard merging of [`AnalysisResults`].
//!
//! `merge` is a pure reducer: counters sum, module-name sets union, and a
//! module declared modified by any one shard never survives in the merged
//! unchanged set. Digest maps union last-writer-wins; a given key is expected
//! to be written by exactly one shard, so a conflicting collision is recorded
//! as a data-integrity warning rather than silently resolved.

#![forbid(unsafe_code)]

use condelta_types::{AnalysisMethod, AnalysisResults};

/// Merge shard results with defined precedence.
///
/// A single result is returned unchanged apart from set-precedence
/// normalization; an empty input merges to the default (empty) results.
#[must_use]
pub fn merge(results: Vec<AnalysisResults>) -> AnalysisResults {
    let mut merged = results
        .into_iter()
        .reduce(|acc, next| merge_two(acc, &next))
        .unwrap_or_default();
    apply_set_precedence(&mut merged);
    merged
}

/// Field-by-field merge of two results. Set precedence is applied by the
/// caller once, after the fold, so intermediate states stay cheap.
#[must_use]
pub fn merge_two(mut acc: AnalysisResults, next: &AnalysisResults) -> AnalysisResults {
    acc.unchanged_files += next.unchanged_files;
    acc.modified_files += next.modified_files;
    acc.shared_folder_changes += next.shared_folder_changes;
    acc.build_key_changes += next.build_key_changes;
    acc.device_image_changes += next.device_image_changes;

    acc.modified_modules
        .extend(next.modified_modules.iter().cloned());
    acc.unchanged_modules
        .extend(next.unchanged_modules.iter().cloned());

    for (name, digest) in &next.module_digests {
        if let Some(existing) = acc.module_digests.get(name)
            && existing != digest
        {
            acc.warnings.push(format!(
                "digest collision for {name:?}: {} replaced by {}",
                existing.hash, digest.hash
            ));
        }
        acc.module_digests.insert(name.clone(), digest.clone());
    }

    acc.warnings.extend(next.warnings.iter().cloned());
    acc
}

/// A module modified anywhere must not be reported unchanged.
fn apply_set_precedence(results: &mut AnalysisResults) {
    if results.modified_modules.is_empty() {
        return;
    }
    results.unchanged_modules = results
        .unchanged_modules
        .difference(&results.modified_modules)
        .cloned()
        .collect();
}

/// Conservative "changed" verdict for a context that could not be analyzed.
///
/// The affected counter matches the analysis method so downstream consumers
/// see the failure in the dimension they act on; the reason lands in
/// `warnings` with the entry and method attached.
#[must_use]
pub fn changed_verdict(entry: &str, method: AnalysisMethod, reason: &str) -> AnalysisResults {
    let mut results = AnalysisResults::default();
    match method {
        AnalysisMethod::BuildKey => results.build_key_changes = 1,
        AnalysisMethod::DeviceImage => results.device_image_changes = 1,
        AnalysisMethod::File | AnalysisMethod::ModuleXts | AnalysisMethod::SandboxWorkdir => {
            results.modified_files = 1;
        }
    }
    results
        .warnings
        .push(format!("{entry} [{method}]: treated as changed: {reason}"));
    results
}
