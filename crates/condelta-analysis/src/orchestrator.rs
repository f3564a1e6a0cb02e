//! Per-method analysis dispatch.
//!
//! Each context moves through `PENDING → (ABORTED | ANALYZED | FAILED)`.
//! Aborted and failed contexts degrade to conservative "changed" verdicts:
//! under-reporting change risks a stale cache hit that silently skips tests,
//! which is strictly worse than an unnecessary re-run. Only two conditions
//! escape that policy: an invalid context under strict mode (surfaced as an
//! error), and a sandbox entry with no common-directory mapping (the whole
//! request becomes `Unavailable`).

use std::collections::BTreeSet;

use condelta_catalog::{ArtifactCatalog, CatalogLimits};
use condelta_classify::{classify, group_by_root, module_for_testcases_path, sort_by_path};
use condelta_diff::diff;
use condelta_merkle::{PathFilter, build_digest};
use condelta_metrics::{MetricsSink, counters};
use condelta_model::{changed_verdict, merge, merge_two};
use condelta_modules::list_modules;
use condelta_path::{file_name, normalize_rel_path, under_any_prefix};
use condelta_types::{
    AnalysisContext, AnalysisMethod, AnalysisOutcome, AnalysisResults, FileDescriptor,
};
use tracing::{debug, warn};

use crate::config::AnalysisOptions;
use crate::error::AnalysisError;
use crate::walk::walk_reference_tree;

/// File names rewritten on every device-image build.
const VOLATILE_IMAGE_NAMES: [&str; 2] = ["build.prop", "prop.default"];
/// Subtrees regenerated wholesale on every device-image build.
const VOLATILE_IMAGE_PREFIXES: [&str; 4] = ["IMAGES/", "META/", "PREBUILT_IMAGES/", "RADIO/"];

/// Analyze every context and aggregate the shard results.
///
/// Returns `Ok(Unavailable)` when no determination can be made for the
/// request as a whole (no contexts, or a sandbox entry unknown to the
/// common-directory table); the caller must then treat everything as changed.
/// Per-context failures never surface as errors outside strict mode.
pub fn evaluate(
    contexts: &[AnalysisContext],
    opts: &AnalysisOptions,
    metrics: &dyn MetricsSink,
) -> Result<AnalysisOutcome, AnalysisError> {
    if contexts.is_empty() {
        return Ok(AnalysisOutcome::Unavailable);
    }

    let mut shards: Vec<AnalysisResults> = Vec::new();
    let mut sandbox: Vec<&AnalysisContext> = Vec::new();

    for ctx in contexts {
        if let Some(short_circuit) = precheck(ctx, opts, metrics)? {
            shards.push(short_circuit);
        } else if ctx.method == AnalysisMethod::SandboxWorkdir {
            sandbox.push(ctx);
        } else {
            shards.push(analyze_context(ctx, opts.limits, metrics));
        }
    }

    if !sandbox.is_empty() {
        match analyze_sandbox(&sandbox, opts, metrics) {
            Ok(results) => shards.push(results),
            Err(err @ AnalysisError::UnknownCommonDirectory { .. }) => {
                warn!(error = %err, "sandbox work-dir analysis unavailable");
                metrics.incr(counters::ANALYSIS_FAILURES, 1);
                return Ok(AnalysisOutcome::Unavailable);
            }
            Err(err) => {
                warn!(error = %err, "sandbox work-dir analysis degraded to changed");
                metrics.incr(counters::ANALYSIS_FAILURES, 1);
                shards.push(changed_verdict(
                    "sandbox-workdir",
                    AnalysisMethod::SandboxWorkdir,
                    &err.to_string(),
                ));
            }
        }
    }

    let merged = merge(shards);
    emit_counters(&merged, metrics);
    Ok(AnalysisOutcome::Verdict(merged))
}

/// Abort and validity short-circuits, applied before any manifest I/O.
fn precheck(
    ctx: &AnalysisContext,
    opts: &AnalysisOptions,
    metrics: &dyn MetricsSink,
) -> Result<Option<AnalysisResults>, AnalysisError> {
    if let Some(reason) = &ctx.abort_reason {
        warn!(entry = %ctx.content_entry, method = %ctx.method, reason = %reason, "context aborted");
        metrics.incr(counters::ABORTED_CONTEXTS, 1);
        return Ok(Some(changed_verdict(
            &ctx.content_entry,
            ctx.method,
            &format!("aborted: {reason}"),
        )));
    }
    if !ctx.is_valid() {
        if opts.strict {
            return Err(AnalysisError::InvalidContext {
                entry: ctx.content_entry.clone(),
            });
        }
        warn!(entry = %ctx.content_entry, method = %ctx.method, "context missing manifest location");
        metrics.incr(counters::ANALYSIS_FAILURES, 1);
        return Ok(Some(changed_verdict(
            &ctx.content_entry,
            ctx.method,
            "missing base or current manifest",
        )));
    }
    Ok(None)
}

/// Run one non-sandbox context, converting any failure into a conservative
/// "changed" verdict.
fn analyze_context(
    ctx: &AnalysisContext,
    limits: CatalogLimits,
    metrics: &dyn MetricsSink,
) -> AnalysisResults {
    let analyzed = match ctx.method {
        AnalysisMethod::File => analyze_file(ctx, limits),
        AnalysisMethod::ModuleXts => analyze_module_xts(ctx, limits),
        AnalysisMethod::BuildKey => analyze_build_key(ctx, limits),
        AnalysisMethod::DeviceImage => analyze_device_image(ctx, limits),
        // Sandbox contexts are analyzed jointly by evaluate; one arriving
        // here is a routing bug, so fail it closed.
        AnalysisMethod::SandboxWorkdir => Err(AnalysisError::UnknownCommonDirectory {
            entry: ctx.content_entry.clone(),
        }),
    };
    match analyzed {
        Ok(results) => {
            debug!(entry = %ctx.content_entry, method = %ctx.method, "context analyzed");
            results
        }
        Err(err) => {
            warn!(entry = %ctx.content_entry, method = %ctx.method, error = %err, "analysis failed closed");
            metrics.incr(counters::ANALYSIS_FAILURES, 1);
            changed_verdict(&ctx.content_entry, ctx.method, &err.to_string())
        }
    }
}

fn parse_catalogs(
    ctx: &AnalysisContext,
    limits: CatalogLimits,
) -> Result<(ArtifactCatalog, ArtifactCatalog), AnalysisError> {
    let entry = &ctx.content_entry;
    let wrap = |source| AnalysisError::Catalog {
        entry: entry.clone(),
        source,
    };
    // precheck guarantees both locations are present.
    let (Some(base_path), Some(current_path)) = (&ctx.base_manifest, &ctx.current_manifest) else {
        return Err(AnalysisError::InvalidContext {
            entry: entry.clone(),
        });
    };
    let base = ArtifactCatalog::parse_with_limits(base_path, entry, limits).map_err(wrap)?;
    let current = ArtifactCatalog::parse_with_limits(current_path, entry, limits).map_err(wrap)?;
    Ok((base, current))
}

fn normalized_ignored(ctx: &AnalysisContext) -> BTreeSet<String> {
    ctx.ignored_paths
        .iter()
        .map(|p| normalize_rel_path(p))
        .collect()
}

/// Record the current catalog's root digest under the entry name when the
/// context asked for one.
fn maybe_digest(
    ctx: &AnalysisContext,
    current: &ArtifactCatalog,
    filter: &PathFilter,
    results: &mut AnalysisResults,
) {
    if !ctx.wants_digest {
        return;
    }
    match build_digest(current, filter) {
        Some(digest) => {
            results
                .module_digests
                .insert(ctx.content_entry.clone(), digest);
        }
        None => results.warnings.push(format!(
            "{}: digest unavailable (empty filtered catalog)",
            ctx.content_entry
        )),
    }
}

fn digest_filter(ctx: &AnalysisContext) -> PathFilter {
    PathFilter::Excluding {
        ignored_paths: normalized_ignored(ctx),
        excluded_prefixes: Vec::new(),
        excluded_names: Vec::new(),
    }
}

/// FILE: mark every file of the reference tree unchanged or modified by
/// membership in the diff set. Diff entries absent from the tree are not part
/// of what will actually be used and are ignored.
fn analyze_file(
    ctx: &AnalysisContext,
    limits: CatalogLimits,
) -> Result<AnalysisResults, AnalysisError> {
    let (base, current) = parse_catalogs(ctx, limits)?;
    let reference = ctx
        .reference_dir
        .as_deref()
        .ok_or_else(|| AnalysisError::MissingReferenceDir {
            entry: ctx.content_entry.clone(),
        })?;

    let diffs = diff(&base, &current);
    let classified = classify(&diffs, &ctx.ignored_paths, &BTreeSet::new());
    let changed_paths: BTreeSet<String> =
        classified.relevant.into_iter().map(|f| f.path).collect();

    let mut results = AnalysisResults::default();
    for rel in walk_reference_tree(reference)? {
        if changed_paths.contains(&rel) {
            results.modified_files += 1;
        } else {
            results.unchanged_files += 1;
        }
    }
    maybe_digest(ctx, &current, &digest_filter(ctx), &mut results);
    Ok(results)
}

/// MODULE_XTS: per-suite-module compare rooted at `<entry>/testcases/`, with
/// the bundle's `tools/` area treated as common.
fn analyze_module_xts(
    ctx: &AnalysisContext,
    limits: CatalogLimits,
) -> Result<AnalysisResults, AnalysisError> {
    let (base, current) = parse_catalogs(ctx, limits)?;
    let root = ctx
        .content_entry
        .strip_suffix(".zip")
        .unwrap_or(&ctx.content_entry);
    let testcases_root = format!("{root}/testcases/");

    let mut common = ctx.common_locations.clone();
    common.insert(format!("{root}/tools/"));

    let diffs = diff(&base, &current);
    let classified = classify(&diffs, &ctx.ignored_paths, &common);

    let mut results = AnalysisResults::default();
    results.shared_folder_changes = classified.common.len() as u64;

    let changed = group_by_root(&classified.relevant, &testcases_root);
    results.modified_modules = changed.by_module.keys().cloned().collect();
    let changed_loose: BTreeSet<String> =
        changed.loose_files.iter().map(|f| f.path.clone()).collect();
    results.modified_files = changed_loose.len() as u64;

    // Modules present in the current build with no relevant diff are
    // unchanged; likewise loose files outside ignored/common areas.
    let ignored = normalized_ignored(ctx);
    let present = group_by_root(current.files(), &testcases_root);
    results.unchanged_modules = present
        .by_module
        .keys()
        .filter(|module| !results.modified_modules.contains(*module))
        .cloned()
        .collect();
    for file in &present.loose_files {
        let path = normalize_rel_path(&file.path);
        if ignored.contains(&path)
            || under_any_prefix(&path, common.iter().map(String::as_str))
            || changed_loose.contains(&path)
        {
            continue;
        }
        results.unchanged_files += 1;
    }

    maybe_digest(ctx, &current, &digest_filter(ctx), &mut results);
    Ok(results)
}

/// BUILD_KEY: any relevant diff after ignore filtering is one change event.
fn analyze_build_key(
    ctx: &AnalysisContext,
    limits: CatalogLimits,
) -> Result<AnalysisResults, AnalysisError> {
    let (base, current) = parse_catalogs(ctx, limits)?;
    let diffs = diff(&base, &current);
    let classified = classify(&diffs, &ctx.ignored_paths, &BTreeSet::new());

    let mut results = AnalysisResults::default();
    if !classified.relevant.is_empty() {
        results.build_key_changes = 1;
    }
    maybe_digest(ctx, &current, &digest_filter(ctx), &mut results);
    Ok(results)
}

/// DEVICE_IMAGE: strip known-volatile image paths before counting.
fn analyze_device_image(
    ctx: &AnalysisContext,
    limits: CatalogLimits,
) -> Result<AnalysisResults, AnalysisError> {
    let (base, current) = parse_catalogs(ctx, limits)?;
    let diffs = diff(&base, &current);
    let classified = classify(&diffs, &ctx.ignored_paths, &BTreeSet::new());

    let remaining: Vec<FileDescriptor> = classified
        .relevant
        .into_iter()
        .filter(|f| !VOLATILE_IMAGE_NAMES.contains(&file_name(&f.path)))
        .filter(|f| !under_any_prefix(&f.path, VOLATILE_IMAGE_PREFIXES))
        .collect();

    let mut results = AnalysisResults::default();
    results.device_image_changes = remaining.len() as u64;

    let filter = PathFilter::Excluding {
        ignored_paths: normalized_ignored(ctx),
        excluded_prefixes: VOLATILE_IMAGE_PREFIXES.map(String::from).to_vec(),
        excluded_names: VOLATILE_IMAGE_NAMES.map(String::from).to_vec(),
    };
    maybe_digest(ctx, &current, &filter, &mut results);
    Ok(results)
}

/// SANDBOX_WORKDIR: diff every supplied context, union the relevant diffs,
/// and classify modules across the combined testcases roots. An entry with no
/// common-directory mapping fails the whole analysis before any partial work.
fn analyze_sandbox(
    contexts: &[&AnalysisContext],
    opts: &AnalysisOptions,
    metrics: &dyn MetricsSink,
) -> Result<AnalysisResults, AnalysisError> {
    for ctx in contexts {
        if opts.sandbox_common_dirs.get(&ctx.content_entry).is_none() {
            return Err(AnalysisError::UnknownCommonDirectory {
                entry: ctx.content_entry.clone(),
            });
        }
    }

    let mut results = AnalysisResults::default();
    let mut union_relevant: Vec<FileDescriptor> = Vec::new();
    let mut present_modules: BTreeSet<String> = BTreeSet::new();

    for ctx in contexts {
        let known = opts
            .sandbox_common_dirs
            .get(&ctx.content_entry)
            .unwrap_or(&[]);
        match parse_catalogs(ctx, opts.limits) {
            Ok((base, current)) => {
                let mut common = ctx.common_locations.clone();
                common.extend(known.iter().cloned());

                let diffs = diff(&base, &current);
                let classified = classify(&diffs, &ctx.ignored_paths, &common);
                results.shared_folder_changes += classified.common.len() as u64;
                union_relevant.extend(classified.relevant);

                present_modules.extend(list_modules(&current));
                for file in current.files() {
                    if let Some(module) = module_for_testcases_path(&file.path) {
                        present_modules.insert(module);
                    }
                }
                maybe_digest(ctx, &current, &digest_filter(ctx), &mut results);
            }
            Err(err) => {
                warn!(entry = %ctx.content_entry, error = %err, "sandbox entry failed closed");
                metrics.incr(counters::ANALYSIS_FAILURES, 1);
                results = merge_two(
                    results,
                    &changed_verdict(
                        &ctx.content_entry,
                        AnalysisMethod::SandboxWorkdir,
                        &err.to_string(),
                    ),
                );
            }
        }
    }

    sort_by_path(&mut union_relevant);
    for file in &union_relevant {
        match module_for_testcases_path(&file.path) {
            Some(module) => {
                results.modified_modules.insert(module);
            }
            None => results.modified_files += 1,
        }
    }
    results.unchanged_modules = present_modules
        .difference(&results.modified_modules)
        .cloned()
        .collect();
    Ok(results)
}

/// Telemetry only; never a correctness dependency.
fn emit_counters(results: &AnalysisResults, metrics: &dyn MetricsSink) {
    metrics.incr(counters::UNCHANGED_FILES, results.unchanged_files);
    metrics.incr(counters::MODIFIED_FILES, results.modified_files);
    metrics.incr(counters::COMMON_DIR_DIFFS, results.shared_folder_changes);
    metrics.incr(counters::BUILD_KEY_CHANGES, results.build_key_changes);
    metrics.incr(counters::DEVICE_IMAGE_CHANGES, results.device_image_changes);
}
