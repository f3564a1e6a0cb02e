//! Suite-module name extraction from catalog path conventions.
//!
//! A module is a directory under `host/testcases/` or `target/testcases/`.
//! Additionally, a module configuration whose base name differs from its
//! directory (`<root>/testcases/<module>/<other>.config`) names an alternate
//! module: the configuration points at a differently-named binary, and that
//! name is a module in its own right.

#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use condelta_catalog::ArtifactCatalog;
use condelta_path::{file_stem, normalize_rel_path, segments};

/// Logical module names present in `catalog`.
///
/// An empty set is a legitimate "no modules" answer; callers distinguish it
/// from "could not determine" because parse failures surface earlier, at
/// catalog construction.
#[must_use]
pub fn list_modules(catalog: &ArtifactCatalog) -> BTreeSet<String> {
    let mut modules = BTreeSet::new();
    for file in catalog.files() {
        collect_modules(&file.path, &mut modules);
    }
    modules
}

fn collect_modules(path: &str, modules: &mut BTreeSet<String>) {
    let normalized = normalize_rel_path(path);
    let segs = segments(&normalized);
    if segs.len() < 4 || segs[1] != "testcases" {
        return;
    }

    if segs[0] == "host" || segs[0] == "target" {
        modules.insert(segs[2].to_string());
    }

    // <root>/testcases/<module>/<other>.config names an alternate module.
    if segs.len() == 4 && segs[3].ends_with(".config") {
        let stem = file_stem(segs[3]);
        if stem != segs[2] {
            modules.insert(stem.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use condelta_types::FileDescriptor;

    fn catalog(paths: &[&str]) -> ArtifactCatalog {
        ArtifactCatalog::from_files(
            "e",
            paths.iter().map(|p| FileDescriptor::new(*p, "h", 1)),
        )
    }

    #[test]
    fn host_and_target_testcases_name_modules() {
        let cat = catalog(&[
            "host/testcases/HostMod/HostMod.config",
            "target/testcases/TargetMod/TargetMod.apk",
            "target/testcases/TargetMod/lib/inner.so",
        ]);
        let modules = list_modules(&cat);
        assert_eq!(
            modules.into_iter().collect::<Vec<_>>(),
            vec!["HostMod".to_string(), "TargetMod".to_string()]
        );
    }

    #[test]
    fn other_roots_are_not_modules() {
        let cat = catalog(&["vendor/testcases/NotAMod/f.apk", "tools/x/y/z"]);
        assert!(list_modules(&cat).is_empty());
    }

    #[test]
    fn alternate_config_names_extra_module() {
        let cat = catalog(&["host/testcases/Primary/AltBinary.config"]);
        let modules = list_modules(&cat);
        assert!(modules.contains("Primary"));
        assert!(modules.contains("AltBinary"));
        assert_eq!(modules.len(), 2);
    }

    #[test]
    fn matching_config_name_adds_nothing_extra() {
        let cat = catalog(&["host/testcases/Primary/Primary.config"]);
        let modules = list_modules(&cat);
        assert_eq!(modules.into_iter().collect::<Vec<_>>(), vec!["Primary".to_string()]);
    }

    #[test]
    fn alternate_config_rule_applies_to_any_root() {
        // Not host/target, so the directory is not a module, but the
        // alternate config still names one.
        let cat = catalog(&["suites/testcases/Primary/AltBinary.config"]);
        let modules = list_modules(&cat);
        assert!(modules.contains("AltBinary"));
        assert!(!modules.contains("Primary"));
    }

    #[test]
    fn deep_config_paths_do_not_trigger_alternate_rule() {
        let cat = catalog(&["host/testcases/Primary/sub/AltBinary.config"]);
        let modules = list_modules(&cat);
        assert!(modules.contains("Primary"));
        assert!(!modules.contains("AltBinary"));
    }

    #[test]
    fn file_at_testcases_root_is_not_a_module() {
        let cat = catalog(&["host/testcases/stray.txt"]);
        assert!(list_modules(&cat).is_empty());
    }

    #[test]
    fn empty_catalog_lists_no_modules() {
        assert!(list_modules(&catalog(&[])).is_empty());
    }
}
