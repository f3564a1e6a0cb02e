//! Single-responsibility path normalization and prefix matching for
//! manifest-relative paths.

#![forbid(unsafe_code)]

/// Normalize a manifest-relative path for matching:
/// - converts `\` to `/`
/// - strips leading `/` and `./` (repeated)
///
/// # Examples
///
/// ```
/// use condelta_path::normalize_rel_path;
///
/// assert_eq!(normalize_rel_path("./host/testcases/x"), "host/testcases/x");
/// assert_eq!(normalize_rel_path(r"host\testcases\x"), "host/testcases/x");
/// assert_eq!(normalize_rel_path("/tools/bin"), "tools/bin");
/// ```
#[must_use]
pub fn normalize_rel_path(path: &str) -> String {
    let p = if path.contains('\\') {
        path.replace('\\', "/")
    } else {
        path.to_string()
    };
    let mut rest = p.as_str();
    loop {
        let trimmed = rest.trim_start_matches('/');
        match trimmed.strip_prefix("./") {
            Some(tail) => rest = tail,
            None => {
                rest = trimmed;
                break;
            }
        }
    }
    rest.to_string()
}

/// Return `true` when `path` lies under `prefix`.
///
/// A prefix ending in `/` matches literally; otherwise the match must end on
/// a segment boundary, so `"tools"` matches `"tools/tradefed"` but not
/// `"toolsmith/x"`. Both sides are compared after normalization.
///
/// # Examples
///
/// ```
/// use condelta_path::under_prefix;
///
/// assert!(under_prefix("tools/tradefed.jar", "tools/"));
/// assert!(under_prefix("tools/tradefed.jar", "tools"));
/// assert!(under_prefix("tools", "tools"));
/// assert!(!under_prefix("toolsmith/x", "tools"));
/// ```
#[must_use]
pub fn under_prefix(path: &str, prefix: &str) -> bool {
    let path = normalize_rel_path(path);
    let prefix = normalize_rel_path(prefix);
    if prefix.is_empty() {
        return false;
    }
    if let Some(stripped) = prefix.strip_suffix('/') {
        return path.strip_prefix(stripped).is_some_and(|rest| rest.starts_with('/'));
    }
    match path.strip_prefix(&prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Return `true` when `path` lies under any of `prefixes`.
#[must_use]
pub fn under_any_prefix<'a, I>(path: &str, prefixes: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    prefixes.into_iter().any(|prefix| under_prefix(path, prefix))
}

/// Non-empty segments of a normalized path.
#[must_use]
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|seg| !seg.is_empty() && *seg != ".").collect()
}

/// The final segment of a path, or the whole path when it has no directory.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// The file name with a single trailing extension removed.
///
/// # Examples
///
/// ```
/// use condelta_path::file_stem;
///
/// assert_eq!(file_stem("CtsExample.config"), "CtsExample");
/// assert_eq!(file_stem("archive.tar.gz"), "archive.tar");
/// assert_eq!(file_stem("README"), "README");
/// ```
#[must_use]
pub fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => name,
    }
}
