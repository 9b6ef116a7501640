//! Canonical file paths and forward-slash path arithmetic.
//!
//! All paths handled by the compiler use `/` separators regardless of host
//! platform. A [`FilePath`] is the canonical identity of a source file:
//! absolute, normalized, and lower-cased when the host file system is
//! case-insensitive.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declaration-file extensions recognized by [`is_declaration_file_name`].
const DECLARATION_EXTENSIONS: &[&str] = &[".d.ts", ".d.mts", ".d.cts"];

/// Extensions stripped by [`remove_file_extension`], longest first.
const KNOWN_EXTENSIONS: &[&str] = &[
    ".d.ts", ".d.mts", ".d.cts", ".tsx", ".mts", ".cts", ".ts", ".jsx", ".mjs", ".cjs", ".js",
    ".json",
];

/// The canonical identity of a source file.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilePath(String);

impl FilePath {
    /// Wraps a string that is already canonical.
    ///
    /// Use [`to_path`] to canonicalize arbitrary file names.
    pub fn from_canonical(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the directory containing this file.
    pub fn directory(&self) -> String {
        get_directory_path(&self.0)
    }

    /// Returns `true` if this path names a declaration file.
    pub fn is_declaration_file(&self) -> bool {
        is_declaration_file_name(&self.0)
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FilePath({:?})", self.0)
    }
}

impl AsRef<str> for FilePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Converts `file_name` into a canonical [`FilePath`], resolving it against
/// `base_directory` when relative.
pub fn to_path(file_name: &str, base_directory: &str, use_case_sensitive_file_names: bool) -> FilePath {
    let absolute = get_normalized_absolute_path(file_name, base_directory);
    if use_case_sensitive_file_names {
        FilePath(absolute)
    } else {
        FilePath(absolute.to_lowercase())
    }
}

/// Replaces every backslash with a forward slash.
pub fn normalize_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Returns the length of the root of `path` (`/`, `c:/`, `c:`), or 0 if relative.
fn root_length(path: &str) -> usize {
    let bytes = path.as_bytes();
    if bytes.first() == Some(&b'/') {
        return 1;
    }
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        if bytes.get(2) == Some(&b'/') {
            return 3;
        }
        return 2;
    }
    0
}

/// Returns `true` if `path` starts with a root.
pub fn is_rooted(path: &str) -> bool {
    root_length(&normalize_slashes(path)) > 0
}

/// Returns `true` if `path` is `.`/`..` or starts with `./` or `../`.
pub fn path_is_relative(path: &str) -> bool {
    let path = normalize_slashes(path);
    path == "." || path == ".." || path.starts_with("./") || path.starts_with("../")
}

/// Joins `relative` onto `base` unless `relative` is already rooted.
pub fn combine_paths(base: &str, relative: &str) -> String {
    let relative = normalize_slashes(relative);
    if base.is_empty() || is_rooted(&relative) {
        return relative;
    }
    let mut out = normalize_slashes(base);
    if !out.ends_with('/') {
        out.push('/');
    }
    out.push_str(&relative);
    out
}

/// Splits a path into its root and its non-empty, `.`/`..`-reduced components.
fn reduced_components(path: &str) -> (String, Vec<String>) {
    let path = normalize_slashes(path);
    let (root, rest) = path.split_at(root_length(&path));
    let mut parts: Vec<String> = Vec::new();
    for part in rest.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| p != "..") {
                    parts.pop();
                } else if root.is_empty() {
                    parts.push("..".to_string());
                }
            }
            _ => parts.push(part.to_string()),
        }
    }
    (root.to_string(), parts)
}

/// Normalizes separators and resolves `.` and `..` components.
pub fn normalize_path(path: &str) -> String {
    let (root, parts) = reduced_components(path);
    let mut out = root;
    out.push_str(&parts.join("/"));
    out
}

/// Resolves `file_name` against `current_directory` and normalizes the result.
pub fn get_normalized_absolute_path(file_name: &str, current_directory: &str) -> String {
    normalize_path(&combine_paths(current_directory, file_name))
}

/// Returns the directory portion of `path` (everything before the last separator).
pub fn get_directory_path(path: &str) -> String {
    let path = normalize_slashes(path);
    let root_len = root_length(&path);
    match path[root_len..].rfind('/') {
        Some(idx) => path[..root_len + idx].to_string(),
        None => path[..root_len].to_string(),
    }
}

/// Returns the final component of `path`.
pub fn get_base_file_name(path: &str) -> String {
    let path = normalize_slashes(path);
    path.rsplit('/').next().unwrap_or_default().to_string()
}

/// Computes the relative path from `from_directory` to `to`.
///
/// Paths with different roots cannot be related; the normalized `to` is
/// returned unchanged in that case.
pub fn get_relative_path_from_directory(
    from_directory: &str,
    to: &str,
    use_case_sensitive_file_names: bool,
) -> String {
    let equal = |a: &str, b: &str| {
        if use_case_sensitive_file_names {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    };
    let (from_root, from_parts) = reduced_components(from_directory);
    let (to_root, to_parts) = reduced_components(to);
    if !equal(&from_root, &to_root) {
        return normalize_path(to);
    }
    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| equal(a, b))
        .count();
    let mut parts: Vec<&str> = vec![".."; from_parts.len() - common];
    parts.extend(to_parts[common..].iter().map(String::as_str));
    parts.join("/")
}

/// Prefixes `./` onto a relative path that does not already start with `.`/`..`.
pub fn ensure_path_is_non_module_name(path: &str) -> String {
    if is_rooted(path) || path_is_relative(path) {
        path.to_string()
    } else {
        format!("./{path}")
    }
}

/// Returns `true` if `file_name` ends with any of `extensions`.
pub fn file_extension_is_one_of(file_name: &str, extensions: &[&str]) -> bool {
    extensions.iter().any(|ext| file_name.ends_with(ext))
}

/// Returns `true` for `.d.ts`, `.d.mts`, and `.d.cts` files.
pub fn is_declaration_file_name(file_name: &str) -> bool {
    file_extension_is_one_of(file_name, DECLARATION_EXTENSIONS)
}

/// Strips a known source or output extension from `path`.
pub fn remove_file_extension(path: &str) -> &str {
    KNOWN_EXTENSIONS
        .iter()
        .find_map(|ext| path.strip_suffix(ext))
        .unwrap_or(path)
}

/// Replaces the known extension of `path` with `new_extension`.
pub fn change_extension(path: &str, new_extension: &str) -> String {
    format!("{}{new_extension}", remove_file_extension(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(normalize_path("/a/./b/../c.ts"), "/a/c.ts");
        assert_eq!(normalize_path("a\\b\\c.ts"), "a/b/c.ts");
        assert_eq!(normalize_path("../x/./y"), "../x/y");
        assert_eq!(normalize_path("/../a"), "/a");
    }

    #[test]
    fn absolute_path_from_relative() {
        assert_eq!(
            get_normalized_absolute_path("./src/a.ts", "/project"),
            "/project/src/a.ts"
        );
        assert_eq!(get_normalized_absolute_path("/abs/a.ts", "/project"), "/abs/a.ts");
        assert_eq!(get_normalized_absolute_path("c:/x/a.ts", "/project"), "c:/x/a.ts");
    }

    #[test]
    fn directory_path() {
        assert_eq!(get_directory_path("/a/b.ts"), "/a");
        assert_eq!(get_directory_path("/b.ts"), "/");
        assert_eq!(get_directory_path("c:/b.ts"), "c:/");
        assert_eq!(get_directory_path("a/b"), "a");
    }

    #[test]
    fn relative_path_between_directories() {
        assert_eq!(
            get_relative_path_from_directory("/project/out", "/project/src/a.ts", true),
            "../src/a.ts"
        );
        assert_eq!(
            get_relative_path_from_directory("/project", "/project/a.ts", true),
            "a.ts"
        );
        assert_eq!(
            get_relative_path_from_directory("/Project", "/project/a.ts", false),
            "a.ts"
        );
        assert_eq!(
            get_relative_path_from_directory("c:/x", "/project/a.ts", true),
            "/project/a.ts"
        );
    }

    #[test]
    fn non_module_name_prefix() {
        assert_eq!(ensure_path_is_non_module_name("a.ts"), "./a.ts");
        assert_eq!(ensure_path_is_non_module_name("../a.ts"), "../a.ts");
        assert_eq!(ensure_path_is_non_module_name("/a.ts"), "/a.ts");
    }

    #[test]
    fn canonical_path_lowercases_when_case_insensitive() {
        let path = to_path("Src/A.ts", "/Project", false);
        assert_eq!(path.as_str(), "/project/src/a.ts");
        let path = to_path("Src/A.ts", "/Project", true);
        assert_eq!(path.as_str(), "/Project/Src/A.ts");
    }

    #[test]
    fn extensions() {
        assert!(is_declaration_file_name("/lib/lib.d.ts"));
        assert!(!is_declaration_file_name("/src/a.ts"));
        assert_eq!(remove_file_extension("/src/a.d.ts"), "/src/a");
        assert_eq!(change_extension("/src/a.ts", ".js"), "/src/a.js");
        assert_eq!(change_extension("/src/a.mts", ".d.mts"), "/src/a.d.mts");
        assert_eq!(get_base_file_name("/src/a.ts"), "a.ts");
    }
}
