//! Root-file resolution: expanding `files` and `include` into absolute paths.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;
use strata_common::path::{
    file_extension_is_one_of, get_directory_path, get_normalized_absolute_path, normalize_slashes,
};

/// Source extensions picked up by `include` directory scans.
pub const SOURCE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".mts", ".cts"];

/// Directories never descended into by `include` scans.
const EXCLUDED_DIRECTORIES: &[&str] = &["node_modules", ".git"];

/// Resolves the project's root files to absolute, normalized paths.
///
/// Explicit `files` come first in their written order; files found by
/// scanning `include` directories follow in sorted order. Output directories
/// are skipped so that emitted declaration files are never picked up as
/// inputs. Explicit files are not checked for existence here; the program
/// reports missing roots as diagnostics.
pub fn resolve_root_files(config: &ProjectConfig) -> Result<Vec<String>, ConfigError> {
    let options = &config.compiler_options;
    let base = options
        .config_file_path
        .as_deref()
        .map(get_directory_path)
        .ok_or_else(|| ConfigError::MissingField("config_file_path".to_string()))?;

    let mut roots: Vec<String> = config
        .project
        .files
        .iter()
        .map(|file| get_normalized_absolute_path(file, &base))
        .collect();

    let skipped: Vec<&str> = [&options.out_dir, &options.declaration_dir]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();
    let mut scanned = Vec::new();
    for dir in &config.project.include {
        let dir = get_normalized_absolute_path(dir, &base);
        scan_directory(Path::new(&dir), &skipped, &mut scanned)?;
    }
    scanned.sort();
    for file in scanned {
        if !roots.contains(&file) {
            roots.push(file);
        }
    }
    Ok(roots)
}

fn scan_directory(dir: &Path, skipped: &[&str], out: &mut Vec<String>) -> Result<(), ConfigError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = normalize_slashes(&path.to_string_lossy());
        if entry.file_type()?.is_dir() {
            let excluded = EXCLUDED_DIRECTORIES
                .iter()
                .any(|excluded| entry.file_name() == **excluded);
            if !excluded && !skipped.contains(&name.as_str()) {
                scan_directory(&path, skipped, out)?;
            }
        } else if file_extension_is_one_of(&name, SOURCE_EXTENSIONS) {
            out.push(name);
        }
    }
    Ok(())
}
