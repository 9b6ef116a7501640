//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{CompilerOptions, ProjectConfig};
use std::path::Path;
use strata_common::path::{get_directory_path, get_normalized_absolute_path, normalize_slashes};

/// The configuration file name looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Loads and validates a configuration file.
///
/// `config_path` is either a `strata.toml` file or a directory containing
/// one. Relative paths are resolved against the process working directory.
pub fn load_config(config_path: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = if config_path.is_dir() {
        config_path.join(CONFIG_FILE_NAME)
    } else {
        config_path.to_path_buf()
    };
    let content = std::fs::read_to_string(&config_path)?;
    let current_directory = normalize_slashes(&std::env::current_dir()?.to_string_lossy());
    let config_file = get_normalized_absolute_path(
        &normalize_slashes(&config_path.to_string_lossy()),
        &current_directory,
    );
    load_config_from_str(&content, &config_file)
}

/// Parses and validates configuration text read from `config_file`.
///
/// `config_file` must be absolute; path-valued options are resolved against
/// its directory. Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str, config_file: &str) -> Result<ProjectConfig, ConfigError> {
    let mut config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    resolve_option_paths(&mut config.compiler_options, config_file);
    Ok(config)
}

/// Validates that required fields are present.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.files.is_empty() && config.project.include.is_empty() {
        return Err(ConfigError::MissingField(
            "project.files or project.include".to_string(),
        ));
    }
    Ok(())
}

/// Makes every path-valued option absolute relative to the configuration file.
fn resolve_option_paths(options: &mut CompilerOptions, config_file: &str) {
    let base = get_directory_path(config_file);
    for path in [
        &mut options.out_dir,
        &mut options.declaration_dir,
        &mut options.root_dir,
        &mut options.ts_build_info_file,
    ]
    .into_iter()
    .flatten()
    {
        *path = get_normalized_absolute_path(path, &base);
    }
    options.config_file_path = Some(config_file.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModuleKind;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "demo"
include = "src"
"#;
        let config = load_config_from_str(toml, "/p/strata.toml").unwrap();
        assert_eq!(config.project.name, "demo");
        assert_eq!(config.project.include, vec!["src"]);
        assert!(config.project.files.is_empty());
        assert_eq!(config.compiler_options, CompilerOptions {
            config_file_path: Some("/p/strata.toml".to_string()),
            ..CompilerOptions::default()
        });
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "demo"
files = ["src/a.ts", "src/b.ts"]

[compiler_options]
module = "commonjs"
declaration = true
declaration_map = true
incremental = true
out_dir = "dist"
ts_build_info_file = "./cache/demo.tsbuildinfo"
"#;
        let config = load_config_from_str(toml, "/p/strata.toml").unwrap();
        let options = &config.compiler_options;
        assert_eq!(config.project.files.len(), 2);
        assert_eq!(options.module, Some(ModuleKind::CommonJs));
        assert!(options.declaration && options.declaration_map && options.incremental);
        assert_eq!(options.out_dir.as_deref(), Some("/p/dist"));
        assert_eq!(
            options.ts_build_info_file.as_deref(),
            Some("/p/cache/demo.tsbuildinfo")
        );
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
name = ""
files = ["a.ts"]
"#;
        let err = load_config_from_str(toml, "/p/strata.toml").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn missing_roots_errors() {
        let toml = r#"
[project]
name = "demo"
"#;
        let err = load_config_from_str(toml, "/p/strata.toml").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}", "/p/strata.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn unknown_module_errors() {
        let toml = r#"
[project]
name = "demo"
files = ["a.ts"]

[compiler_options]
module = "amd"
"#;
        let err = load_config_from_str(toml, "/p/strata.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[project]\nname = \"demo\"\nfiles = [\"a.ts\"]\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        let config_file = config.compiler_options.config_file_path.unwrap();
        assert!(config_file.ends_with("/strata.toml"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
