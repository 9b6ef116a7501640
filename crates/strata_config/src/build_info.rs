//! Build-info persistence of compiler options and the build-info file location.

use crate::error::ConfigError;
use crate::options::{OptionKind, OptionValue, OPTION_DECLARATIONS};
use crate::types::{CompilerOptions, ModuleKind, ScriptTarget};
use serde_json::{Map, Value};
use strata_common::path::{
    combine_paths, ensure_path_is_non_module_name, get_base_file_name, get_directory_path,
    get_normalized_absolute_path, get_relative_path_from_directory,
};

/// Extension of build-info files.
pub const BUILD_INFO_EXTENSION: &str = ".tsbuildinfo";

/// Encodes the persisted subset of `options` as a camelCase JSON object.
///
/// Unset and `false` options are omitted. Module kinds and targets persist as
/// their numeric codes; paths persist relative to `build_info_directory`.
pub fn options_to_build_info(
    options: &CompilerOptions,
    build_info_directory: &str,
    use_case_sensitive_file_names: bool,
) -> Map<String, Value> {
    let mut map = Map::new();
    for decl in OPTION_DECLARATIONS
        .iter()
        .filter(|decl| decl.affects.contains(crate::OptionAffects::BUILD_INFO))
    {
        let value = match (decl.get)(options) {
            OptionValue::Absent | OptionValue::Bool(false) => continue,
            OptionValue::Bool(true) => Value::Bool(true),
            OptionValue::Module(kind) => Value::from(kind.code()),
            OptionValue::Target(target) => Value::from(target.code()),
            OptionValue::Path(path) => Value::String(ensure_path_is_non_module_name(
                &get_relative_path_from_directory(
                    build_info_directory,
                    &path,
                    use_case_sensitive_file_names,
                ),
            )),
        };
        map.insert(decl.name.to_string(), value);
    }
    map
}

/// Decodes persisted options, resolving paths against `build_info_directory`.
///
/// Unknown option names are ignored so that build info written by a build
/// with extra options still loads. A known option with a value of the wrong
/// shape is an error.
pub fn options_from_build_info(
    map: &Map<String, Value>,
    build_info_directory: &str,
) -> Result<CompilerOptions, ConfigError> {
    let mut options = CompilerOptions::default();
    for (name, value) in map {
        let Some(decl) = OPTION_DECLARATIONS.iter().find(|decl| decl.name == name) else {
            continue;
        };
        let invalid =
            || ConfigError::ValidationError(format!("invalid value for option '{name}': {value}"));
        let value = match decl.kind {
            OptionKind::Bool => OptionValue::Bool(value.as_bool().ok_or_else(invalid)?),
            OptionKind::Module => OptionValue::Module(
                value
                    .as_u64()
                    .and_then(ModuleKind::from_code)
                    .ok_or_else(invalid)?,
            ),
            OptionKind::Target => OptionValue::Target(
                value
                    .as_u64()
                    .and_then(ScriptTarget::from_code)
                    .ok_or_else(invalid)?,
            ),
            OptionKind::Path => OptionValue::Path(get_normalized_absolute_path(
                value.as_str().ok_or_else(invalid)?,
                build_info_directory,
            )),
        };
        (decl.set)(&mut options, value);
    }
    Ok(options)
}

/// Returns the absolute path of the build-info file, or `None` when state
/// is not persisted.
///
/// An explicit `ts_build_info_file` wins. Otherwise the file is named after
/// the configuration file and placed under `out_dir` (mirroring the config
/// location relative to `root_dir` when set) or next to the configuration.
pub fn get_build_info_file_path(options: &CompilerOptions) -> Option<String> {
    if !options.is_incremental() {
        return None;
    }
    if let Some(explicit) = &options.ts_build_info_file {
        return Some(explicit.clone());
    }
    let config_file = options.config_file_path.as_deref()?;
    let extension_less = strip_config_extension(config_file);
    let base = match (&options.out_dir, &options.root_dir) {
        (Some(out_dir), Some(root_dir)) => get_normalized_absolute_path(
            &get_relative_path_from_directory(root_dir, extension_less, true),
            out_dir,
        ),
        (Some(out_dir), None) => combine_paths(out_dir, &get_base_file_name(extension_less)),
        (None, _) => extension_less.to_string(),
    };
    Some(format!("{base}{BUILD_INFO_EXTENSION}"))
}

/// Returns the directory a build-info file lives in.
pub fn get_build_info_directory(build_info_file: &str) -> String {
    get_directory_path(build_info_file)
}

fn strip_config_extension(config_file: &str) -> &str {
    let name_start = config_file.rfind('/').map_or(0, |idx| idx + 1);
    match config_file[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &config_file[..name_start + dot],
        _ => config_file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_only_set_persisted_options() {
        let options = CompilerOptions {
            declaration: true,
            module: Some(ModuleKind::EsNext),
            incremental: true,
            no_emit: true,
            ..CompilerOptions::default()
        };
        let map = options_to_build_info(&options, "/p", true);
        assert_eq!(
            Value::Object(map).to_string(),
            r#"{"declaration":true,"module":99}"#
        );
    }

    #[test]
    fn paths_are_relative_to_build_info() {
        let options = CompilerOptions {
            out_dir: Some("/p/out".to_string()),
            declaration_dir: Some("/p/types".to_string()),
            ..CompilerOptions::default()
        };
        let map = options_to_build_info(&options, "/p/out", true);
        assert_eq!(map["outDir"], Value::String("./".to_string()));
        assert_eq!(map["declarationDir"], Value::String("../types".to_string()));

        let decoded = options_from_build_info(&map, "/p/out").unwrap();
        assert_eq!(decoded.out_dir.as_deref(), Some("/p/out"));
        assert_eq!(decoded.declaration_dir.as_deref(), Some("/p/types"));
    }

    #[test]
    fn decode_round_trip() {
        let options = CompilerOptions {
            strict: true,
            composite: true,
            target: Some(ScriptTarget::Es2020),
            module: Some(ModuleKind::CommonJs),
            ..CompilerOptions::default()
        };
        let map = options_to_build_info(&options, "/p", true);
        assert_eq!(options_from_build_info(&map, "/p").unwrap(), options);
    }

    #[test]
    fn decode_rejects_bad_values_and_ignores_unknown() {
        let map: Map<String, Value> =
            serde_json::from_str(r#"{"module":"esnext"}"#).unwrap();
        assert!(matches!(
            options_from_build_info(&map, "/p"),
            Err(ConfigError::ValidationError(_))
        ));
        let map: Map<String, Value> =
            serde_json::from_str(r#"{"somethingNew":true,"strict":true}"#).unwrap();
        assert!(options_from_build_info(&map, "/p").unwrap().strict);
    }

    #[test]
    fn build_info_file_path() {
        let mut options = CompilerOptions {
            config_file_path: Some("/p/strata.toml".to_string()),
            ..CompilerOptions::default()
        };
        assert_eq!(get_build_info_file_path(&options), None);

        options.incremental = true;
        assert_eq!(
            get_build_info_file_path(&options).as_deref(),
            Some("/p/strata.tsbuildinfo")
        );

        options.out_dir = Some("/p/out".to_string());
        assert_eq!(
            get_build_info_file_path(&options).as_deref(),
            Some("/p/out/strata.tsbuildinfo")
        );

        options.root_dir = Some("/p".to_string());
        assert_eq!(
            get_build_info_file_path(&options).as_deref(),
            Some("/p/out/strata.tsbuildinfo")
        );

        options.ts_build_info_file = Some("/p/cache/x.tsbuildinfo".to_string());
        assert_eq!(
            get_build_info_file_path(&options).as_deref(),
            Some("/p/cache/x.tsbuildinfo")
        );
    }

    #[test]
    fn composite_implies_build_info() {
        let options = CompilerOptions {
            composite: true,
            config_file_path: Some("/p/strata.toml".to_string()),
            ..CompilerOptions::default()
        };
        assert!(get_build_info_file_path(&options).is_some());
    }
}
