//! Parsing of `strata.toml` project files and compiler-option semantics.
//!
//! This crate reads the project configuration into a strongly-typed
//! [`ProjectConfig`], resolves its root files, and describes how each
//! [`CompilerOptions`] field affects incremental state: which options
//! invalidate semantic diagnostics, which force a full re-emit, and how
//! options are persisted in build info.

#![warn(missing_docs)]

pub mod build_info;
pub mod error;
pub mod loader;
pub mod options;
pub mod resolve;
pub mod types;

pub use build_info::{
    get_build_info_directory, get_build_info_file_path, options_from_build_info,
    options_to_build_info, BUILD_INFO_EXTENSION,
};
pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use options::{
    compiler_options_affect_declaration_path, compiler_options_affect_emit,
    compiler_options_affect_semantic_diagnostics, OptionAffects, OptionDeclaration, OptionKind,
    OptionValue, OPTION_DECLARATIONS,
};
pub use resolve::resolve_root_files;
pub use types::*;
