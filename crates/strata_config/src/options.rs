//! Option declarations and their effect on incremental state.
//!
//! Every [`CompilerOptions`] field is described by an [`OptionDeclaration`]
//! carrying its persisted name, value kind, and the [`OptionAffects`]
//! categories it belongs to. Option-delta predicates and build-info
//! persistence are both driven by this one table.

use crate::types::{CompilerOptions, ModuleKind, ScriptTarget};
use bitflags::bitflags;

bitflags! {
    /// The aspects of incremental state an option influences.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OptionAffects: u8 {
        /// Changing the option invalidates cached semantic diagnostics.
        const SEMANTIC_DIAGNOSTICS = 1 << 0;
        /// Changing the option forces every file to be re-emitted.
        const EMIT = 1 << 1;
        /// Changing the option moves declaration outputs.
        const DECLARATION_PATH = 1 << 2;
        /// The option is persisted in build info.
        const BUILD_INFO = 1 << 3;
    }
}

/// The value kind of an option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionKind {
    /// A boolean flag.
    Bool,
    /// A [`ModuleKind`].
    Module,
    /// A [`ScriptTarget`].
    Target,
    /// A file-system path.
    Path,
}

/// A single option value, used for comparison and persistence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    /// The option is unset.
    Absent,
    /// A boolean flag value.
    Bool(bool),
    /// A module kind.
    Module(ModuleKind),
    /// A script target.
    Target(ScriptTarget),
    /// An absolute path.
    Path(String),
}

impl OptionValue {
    /// Returns `true` for values that are not persisted (unset or `false`).
    pub fn is_default(&self) -> bool {
        matches!(self, OptionValue::Absent | OptionValue::Bool(false))
    }
}

/// Describes one compiler option.
pub struct OptionDeclaration {
    /// The camelCase name used in build info.
    pub name: &'static str,
    /// The value kind.
    pub kind: OptionKind,
    /// The categories this option belongs to.
    pub affects: OptionAffects,
    /// Reads the option from a set of options.
    pub get: fn(&CompilerOptions) -> OptionValue,
    /// Writes the option; values of the wrong kind are ignored.
    pub set: fn(&mut CompilerOptions, OptionValue),
}

macro_rules! bool_option {
    ($name:literal, $field:ident, $affects:expr) => {
        OptionDeclaration {
            name: $name,
            kind: OptionKind::Bool,
            affects: $affects,
            get: |options| OptionValue::Bool(options.$field),
            set: |options, value| {
                if let OptionValue::Bool(value) = value {
                    options.$field = value;
                }
            },
        }
    };
}

macro_rules! path_option {
    ($name:literal, $field:ident, $affects:expr) => {
        OptionDeclaration {
            name: $name,
            kind: OptionKind::Path,
            affects: $affects,
            get: |options| {
                options
                    .$field
                    .clone()
                    .map_or(OptionValue::Absent, OptionValue::Path)
            },
            set: |options, value| {
                if let OptionValue::Path(value) = value {
                    options.$field = Some(value);
                }
            },
        }
    };
}

const NONE: OptionAffects = OptionAffects::empty();
const BUILD_INFO: OptionAffects = OptionAffects::BUILD_INFO;
const CHECK: OptionAffects = OptionAffects::SEMANTIC_DIAGNOSTICS.union(OptionAffects::BUILD_INFO);
const OUTPUT: OptionAffects = CHECK.union(OptionAffects::EMIT);
const OUTPUT_PATH: OptionAffects = OptionAffects::EMIT
    .union(OptionAffects::DECLARATION_PATH)
    .union(OptionAffects::BUILD_INFO);

/// Every compiler option, in persisted order.
pub static OPTION_DECLARATIONS: &[OptionDeclaration] = &[
    bool_option!("assumeChangesOnlyAffectDirectDependencies", assume_changes_only_affect_direct_dependencies, BUILD_INFO),
    bool_option!("composite", composite, BUILD_INFO),
    bool_option!("declaration", declaration, BUILD_INFO),
    path_option!("declarationDir", declaration_dir, OUTPUT_PATH),
    bool_option!("declarationMap", declaration_map, BUILD_INFO),
    bool_option!("emitDeclarationOnly", emit_declaration_only, BUILD_INFO),
    bool_option!("incremental", incremental, NONE),
    bool_option!("inlineSourceMap", inline_source_map, BUILD_INFO),
    bool_option!("isolatedModules", isolated_modules, CHECK),
    bool_option!("listEmittedFiles", list_emitted_files, NONE),
    OptionDeclaration {
        name: "module",
        kind: OptionKind::Module,
        affects: OUTPUT,
        get: |options| options.module.map_or(OptionValue::Absent, OptionValue::Module),
        set: |options, value| {
            if let OptionValue::Module(value) = value {
                options.module = Some(value);
            }
        },
    },
    bool_option!("noCheck", no_check, BUILD_INFO),
    bool_option!("noEmit", no_emit, NONE),
    bool_option!("noEmitOnError", no_emit_on_error, BUILD_INFO),
    path_option!("outDir", out_dir, OUTPUT_PATH),
    path_option!("rootDir", root_dir, OUTPUT_PATH),
    bool_option!("skipDefaultLibCheck", skip_default_lib_check, BUILD_INFO),
    bool_option!("skipLibCheck", skip_lib_check, BUILD_INFO),
    bool_option!("sourceMap", source_map, BUILD_INFO),
    bool_option!("strict", strict, CHECK),
    OptionDeclaration {
        name: "target",
        kind: OptionKind::Target,
        affects: OUTPUT,
        get: |options| options.target.map_or(OptionValue::Absent, OptionValue::Target),
        set: |options, value| {
            if let OptionValue::Target(value) = value {
                options.target = Some(value);
            }
        },
    },
    path_option!("tsBuildInfoFile", ts_build_info_file, NONE),
];

/// Returns `true` if any option in `category` differs between `old` and `new`.
fn options_differ(old: &CompilerOptions, new: &CompilerOptions, category: OptionAffects) -> bool {
    OPTION_DECLARATIONS
        .iter()
        .filter(|decl| decl.affects.contains(category))
        .any(|decl| (decl.get)(old) != (decl.get)(new))
}

/// Returns `true` if cached semantic diagnostics cannot be reused across the change.
pub fn compiler_options_affect_semantic_diagnostics(old: &CompilerOptions, new: &CompilerOptions) -> bool {
    options_differ(old, new, OptionAffects::SEMANTIC_DIAGNOSTICS)
}

/// Returns `true` if every file must be re-emitted after the change.
pub fn compiler_options_affect_emit(old: &CompilerOptions, new: &CompilerOptions) -> bool {
    options_differ(old, new, OptionAffects::EMIT)
}

/// Returns `true` if declaration output locations move after the change.
pub fn compiler_options_affect_declaration_path(old: &CompilerOptions, new: &CompilerOptions) -> bool {
    options_differ(old, new, OptionAffects::DECLARATION_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_map_does_not_affect_emit() {
        let old = CompilerOptions::default();
        let new = CompilerOptions {
            source_map: true,
            declaration_map: true,
            ..CompilerOptions::default()
        };
        assert!(!compiler_options_affect_emit(&old, &new));
        assert!(!compiler_options_affect_semantic_diagnostics(&old, &new));
    }

    #[test]
    fn module_affects_emit_and_diagnostics() {
        let old = CompilerOptions::default();
        let new = CompilerOptions {
            module: Some(ModuleKind::CommonJs),
            ..CompilerOptions::default()
        };
        assert!(compiler_options_affect_emit(&old, &new));
        assert!(compiler_options_affect_semantic_diagnostics(&old, &new));
        assert!(!compiler_options_affect_declaration_path(&old, &new));
    }

    #[test]
    fn out_dir_affects_declaration_path() {
        let old = CompilerOptions::default();
        let new = CompilerOptions {
            out_dir: Some("/p/out".to_string()),
            ..CompilerOptions::default()
        };
        assert!(compiler_options_affect_declaration_path(&old, &new));
        assert!(compiler_options_affect_emit(&old, &new));
        assert!(!compiler_options_affect_semantic_diagnostics(&old, &new));
    }

    #[test]
    fn strict_affects_only_diagnostics() {
        let old = CompilerOptions::default();
        let new = CompilerOptions {
            strict: true,
            ..CompilerOptions::default()
        };
        assert!(compiler_options_affect_semantic_diagnostics(&old, &new));
        assert!(!compiler_options_affect_emit(&old, &new));
    }

    #[test]
    fn get_and_set_round_trip() {
        let mut options = CompilerOptions::default();
        for decl in OPTION_DECLARATIONS {
            let value = match decl.kind {
                OptionKind::Bool => OptionValue::Bool(true),
                OptionKind::Module => OptionValue::Module(ModuleKind::Node16),
                OptionKind::Target => OptionValue::Target(ScriptTarget::Es2020),
                OptionKind::Path => OptionValue::Path(format!("/p/{}", decl.name)),
            };
            (decl.set)(&mut options, value.clone());
            assert_eq!((decl.get)(&options), value, "option {}", decl.name);
        }
    }

    #[test]
    fn wrong_kind_is_ignored() {
        let mut options = CompilerOptions::default();
        let strict = OPTION_DECLARATIONS
            .iter()
            .find(|decl| decl.name == "strict")
            .unwrap();
        (strict.set)(&mut options, OptionValue::Path("x".to_string()));
        assert!(!options.strict);
    }
}
