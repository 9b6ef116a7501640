//! The program and type-checker abstractions consumed by the incremental engine.

use crate::emit::{EmitOptions, EmitResult, WriteFile};
use crate::host::Host;
use crate::source_file::{ResolutionMode, SourceFile};
use bitflags::bitflags;
use strata_common::FilePath;
use strata_config::CompilerOptions;
use strata_diagnostics::Diagnostic;

bitflags! {
    /// Kinds of declarations a symbol merges.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SymbolFlags: u32 {
        /// A `const`, `let`, or `var` binding.
        const VARIABLE = 1 << 0;
        /// A function declaration.
        const FUNCTION = 1 << 1;
        /// An interface.
        const INTERFACE = 1 << 2;
        /// A type alias.
        const TYPE_ALIAS = 1 << 3;
        /// A regular enum.
        const ENUM = 1 << 4;
        /// A `const enum`.
        const CONST_ENUM = 1 << 5;
        /// An import or export specifier referring to another symbol.
        const ALIAS = 1 << 6;
        /// A module namespace (`import * as ns`).
        const MODULE = 1 << 7;

        /// Symbols with a runtime value.
        const VALUE = Self::VARIABLE.bits() | Self::FUNCTION.bits() | Self::ENUM.bits() | Self::MODULE.bits();
        /// Symbols usable in type positions.
        const TYPE = Self::INTERFACE.bits() | Self::TYPE_ALIAS.bits() | Self::ENUM.bits() | Self::CONST_ENUM.bits();
    }
}

/// An export of a module as seen by the type checker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedSymbol {
    /// The exported name.
    pub name: String,
    /// The flags of the export itself.
    pub flags: SymbolFlags,
    /// Files containing the export's declarations.
    pub declaration_files: Vec<FilePath>,
    /// For aliases, the symbol the alias ultimately resolves to.
    pub target: Option<Box<ExportedSymbol>>,
}

/// Cross-file symbol queries.
pub trait TypeChecker {
    /// Files declaring the module `specifier` names when imported from `file`.
    ///
    /// Empty when the specifier does not resolve.
    fn module_declaration_files(&self, file: &SourceFile, specifier: &str) -> Vec<FilePath>;

    /// The exports of `file`, with aliases resolved.
    fn exported_symbols(&self, file: &SourceFile) -> Vec<ExportedSymbol>;

    /// For each `declare module "name"` block name, the files declaring it.
    fn ambient_module_files(&self) -> Vec<Vec<FilePath>>;
}

/// A type-checked set of source files.
pub trait Program: Send + Sync {
    /// The options the program was created with.
    fn options(&self) -> &CompilerOptions;

    /// The host the program reads from and writes to.
    fn host(&self) -> &dyn Host;

    /// All source files, default library first.
    fn source_files(&self) -> &[SourceFile];

    /// Looks up a file by canonical path.
    fn source_file(&self, path: &FilePath) -> Option<&SourceFile>;

    /// Returns `true` for the bundled default library.
    fn is_source_file_default_library(&self, path: &FilePath) -> bool;

    /// Returns `true` if `file` produces outputs.
    ///
    /// With `force_dts_emit` the question is whether a declaration could be
    /// produced, ignoring options that disable emit.
    fn source_file_may_be_emitted(&self, file: &SourceFile, force_dts_emit: bool) -> bool;

    /// The Node module format implied for `file`.
    fn implied_node_format(&self, file: &SourceFile) -> ResolutionMode;

    /// Errors from reading the configuration.
    fn config_file_parsing_diagnostics(&self) -> Vec<Diagnostic>;

    /// Errors about the option combination or missing root files.
    fn options_diagnostics(&self) -> Vec<Diagnostic>;

    /// Errors not tied to a file.
    fn global_diagnostics(&self) -> Vec<Diagnostic>;

    /// Syntax errors of `file`, or of every file.
    fn syntactic_diagnostics(&self, file: Option<&SourceFile>) -> Vec<Diagnostic>;

    /// Binding errors of `file`, or of every file.
    fn bind_diagnostics(&self, file: Option<&SourceFile>) -> Vec<Diagnostic>;

    /// Type errors of `file`, honouring lib-check skipping options.
    fn semantic_diagnostics(&self, file: &SourceFile) -> Vec<Diagnostic>;

    /// Type errors of several files, in the order given.
    fn semantic_diagnostics_of_files(&self, files: &[&SourceFile]) -> Vec<Vec<Diagnostic>> {
        files.iter().map(|file| self.semantic_diagnostics(file)).collect()
    }

    /// Errors that prevent a faithful declaration file for `file`.
    fn declaration_diagnostics(&self, file: &SourceFile) -> Vec<Diagnostic>;

    /// Emits outputs through `writer`.
    fn emit(&self, options: &EmitOptions, writer: &mut dyn WriteFile) -> EmitResult;

    /// The checker answering symbol queries about `file`.
    fn type_checker_for_file(&self, file: &SourceFile) -> &dyn TypeChecker;

    /// Resolved file names of the `/// <reference types>` directives of `file`.
    fn resolved_type_reference_directives(&self, file: &SourceFile) -> Vec<String>;

    /// The file a redirected file name stands for, if any.
    fn parse_file_redirect(&self, _file_name: &str) -> Option<String> {
        None
    }

    /// Whether paths are compared case-sensitively.
    fn use_case_sensitive_file_names(&self) -> bool {
        self.host().use_case_sensitive_file_names()
    }

    /// The directory relative names resolve against.
    fn current_directory(&self) -> &str {
        self.host().current_directory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_groups() {
        assert!(SymbolFlags::VALUE.contains(SymbolFlags::ENUM));
        assert!(!SymbolFlags::VALUE.contains(SymbolFlags::CONST_ENUM));
        assert!(SymbolFlags::TYPE.contains(SymbolFlags::CONST_ENUM));
        assert!(!SymbolFlags::TYPE.intersects(SymbolFlags::VARIABLE | SymbolFlags::ALIAS));
    }
}
