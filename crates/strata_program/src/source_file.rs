//! Parsed source files with line-start indexing and module metadata.

use crate::frontend::ast::{Statement, StatementKind, StringLit};
use crate::frontend::parser::parse;
use crate::frontend::scanner::DirectiveKind;
use serde::{Deserialize, Serialize};
use strata_common::path::is_declaration_file_name;
use strata_common::FilePath;
use strata_diagnostics::Diagnostic;

/// Module format a file is interpreted with under Node-style resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ResolutionMode {
    /// Not determined by the file (non-Node module settings).
    #[default]
    None,
    /// CommonJS.
    CommonJs,
    /// ECMAScript modules.
    EsNext,
}

impl From<ResolutionMode> for u8 {
    fn from(mode: ResolutionMode) -> u8 {
        match mode {
            ResolutionMode::None => 0,
            ResolutionMode::CommonJs => 1,
            ResolutionMode::EsNext => 99,
        }
    }
}

impl TryFrom<u8> for ResolutionMode {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ResolutionMode::None),
            1 => Ok(ResolutionMode::CommonJs),
            99 => Ok(ResolutionMode::EsNext),
            other => Err(format!("unknown resolution mode {other}")),
        }
    }
}

/// A `/// <reference ... />` directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileReference {
    /// The referenced name as written.
    pub file_name: String,
    /// Start offset of the directive.
    pub pos: u32,
    /// End offset of the directive.
    pub end: u32,
}

/// The name of a `declare module` or `declare global` block in a module file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleAugmentation {
    /// `declare global { ... }`
    Global,
    /// `declare module "name" { ... }`
    Module(StringLit),
}

/// A source file loaded into a program.
///
/// Stores the file's text, its syntax tree, and the module metadata the
/// incremental engine queries (imports, augmentations, triple-slash
/// references) together with precomputed line starts for position mapping.
pub struct SourceFile {
    path: FilePath,
    file_name: String,
    text: String,
    statements: Vec<Statement>,
    parse_diagnostics: Vec<Diagnostic>,
    imports: Vec<StringLit>,
    module_augmentations: Vec<ModuleAugmentation>,
    referenced_files: Vec<FileReference>,
    type_reference_directives: Vec<FileReference>,
    is_declaration_file: bool,
    is_json: bool,
    external_module_indicator: bool,
    line_starts: Vec<u32>,
}

impl SourceFile {
    /// Parses `text` as a TypeScript file.
    pub fn parse(path: FilePath, file_name: impl Into<String>, text: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let text = text.into();
        let parsed = parse(&path, &text);

        let mut referenced_files = Vec::new();
        let mut type_reference_directives = Vec::new();
        for directive in parsed.directives {
            let reference = FileReference {
                file_name: directive.value,
                pos: directive.pos,
                end: directive.end,
            };
            match directive.kind {
                DirectiveKind::Path => referenced_files.push(reference),
                DirectiveKind::Types => type_reference_directives.push(reference),
            }
        }

        let external_module_indicator = parsed.statements.iter().any(Statement::is_module_syntax);
        let mut imports = Vec::new();
        let mut module_augmentations = Vec::new();
        collect_module_names(
            &parsed.statements,
            external_module_indicator,
            &mut imports,
            &mut module_augmentations,
        );

        Self {
            is_declaration_file: is_declaration_file_name(&file_name),
            line_starts: compute_line_starts(&text),
            path,
            file_name,
            text,
            statements: parsed.statements,
            parse_diagnostics: parsed.diagnostics,
            imports,
            module_augmentations,
            referenced_files,
            type_reference_directives,
            is_json: false,
            external_module_indicator,
        }
    }

    /// Wraps a JSON document. JSON files have no statements and are always modules.
    pub fn json(path: FilePath, file_name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            path,
            file_name: file_name.into(),
            line_starts: compute_line_starts(&text),
            text,
            statements: Vec::new(),
            parse_diagnostics: Vec::new(),
            imports: Vec::new(),
            module_augmentations: Vec::new(),
            referenced_files: Vec::new(),
            type_reference_directives: Vec::new(),
            is_declaration_file: false,
            is_json: true,
            external_module_indicator: true,
        }
    }

    /// The canonical path of this file.
    pub fn path(&self) -> &FilePath {
        &self.path
    }

    /// The file name as loaded (absolute, original case).
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The full text of the file.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Top-level statements.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Syntax errors found while parsing.
    pub fn parse_diagnostics(&self) -> &[Diagnostic] {
        &self.parse_diagnostics
    }

    /// Module specifiers of imports and re-exports, in source order.
    pub fn imports(&self) -> &[StringLit] {
        &self.imports
    }

    /// `declare module` / `declare global` blocks of a module file.
    pub fn module_augmentations(&self) -> &[ModuleAugmentation] {
        &self.module_augmentations
    }

    /// `/// <reference path="..." />` directives.
    pub fn referenced_files(&self) -> &[FileReference] {
        &self.referenced_files
    }

    /// `/// <reference types="..." />` directives.
    pub fn type_reference_directives(&self) -> &[FileReference] {
        &self.type_reference_directives
    }

    /// Returns `true` for `.d.ts` files.
    pub fn is_declaration_file(&self) -> bool {
        self.is_declaration_file
    }

    /// Returns `true` for JSON documents.
    pub fn is_json_file(&self) -> bool {
        self.is_json
    }

    /// Returns `true` if the file contains module syntax.
    pub fn is_external_module(&self) -> bool {
        self.external_module_indicator
    }

    /// Returns `true` if a module file contains `declare global`.
    pub fn has_global_augmentation(&self) -> bool {
        self.module_augmentations
            .iter()
            .any(|augmentation| matches!(augmentation, ModuleAugmentation::Global))
    }

    /// Returns `true` if every statement is a `declare module "name"` block.
    pub fn contains_only_ambient_modules(&self) -> bool {
        self.statements
            .iter()
            .all(|statement| matches!(statement.kind, StatementKind::AmbientModule(_)))
    }

    /// Converts an offset into 0-based (line, character) coordinates.
    pub fn line_and_character(&self, pos: u32) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&pos) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        (line as u32, pos - self.line_starts[line])
    }

    /// Returns the text between two offsets.
    pub fn snippet(&self, start: u32, end: u32) -> &str {
        &self.text[start as usize..end as usize]
    }
}

fn collect_module_names(
    statements: &[Statement],
    is_module: bool,
    imports: &mut Vec<StringLit>,
    augmentations: &mut Vec<ModuleAugmentation>,
) {
    for statement in statements {
        match &statement.kind {
            StatementKind::Import(import) => imports.push(import.module.clone()),
            StatementKind::Export(export) => {
                if let Some(module) = &export.module {
                    imports.push(module.clone());
                }
            }
            StatementKind::GlobalAugmentation(_) if is_module => {
                augmentations.push(ModuleAugmentation::Global);
            }
            StatementKind::AmbientModule(module) => {
                if is_module {
                    augmentations.push(ModuleAugmentation::Module(module.name.clone()));
                }
                // Imports inside ambient module bodies are resolved like top-level ones.
                collect_module_names(&module.body, false, imports, augmentations);
            }
            _ => {}
        }
    }
}

fn compute_line_starts(content: &str) -> Vec<u32> {
    let mut starts = vec![0u32];
    for (i, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            starts.push((i + 1) as u32);
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_file(name: &str, text: &str) -> SourceFile {
        SourceFile::parse(FilePath::from_canonical(name), name, text)
    }

    #[test]
    fn line_and_character_resolution() {
        let f = make_file("/a.ts", "abc\ndef\nghi");
        assert_eq!(f.line_and_character(0), (0, 0));
        assert_eq!(f.line_and_character(4), (1, 0));
        assert_eq!(f.line_and_character(5), (1, 1));
        assert_eq!(f.line_and_character(8), (2, 0));
    }

    #[test]
    fn module_metadata() {
        let f = make_file(
            "/a.ts",
            "/// <reference path=\"./g.d.ts\" />\nimport { x } from './b';\nexport * from './c';\ndeclare global { var g: number; }\ndeclare module './b' { interface Extra {} }",
        );
        assert!(f.is_external_module());
        assert!(f.has_global_augmentation());
        let imports: Vec<&str> = f.imports().iter().map(|s| s.text.as_str()).collect();
        assert_eq!(imports, vec!["./b", "./c"]);
        assert_eq!(f.module_augmentations().len(), 2);
        assert_eq!(f.referenced_files()[0].file_name, "./g.d.ts");
    }

    #[test]
    fn script_file_is_not_a_module() {
        let f = make_file("/g.ts", "declare module 'lib' { export const v: number; }");
        assert!(!f.is_external_module());
        assert!(f.module_augmentations().is_empty());
        assert!(f.contains_only_ambient_modules());

        let g = make_file("/h.ts", "var counter = 0;");
        assert!(!g.is_external_module());
        assert!(!g.contains_only_ambient_modules());
    }

    #[test]
    fn declaration_and_json_files() {
        assert!(make_file("/types.d.ts", "export declare const x: number;").is_declaration_file());
        let json = SourceFile::json(FilePath::from_canonical("/data.json"), "/data.json", "{}");
        assert!(json.is_json_file() && json.is_external_module());
    }

    #[test]
    fn resolution_mode_codes() {
        assert_eq!(u8::from(ResolutionMode::EsNext), 99);
        assert_eq!(ResolutionMode::try_from(1u8), Ok(ResolutionMode::CommonJs));
        assert!(ResolutionMode::try_from(7u8).is_err());
    }
}
