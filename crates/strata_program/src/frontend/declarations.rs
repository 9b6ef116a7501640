//! Declaration file emit.
//!
//! Exported declarations are printed with their annotations as written, or
//! with inferred types where annotations are missing. Non-exported local
//! types that an emitted declaration mentions are included, and imports are
//! kept only for names the output still refers to.

use super::ast::*;
use super::checker::{evaluate_enum, Checker, EnumValue, LocalScope};
use super::printer::{identifier_words, MapOutput, PrintedFile, Printer};
use super::types::Type;
use crate::source_file::SourceFile;
use std::collections::HashSet;

/// Emits the declaration file for `file`.
pub fn emit_declarations(
    checker: &Checker<'_>,
    file: &SourceFile,
    output_file: &str,
    map_output: &MapOutput,
) -> PrintedFile {
    let is_module = file.is_external_module();
    let module = Checker::module_of(file);
    let emitter = DtsEmitter {
        checker,
        file,
        module,
        is_module,
    };

    // Render every candidate declaration first so local types can be pulled
    // in by name until the set stops growing.
    let rendered: Vec<Option<Rendered>> = file
        .statements()
        .iter()
        .map(|statement| emitter.render(statement))
        .collect();
    let mut included: Vec<bool> = rendered
        .iter()
        .map(|r| r.as_ref().is_some_and(|r| r.visible))
        .collect();
    loop {
        let referenced: HashSet<String> = rendered
            .iter()
            .zip(&included)
            .filter(|(_, &inc)| inc)
            .filter_map(|(r, _)| r.as_ref())
            .flat_map(|r| identifier_words(&r.text).into_iter().map(str::to_string))
            .collect();
        let mut changed = false;
        for (i, r) in rendered.iter().enumerate() {
            let Some(r) = r else { continue };
            if !included[i] && r.is_type && r.name.as_ref().is_some_and(|n| referenced.contains(n)) {
                included[i] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let body_words: HashSet<String> = rendered
        .iter()
        .zip(&included)
        .filter(|(_, &inc)| inc)
        .filter_map(|(r, _)| r.as_ref())
        .flat_map(|r| identifier_words(&r.text).into_iter().map(str::to_string))
        .collect();

    let mut printer = Printer::new(output_file, file, map_output);
    let mut has_module_syntax = false;
    let mut has_private = false;
    for (statement, (r, &inc)) in file.statements().iter().zip(rendered.iter().zip(&included)) {
        if let StatementKind::Import(import) = &statement.kind {
            if let Some(text) = render_import(import, &body_words) {
                printer.mark(file, statement.pos);
                printer.line(&text);
                has_module_syntax = true;
            }
            continue;
        }
        let Some(r) = r else { continue };
        if !inc {
            continue;
        }
        has_module_syntax |= r.module_syntax;
        has_private |= !r.module_syntax && is_module && r.name.is_some();
        printer.mark(file, statement.pos);
        printer.line(&r.text);
    }
    if is_module && (!has_module_syntax || has_private) {
        printer.line("export {};");
    }
    printer.finish(map_output)
}

struct Rendered {
    text: String,
    /// The declared name, for declarations that may be pulled in by reference.
    name: Option<String>,
    /// Emitted regardless of references.
    visible: bool,
    /// A type declaration that may be included when referenced.
    is_type: bool,
    /// Uses `export` syntax.
    module_syntax: bool,
}

struct DtsEmitter<'e, 'a> {
    checker: &'e Checker<'a>,
    file: &'e SourceFile,
    module: Option<super::binder::ModuleKey>,
    is_module: bool,
}

impl DtsEmitter<'_, '_> {
    fn snippet(&self, node_pos: u32, node_end: u32) -> &str {
        self.file.snippet(node_pos, node_end)
    }

    fn visible(&self, modifiers: Modifiers) -> bool {
        !self.is_module || modifiers.export
    }

    fn export_prefix(&self, modifiers: Modifiers) -> &'static str {
        if self.is_module && modifiers.export {
            "export "
        } else {
            ""
        }
    }

    fn declare_prefix(&self, modifiers: Modifiers) -> String {
        format!("{}declare ", self.export_prefix(modifiers))
    }

    fn type_text(&self, ty: &Type) -> String {
        ty.display_in(Some(self.file.path()))
    }

    fn render(&self, statement: &Statement) -> Option<Rendered> {
        let modifiers = statement.modifiers();
        let declaration = |text: String, name: &str, is_type: bool| Rendered {
            text,
            name: Some(name.to_string()),
            visible: self.visible(modifiers),
            is_type,
            module_syntax: self.is_module && modifiers.export,
        };
        match &statement.kind {
            StatementKind::Export(export) => Some(Rendered {
                text: render_export(export),
                name: None,
                visible: true,
                is_type: false,
                module_syntax: true,
            }),
            StatementKind::Variable(variable) => {
                let lines: Vec<String> = variable
                    .declarations
                    .iter()
                    .map(|decl| self.render_variable(variable, decl))
                    .collect();
                let name = variable.declarations.first().map(|d| d.name.text.as_str()).unwrap_or_default();
                Some(declaration(lines.join("\n"), name, false))
            }
            StatementKind::Function(function) => {
                // Implementations are replaced by their overload signatures when present.
                if function.body.is_some() && self.has_overloads(&function.name.text) {
                    return None;
                }
                let text = self.render_function(function);
                Some(declaration(text, &function.name.text, false))
            }
            StatementKind::Interface(interface) => {
                let text = format!(
                    "{}interface {}{}",
                    self.export_prefix(modifiers),
                    interface.name.text,
                    interface.rest
                );
                Some(declaration(text, &interface.name.text, true))
            }
            StatementKind::TypeAlias(alias) => {
                let text = format!(
                    "{}type {}{} = {};",
                    self.export_prefix(modifiers),
                    alias.name.text,
                    alias.type_parameters.as_deref().unwrap_or_default(),
                    self.snippet(alias.ty.pos, alias.ty.end)
                );
                Some(declaration(text, &alias.name.text, true))
            }
            StatementKind::Enum(decl) => {
                let text = self.render_enum(decl);
                Some(declaration(text, &decl.name.text, true))
            }
            StatementKind::GlobalAugmentation(_) | StatementKind::AmbientModule(_) => Some(Rendered {
                text: self.snippet(statement.pos, statement.end).to_string(),
                name: None,
                visible: true,
                is_type: false,
                module_syntax: false,
            }),
            StatementKind::Import(_)
            | StatementKind::Return(_)
            | StatementKind::Expression(_)
            | StatementKind::Opaque => None,
        }
    }

    fn has_overloads(&self, name: &str) -> bool {
        self.file.statements().iter().any(|statement| {
            matches!(&statement.kind, StatementKind::Function(f) if f.name.text == name && f.body.is_none())
        })
    }

    fn render_variable(&self, variable: &VariableStatement, decl: &VariableDeclaration) -> String {
        let prefix = self.declare_prefix(variable.modifiers);
        let keyword = variable.kind.keyword();
        let name = &decl.name.text;
        if let Some(ty) = &decl.ty {
            return format!("{prefix}{keyword} {name}: {};", self.snippet(ty.pos, ty.end));
        }
        let ty = self
            .checker
            .table()
            .lookup(self.module.as_ref(), name)
            .map(|id| self.checker.symbol_value_type(id))
            .unwrap_or(Type::Any);
        match (&ty, variable.kind) {
            (Type::NumberLiteral(_) | Type::StringLiteral(_) | Type::BooleanLiteral(_), VarKind::Const) => {
                format!("{prefix}{keyword} {name} = {};", self.type_text(&ty))
            }
            _ => format!("{prefix}{keyword} {name}: {};", self.type_text(&ty)),
        }
    }

    fn render_function(&self, function: &FunctionDeclaration) -> String {
        let scope = LocalScope::default();
        let type_parameters = function.type_parameters.as_deref().unwrap_or_default();
        let params: Vec<String> = function
            .params
            .iter()
            .map(|param| {
                let ty = match (&param.ty, &param.initializer) {
                    (Some(ty), _) => self.snippet(ty.pos, ty.end).to_string(),
                    (None, Some(initializer)) => self.type_text(
                        &self
                            .checker
                            .infer_expr(initializer, self.file, self.module.as_ref(), &scope)
                            .widen(),
                    ),
                    (None, None) if param.rest => "any[]".to_string(),
                    (None, None) => "any".to_string(),
                };
                let optional = if param.optional || param.initializer.is_some() { "?" } else { "" };
                let rest = if param.rest { "..." } else { "" };
                format!("{rest}{}{optional}: {ty}", param.name.text)
            })
            .collect();
        let ret = match &function.return_type {
            Some(ty) => self.snippet(ty.pos, ty.end).to_string(),
            None => {
                let inferred = self
                    .checker
                    .table()
                    .lookup(self.module.as_ref(), &function.name.text)
                    .map(|id| self.checker.symbol_value_type(id));
                match inferred {
                    Some(Type::Function { ret, .. }) => self.type_text(&ret),
                    _ => "any".to_string(),
                }
            }
        };
        format!(
            "{}function {}{type_parameters}({}): {ret};",
            self.declare_prefix(function.modifiers),
            function.name.text,
            params.join(", ")
        )
    }

    fn render_enum(&self, decl: &EnumDeclaration) -> String {
        let const_keyword = if decl.is_const { "const " } else { "" };
        let mut text = format!(
            "{}{const_keyword}enum {} {{",
            self.declare_prefix(decl.modifiers),
            decl.name.text
        );
        let members = evaluate_enum(decl, self.file.text());
        for (i, (name, value)) in members.iter().enumerate() {
            text.push_str("\n    ");
            text.push_str(name);
            match value {
                EnumValue::Number(number) => text.push_str(&format!(" = {number}")),
                EnumValue::String(value) => {
                    text.push_str(&format!(" = {}", Type::StringLiteral(value.clone())));
                }
                EnumValue::Computed(_) => {}
            }
            if i + 1 < members.len() {
                text.push(',');
            }
        }
        text.push_str(if members.is_empty() { "}" } else { "\n}" });
        text
    }
}

fn render_import(import: &ImportDeclaration, used: &HashSet<String>) -> Option<String> {
    let keep = |ident: &Ident| used.contains(&ident.text);
    let mut clauses = Vec::new();
    if let Some(default) = import.default_binding.as_ref().filter(|d| keep(d)) {
        clauses.push(default.text.clone());
    }
    if let Some(namespace) = import.namespace.as_ref().filter(|n| keep(n)) {
        clauses.push(format!("* as {}", namespace.text));
    }
    let named: Vec<String> = import
        .named
        .iter()
        .filter(|s| keep(&s.local))
        .map(|s| {
            if s.imported.text == s.local.text {
                s.local.text.clone()
            } else {
                format!("{} as {}", s.imported.text, s.local.text)
            }
        })
        .collect();
    if !named.is_empty() {
        clauses.push(format!("{{ {} }}", named.join(", ")));
    }
    if clauses.is_empty() {
        return None;
    }
    let type_keyword = if import.type_only { "type " } else { "" };
    Some(format!(
        "import {type_keyword}{} from \"{}\";",
        clauses.join(", "),
        import.module.text
    ))
}

fn render_export(export: &ExportDeclaration) -> String {
    let from = export
        .module
        .as_ref()
        .map(|m| format!(" from \"{}\"", m.text))
        .unwrap_or_default();
    match (&export.specifiers, &export.namespace) {
        (None, None) => format!("export *{from};"),
        (None, Some(namespace)) => format!("export * as {}{from};", namespace.text),
        (Some(list), _) => {
            let names: Vec<String> = list
                .iter()
                .map(|s| {
                    if s.local.text == s.exported.text {
                        s.local.text.clone()
                    } else {
                        format!("{} as {}", s.local.text, s.exported.text)
                    }
                })
                .collect();
            if names.is_empty() {
                "export {};".to_string()
            } else {
                format!("export {{ {} }}{from};", names.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::binder::SymbolTable;
    use std::collections::HashMap;
    use strata_common::FilePath;

    fn emit_with(
        sources: &[(&str, &str)],
        resolutions: &[(&str, &str, &str)],
        target: &str,
        map_output: &MapOutput,
    ) -> PrintedFile {
        let files: Vec<SourceFile> = sources
            .iter()
            .map(|(name, text)| SourceFile::parse(FilePath::from_canonical(*name), *name, *text))
            .collect();
        let resolved = resolutions
            .iter()
            .map(|(from, spec, to)| {
                (
                    (FilePath::from_canonical(*from), spec.to_string()),
                    FilePath::from_canonical(*to),
                )
            })
            .collect();
        let table = SymbolTable::bind(&files, &resolved);
        let index: HashMap<FilePath, usize> = files
            .iter()
            .enumerate()
            .map(|(i, f)| (f.path().clone(), i))
            .collect();
        let checker = Checker::new(&table, &files, &index, false);
        let file = &files[index[&FilePath::from_canonical(target)]];
        emit_declarations(&checker, file, "/out/x.d.ts", map_output)
    }

    fn emit(sources: &[(&str, &str)], resolutions: &[(&str, &str, &str)], target: &str) -> String {
        emit_with(sources, resolutions, target, &MapOutput::None).text
    }

    #[test]
    fn exported_declarations() {
        let dts = emit(
            &[(
                "/a.ts",
                "export const x = 1;\nexport let y = \"a\";\nconst hidden = 2;\nexport function f(a: number, b = \"s\") { return a; }\nexport enum Color { Red, Green = 5, Name = \"n\" }",
            )],
            &[],
            "/a.ts",
        );
        assert_eq!(
            dts,
            "export declare const x = 1;\nexport declare let y: string;\nexport declare function f(a: number, b?: string): number;\nexport declare enum Color {\n    Red = 0,\n    Green = 5,\n    Name = \"n\"\n}\n"
        );
    }

    #[test]
    fn referenced_local_types_are_included() {
        let dts = emit(
            &[(
                "/a.ts",
                "interface Point { x: number }\ninterface Unused { y: number }\ntype Alias = Point;\nexport function origin(): Alias { return undefined as any; }",
            )],
            &[],
            "/a.ts",
        );
        assert_eq!(
            dts,
            "interface Point { x: number }\ntype Alias = Point;\nexport declare function origin(): Alias;\nexport {};\n"
        );
    }

    #[test]
    fn imports_kept_only_when_used() {
        let dts = emit(
            &[
                ("/a.ts", "export interface Shape { w: number }\nexport const unit = 1;"),
                (
                    "/b.ts",
                    "import { Shape, unit } from './a';\nexport function make(w: number): Shape { return { w: w * unit }; }",
                ),
            ],
            &[("/b.ts", "./a", "/a.ts")],
            "/b.ts",
        );
        assert_eq!(
            dts,
            "import { Shape } from \"./a\";\nexport declare function make(w: number): Shape;\n"
        );
    }

    #[test]
    fn overloads_replace_implementation() {
        let dts = emit(
            &[(
                "/a.ts",
                "export function pick(a: string): string;\nexport function pick(a: number): number;\nexport function pick(a: any): any { return a; }",
            )],
            &[],
            "/a.ts",
        );
        assert_eq!(
            dts,
            "export declare function pick(a: string): string;\nexport declare function pick(a: number): number;\n"
        );
    }

    #[test]
    fn script_declarations() {
        let dts = emit(
            &[("/s.ts", "let counter = 0;\nfunction bump(by: number): void {}")],
            &[],
            "/s.ts",
        );
        assert_eq!(dts, "declare let counter: number;\ndeclare function bump(by: number): void;\n");
    }

    #[test]
    fn module_without_exports_gets_marker() {
        let dts = emit(&[("/m.ts", "import './side';\nconsole.log(1);")], &[], "/m.ts");
        assert_eq!(dts, "export {};\n");
    }

    #[test]
    fn declaration_map() {
        let output = MapOutput::File("/out/x.d.ts.map".to_string());
        let printed = emit_with(&[("/src/a.ts", "export const x = 1;")], &[], "/src/a.ts", &output);
        let pos = printed.source_map_url_pos.unwrap();
        assert_eq!(&printed.text[pos..], "//# sourceMappingURL=x.d.ts.map");
        let map: serde_json::Value = serde_json::from_str(printed.map.as_deref().unwrap()).unwrap();
        assert_eq!(map["file"], "x.d.ts");
        assert_eq!(map["sources"][0], "../src/a.ts");
    }
}
