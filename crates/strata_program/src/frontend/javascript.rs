//! JavaScript emit: type erasure, enum lowering, and module format conversion.

use super::ast::*;
use super::binder::ModuleKey;
use super::checker::{evaluate_enum, Checker, EnumValue};
use super::printer::{identifier_words, MapOutput, PrintedFile, Printer};
use crate::program::SymbolFlags;
use crate::source_file::SourceFile;
use std::collections::{HashMap, HashSet};
use strata_common::path::{get_base_file_name, remove_file_extension};

/// The module format of emitted JavaScript.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleFormat {
    /// `import`/`export` statements are kept.
    EsModule,
    /// Imports become `require` calls and exports become `exports.x` assignments.
    CommonJs,
}

/// Emits the JavaScript for `file`.
pub fn emit_javascript(
    checker: &Checker<'_>,
    file: &SourceFile,
    format: ModuleFormat,
    output_file: &str,
    map_output: &MapOutput,
) -> PrintedFile {
    let mut emitter = JsEmitter {
        checker,
        file,
        module: Checker::module_of(file),
        format,
        printer: Printer::new(output_file, file, map_output),
        value_names: HashSet::new(),
        rewrites: HashMap::new(),
        module_variables: HashMap::new(),
    };
    collect_value_names(file, file.statements(), &mut emitter.value_names);
    emitter.emit_file();
    emitter.printer.finish(map_output)
}

struct JsEmitter<'e, 'a> {
    checker: &'e Checker<'a>,
    file: &'e SourceFile,
    module: Option<ModuleKey>,
    format: ModuleFormat,
    printer: Printer,
    value_names: HashSet<String>,
    /// CommonJS: imported local names and the property accesses replacing them.
    rewrites: HashMap<String, String>,
    module_variables: HashMap<String, usize>,
}

impl JsEmitter<'_, '_> {
    fn is_commonjs_module(&self) -> bool {
        self.format == ModuleFormat::CommonJs && self.file.is_external_module()
    }

    fn emit_file(&mut self) {
        if self.is_commonjs_module() {
            self.printer.line("\"use strict\";");
            self.printer
                .line("Object.defineProperty(exports, \"__esModule\", { value: true });");
        }
        let statements = self.file.statements();
        let emits_anything = statements.iter().any(|s| self.emits_code(s));
        for statement in statements {
            self.emit_statement(statement, true);
        }
        if self.format == ModuleFormat::EsModule && self.file.is_external_module() && !emits_anything {
            self.printer.line("export {};");
        }
    }

    fn emits_code(&self, statement: &Statement) -> bool {
        match &statement.kind {
            StatementKind::Import(import) => self.kept_import_bindings(import).is_some(),
            StatementKind::Export(_) => true,
            StatementKind::Variable(variable) => !variable.modifiers.declare && !self.file.is_declaration_file(),
            StatementKind::Function(function) => function.body.is_some(),
            StatementKind::Enum(decl) => !decl.is_const && !decl.modifiers.declare,
            StatementKind::Interface(_)
            | StatementKind::TypeAlias(_)
            | StatementKind::GlobalAugmentation(_)
            | StatementKind::AmbientModule(_) => false,
            _ => true,
        }
    }

    fn snippet(&self, pos: u32, end: u32) -> &str {
        self.file.snippet(pos, end)
    }

    fn emit_statement(&mut self, statement: &Statement, top_level: bool) {
        if !self.emits_code(statement) {
            return;
        }
        self.printer.mark(self.file, statement.pos);
        match &statement.kind {
            StatementKind::Import(import) => self.emit_import(import),
            StatementKind::Export(export) => self.emit_export(export),
            StatementKind::Variable(variable) => self.emit_variable(variable, top_level),
            StatementKind::Function(function) => self.emit_function(function, top_level),
            StatementKind::Enum(decl) => self.emit_enum(decl, top_level),
            StatementKind::Return(value) => {
                match value {
                    Some(expr) => {
                        let text = self.expr(expr);
                        self.printer.line(&format!("return {text};"));
                    }
                    None => self.printer.line("return;"),
                }
            }
            StatementKind::Expression(expr) => {
                let text = self.expr(expr);
                self.printer.line(&format!("{text};"));
            }
            StatementKind::Opaque => {
                let text = self.snippet(statement.pos, statement.end).to_string();
                if !text.trim().is_empty() && text.trim() != ";" {
                    self.printer.line(&text);
                }
            }
            StatementKind::Interface(_)
            | StatementKind::TypeAlias(_)
            | StatementKind::GlobalAugmentation(_)
            | StatementKind::AmbientModule(_) => {}
        }
    }

    /// The bindings of `import` that are used as values, or `None` if the
    /// whole declaration is elided. Side-effect imports are always kept.
    fn kept_import_bindings(&self, import: &ImportDeclaration) -> Option<KeptBindings> {
        if import.type_only {
            return None;
        }
        let bare = import.default_binding.is_none() && import.namespace.is_none() && import.named.is_empty();
        let used = |ident: &Ident| self.value_names.contains(&ident.text);
        let kept = KeptBindings {
            default: import.default_binding.clone().filter(|d| used(d)),
            namespace: import.namespace.clone().filter(|n| used(n)),
            named: import.named.iter().filter(|s| used(&s.local)).cloned().collect(),
        };
        if bare || kept.default.is_some() || kept.namespace.is_some() || !kept.named.is_empty() {
            Some(kept)
        } else {
            None
        }
    }

    fn module_variable(&mut self, specifier: &str) -> String {
        let base = get_base_file_name(remove_file_extension(specifier));
        let mut name: String = base
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            name.insert(0, '_');
        }
        let count = self.module_variables.entry(name.clone()).or_insert(0);
        *count += 1;
        format!("{name}_{count}")
    }

    fn emit_import(&mut self, import: &ImportDeclaration) {
        let Some(kept) = self.kept_import_bindings(import) else {
            return;
        };
        let specifier = self.snippet(import.module.pos, import.module.end).to_string();
        if self.format == ModuleFormat::EsModule {
            let mut clauses = Vec::new();
            if let Some(default) = &kept.default {
                clauses.push(default.text.clone());
            }
            if let Some(namespace) = &kept.namespace {
                clauses.push(format!("* as {}", namespace.text));
            }
            if !kept.named.is_empty() {
                let named: Vec<String> = kept.named.iter().map(import_specifier_text).collect();
                clauses.push(format!("{{ {} }}", named.join(", ")));
            }
            if clauses.is_empty() {
                self.printer.line(&format!("import {specifier};"));
            } else {
                self.printer
                    .line(&format!("import {} from {specifier};", clauses.join(", ")));
            }
            return;
        }
        if let Some(namespace) = &kept.namespace {
            self.printer
                .line(&format!("const {} = require({specifier});", namespace.text));
        }
        if kept.default.is_none() && kept.named.is_empty() {
            if kept.namespace.is_none() {
                self.printer.line(&format!("require({specifier});"));
            }
            return;
        }
        let variable = self.module_variable(&import.module.text);
        self.printer
            .line(&format!("const {variable} = require({specifier});"));
        if let Some(default) = &kept.default {
            self.rewrites
                .insert(default.text.clone(), format!("{variable}.default"));
        }
        for specifier in &kept.named {
            self.rewrites.insert(
                specifier.local.text.clone(),
                format!("{variable}.{}", specifier.imported.text),
            );
        }
    }

    /// Returns `true` if an export specifier names something with a runtime value.
    fn exports_value(&self, local: &str, from_module: bool) -> bool {
        if from_module {
            return true;
        }
        let table = self.checker.table();
        let Some(id) = table.lookup(self.module.as_ref(), local) else {
            return true;
        };
        let symbol = table.symbol(id);
        if symbol.flags.contains(SymbolFlags::ALIAS) {
            return match table.resolve_alias(id) {
                Some(target) => table
                    .symbol(target)
                    .flags
                    .intersects(SymbolFlags::VALUE),
                None => table.namespace_target(id).is_some(),
            };
        }
        symbol.flags.intersects(SymbolFlags::VALUE)
    }

    fn emit_export(&mut self, export: &ExportDeclaration) {
        let specifier = export
            .module
            .as_ref()
            .map(|m| self.snippet(m.pos, m.end).to_string());
        let from_module = specifier.is_some();
        let specifiers: Option<Vec<ExportSpecifier>> = export.specifiers.as_ref().map(|list| {
            list.iter()
                .filter(|s| self.exports_value(&s.local.text, from_module))
                .cloned()
                .collect()
        });
        if self.format == ModuleFormat::EsModule {
            let from = specifier.map(|s| format!(" from {s}")).unwrap_or_default();
            let text = match (&specifiers, &export.namespace) {
                (None, None) => format!("export *{from};"),
                (None, Some(namespace)) => format!("export * as {}{from};", namespace.text),
                (Some(list), _) => {
                    let names: Vec<String> = list.iter().map(export_specifier_text).collect();
                    if names.is_empty() {
                        "export {};".to_string()
                    } else {
                        format!("export {{ {} }}{from};", names.join(", "))
                    }
                }
            };
            self.printer.line(&text);
            return;
        }
        match (specifier, &specifiers, &export.namespace) {
            (Some(module), None, None) => {
                self.printer
                    .line(&format!("Object.assign(exports, require({module}));"));
            }
            (Some(module), None, Some(namespace)) => {
                self.printer
                    .line(&format!("exports.{} = require({module});", namespace.text));
            }
            (Some(module), Some(list), _) => {
                if list.is_empty() {
                    return;
                }
                let variable = export
                    .module
                    .as_ref()
                    .map(|m| self.module_variable(&m.text))
                    .unwrap_or_default();
                self.printer
                    .line(&format!("const {variable} = require({module});"));
                for s in list {
                    self.printer
                        .line(&format!("exports.{} = {variable}.{};", s.exported.text, s.local.text));
                }
            }
            (None, Some(list), _) => {
                for s in list {
                    let value = self.identifier(&s.local.text);
                    self.printer
                        .line(&format!("exports.{} = {value};", s.exported.text));
                }
            }
            (None, None, _) => {}
        }
    }

    fn exported_here(&self, export: bool, top_level: bool) -> bool {
        export && top_level && self.file.is_external_module()
    }

    fn emit_variable(&mut self, variable: &VariableStatement, top_level: bool) {
        let exported = self.exported_here(variable.modifiers.export, top_level);
        let declarations: Vec<String> = variable
            .declarations
            .iter()
            .map(|decl| match &decl.initializer {
                Some(initializer) => format!("{} = {}", decl.name.text, self.expr(initializer)),
                None => decl.name.text.clone(),
            })
            .collect();
        let prefix = if exported && self.format == ModuleFormat::EsModule {
            "export "
        } else {
            ""
        };
        self.printer.line(&format!(
            "{prefix}{} {};",
            variable.kind.keyword(),
            declarations.join(", ")
        ));
        if exported && self.format == ModuleFormat::CommonJs {
            for decl in &variable.declarations {
                self.printer
                    .line(&format!("exports.{0} = {0};", decl.name.text));
            }
        }
    }

    fn params(&self, params: &[Param]) -> String {
        params
            .iter()
            .map(|param| {
                let mut text = String::new();
                if param.rest {
                    text.push_str("...");
                }
                text.push_str(&param.name.text);
                if let Some(initializer) = &param.initializer {
                    text.push_str(" = ");
                    text.push_str(&self.expr(initializer));
                }
                text
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn emit_function(&mut self, function: &FunctionDeclaration, top_level: bool) {
        let Some(body) = &function.body else {
            return;
        };
        let exported = self.exported_here(function.modifiers.export, top_level);
        let prefix = if exported && self.format == ModuleFormat::EsModule {
            "export "
        } else {
            ""
        };
        let params = self.params(&function.params);
        self.printer
            .line(&format!("{prefix}function {}({params}) {{", function.name.text));
        self.printer.indent();
        for statement in body {
            self.emit_statement(statement, false);
        }
        self.printer.dedent();
        self.printer.line("}");
        if exported && self.format == ModuleFormat::CommonJs {
            self.printer
                .line(&format!("exports.{0} = {0};", function.name.text));
        }
    }

    fn emit_enum(&mut self, decl: &EnumDeclaration, top_level: bool) {
        let name = &decl.name.text;
        let exported = self.exported_here(decl.modifiers.export, top_level);
        let prefix = if exported && self.format == ModuleFormat::EsModule {
            "export "
        } else {
            ""
        };
        self.printer.line(&format!("{prefix}var {name};"));
        self.printer.line(&format!("(function ({name}) {{"));
        self.printer.indent();
        for (member, value) in evaluate_enum(decl, self.file.text()) {
            let line = match value {
                EnumValue::Number(number) => {
                    format!("{name}[{name}[\"{member}\"] = {number}] = \"{member}\";")
                }
                EnumValue::String(text) => format!("{name}[\"{member}\"] = {};", quote(&text)),
                EnumValue::Computed(text) => {
                    format!("{name}[{name}[\"{member}\"] = {text}] = \"{member}\";")
                }
            };
            self.printer.line(&line);
        }
        self.printer.dedent();
        let target = if exported && self.format == ModuleFormat::CommonJs {
            format!("exports.{name} = {name}")
        } else {
            name.clone()
        };
        self.printer
            .line(&format!("}})({name} || ({target} = {{}}));"));
    }

    fn identifier(&self, name: &str) -> String {
        self.rewrites
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Inlines `E.A` for const enums.
    fn const_enum_access(&self, object: &str, member: &str) -> Option<String> {
        let table = self.checker.table();
        let id = self.checker.enum_symbol(object, self.module.as_ref())?;
        let symbol = table.symbol(id);
        if !symbol.flags.contains(SymbolFlags::CONST_ENUM) {
            return None;
        }
        let source = self.checker.source_file(&symbol.file)?;
        symbol.declarations.iter().find_map(|declaration| {
            let super::binder::Declaration::Enum(decl) = declaration else {
                return None;
            };
            let (_, value) = evaluate_enum(decl, source.text())
                .into_iter()
                .find(|(name, _)| name == member)?;
            let literal = match value {
                EnumValue::Number(number) => number,
                EnumValue::String(text) => quote(&text),
                EnumValue::Computed(_) => return None,
            };
            Some(format!("{literal} /* {object}.{member} */"))
        })
    }

    fn expr(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Number(_) | ExprKind::String(_) | ExprKind::Bool(_) | ExprKind::Null | ExprKind::Opaque => {
                self.snippet(expr.pos, expr.end).to_string()
            }
            ExprKind::Identifier(name) => self.identifier(name),
            ExprKind::Member { object, name } => {
                if let ExprKind::Identifier(object_name) = &object.kind {
                    if let Some(inlined) = self.const_enum_access(object_name, &name.text) {
                        return inlined;
                    }
                }
                format!("{}.{}", self.expr(object), name.text)
            }
            ExprKind::Index { object, index } => format!("{}[{}]", self.expr(object), self.expr(index)),
            ExprKind::Call { callee, arguments } => {
                format!("{}({})", self.expr(callee), self.list(arguments))
            }
            ExprKind::New { callee, arguments } => {
                format!("new {}({})", self.expr(callee), self.list(arguments))
            }
            ExprKind::Unary { op, operand } => {
                let space = if op.chars().all(char::is_alphabetic) { " " } else { "" };
                format!("{op}{space}{}", self.expr(operand))
            }
            ExprKind::Binary { op, left, right } => {
                format!("{} {op} {}", self.expr(left), self.expr(right))
            }
            ExprKind::Conditional {
                condition,
                when_true,
                when_false,
            } => format!(
                "{} ? {} : {}",
                self.expr(condition),
                self.expr(when_true),
                self.expr(when_false)
            ),
            ExprKind::Paren(inner) => format!("({})", self.expr(inner)),
            ExprKind::Array(elements) => format!("[{}]", self.list(elements)),
            ExprKind::Object(properties) => {
                if properties.is_empty() {
                    return "{}".to_string();
                }
                let members: Vec<String> = properties
                    .iter()
                    .map(|(name, value)| {
                        let shorthand = matches!(&value.kind, ExprKind::Identifier(v) if *v == name.text)
                            && value.pos == name.pos;
                        if shorthand && !self.rewrites.contains_key(&name.text) {
                            name.text.clone()
                        } else {
                            format!("{}: {}", name.text, self.expr(value))
                        }
                    })
                    .collect();
                format!("{{ {} }}", members.join(", "))
            }
            ExprKind::Arrow { params, body, .. } => {
                let body_text = self.expr(body);
                let body_text = if matches!(body.kind, ExprKind::Object(_)) {
                    format!("({body_text})")
                } else {
                    body_text
                };
                format!("({}) => {body_text}", self.params(params))
            }
            ExprKind::As { expr, .. } => self.expr(expr),
        }
    }

    fn list(&self, exprs: &[Expr]) -> String {
        exprs
            .iter()
            .map(|e| self.expr(e))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

struct KeptBindings {
    default: Option<Ident>,
    namespace: Option<Ident>,
    named: Vec<ImportSpecifier>,
}

fn import_specifier_text(specifier: &ImportSpecifier) -> String {
    if specifier.imported.text == specifier.local.text {
        specifier.local.text.clone()
    } else {
        format!("{} as {}", specifier.imported.text, specifier.local.text)
    }
}

fn export_specifier_text(specifier: &ExportSpecifier) -> String {
    if specifier.local.text == specifier.exported.text {
        specifier.local.text.clone()
    } else {
        format!("{} as {}", specifier.local.text, specifier.exported.text)
    }
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
}

/// Collects names referenced in value positions. Opaque code contributes
/// every identifier-like word it contains.
fn collect_value_names(file: &SourceFile, statements: &[Statement], names: &mut HashSet<String>) {
    for statement in statements {
        match &statement.kind {
            StatementKind::Export(export) if export.module.is_none() => {
                for specifier in export.specifiers.iter().flatten() {
                    names.insert(specifier.local.text.clone());
                }
            }
            StatementKind::Variable(variable) => {
                for decl in &variable.declarations {
                    if let Some(initializer) = &decl.initializer {
                        collect_expr_names(file, initializer, names);
                    }
                }
            }
            StatementKind::Function(function) => {
                for param in &function.params {
                    if let Some(initializer) = &param.initializer {
                        collect_expr_names(file, initializer, names);
                    }
                }
                if let Some(body) = &function.body {
                    collect_value_names(file, body, names);
                }
            }
            StatementKind::Enum(decl) if !decl.is_const => {
                for member in &decl.members {
                    if let Some(initializer) = &member.initializer {
                        collect_expr_names(file, initializer, names);
                    }
                }
            }
            StatementKind::Return(Some(expr)) | StatementKind::Expression(expr) => {
                collect_expr_names(file, expr, names);
            }
            StatementKind::Opaque => {
                let text = file.snippet(statement.pos, statement.end);
                names.extend(identifier_words(text).into_iter().map(str::to_string));
            }
            _ => {}
        }
    }
}

fn collect_expr_names(file: &SourceFile, expr: &Expr, names: &mut HashSet<String>) {
    match &expr.kind {
        ExprKind::Identifier(name) => {
            names.insert(name.clone());
        }
        ExprKind::Member { object, .. } => collect_expr_names(file, object, names),
        ExprKind::Index { object, index } => {
            collect_expr_names(file, object, names);
            collect_expr_names(file, index, names);
        }
        ExprKind::Call { callee, arguments } | ExprKind::New { callee, arguments } => {
            collect_expr_names(file, callee, names);
            for argument in arguments {
                collect_expr_names(file, argument, names);
            }
        }
        ExprKind::Unary { operand, .. } => collect_expr_names(file, operand, names),
        ExprKind::Binary { left, right, .. } => {
            collect_expr_names(file, left, names);
            collect_expr_names(file, right, names);
        }
        ExprKind::Conditional {
            condition,
            when_true,
            when_false,
        } => {
            collect_expr_names(file, condition, names);
            collect_expr_names(file, when_true, names);
            collect_expr_names(file, when_false, names);
        }
        ExprKind::Paren(inner) | ExprKind::As { expr: inner, .. } => collect_expr_names(file, inner, names),
        ExprKind::Array(elements) => {
            for element in elements {
                collect_expr_names(file, element, names);
            }
        }
        ExprKind::Object(properties) => {
            for (_, value) in properties {
                collect_expr_names(file, value, names);
            }
        }
        ExprKind::Arrow { params, body, .. } => {
            for param in params {
                if let Some(initializer) = &param.initializer {
                    collect_expr_names(file, initializer, names);
                }
            }
            collect_expr_names(file, body, names);
        }
        ExprKind::Opaque => {
            let text = file.snippet(expr.pos, expr.end);
            names.extend(identifier_words(text).into_iter().map(str::to_string));
        }
        ExprKind::Number(_) | ExprKind::String(_) | ExprKind::Bool(_) | ExprKind::Null => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::binder::SymbolTable;
    use strata_common::FilePath;

    fn emit(sources: &[(&str, &str)], resolutions: &[(&str, &str, &str)], target: &str, format: ModuleFormat) -> String {
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
        emit_javascript(&checker, file, format, "/out/x.js", &MapOutput::None).text
    }

    #[test]
    fn strips_types_and_elides_type_only_imports() {
        let js = emit(
            &[
                ("/a.ts", "export interface Shape { w: number }\nexport const area = (s: Shape): number => s.w * 2;"),
                (
                    "/b.ts",
                    "import { Shape, area } from './a';\nimport type { Other } from './a';\ntype Alias = Shape;\nexport function double(s: Shape, k: number = 2): number {\n  const r: number = area(s) as number;\n  return r * k;\n}",
                ),
            ],
            &[("/b.ts", "./a", "/a.ts")],
            "/b.ts",
            ModuleFormat::EsModule,
        );
        assert!(js.starts_with("import { area } from './a';\n"), "{js}");
        assert!(!js.contains("Other") && !js.contains("Alias"));
        assert!(js.contains("export function double(s, k = 2) {\n    const r = area(s);\n    return r * k;\n}\n"), "{js}");
    }

    #[test]
    fn lowers_enums_and_inlines_const_enums() {
        let js = emit(
            &[(
                "/e.ts",
                "export enum Color { Red, Green = 4, Name = 'n' }\nconst enum Flag { On = 1 << 1 }\nexport const f = Flag.On;\ndeclare enum Ambient { X }",
            )],
            &[],
            "/e.ts",
            ModuleFormat::EsModule,
        );
        let expected = "export var Color;\n(function (Color) {\n    Color[Color[\"Red\"] = 0] = \"Red\";\n    Color[Color[\"Green\"] = 4] = \"Green\";\n    Color[\"Name\"] = \"n\";\n})(Color || (Color = {}));\nexport const f = 2 /* Flag.On */;\n";
        assert_eq!(js, expected);
    }

    #[test]
    fn commonjs_output() {
        let js = emit(
            &[
                ("/a.ts", "export const one = 1;\nexport function add(x: number) { return x + one; }"),
                ("/b.ts", "import { add } from './a';\nimport * as all from './a';\nexport const two = add(1) + all.one;\nexport { add as plus };\nexport * from './a';"),
            ],
            &[("/b.ts", "./a", "/a.ts")],
            "/b.ts",
            ModuleFormat::CommonJs,
        );
        let expected = "\"use strict\";\nObject.defineProperty(exports, \"__esModule\", { value: true });\nconst a_1 = require('./a');\nconst all = require('./a');\nconst two = a_1.add(1) + all.one;\nexports.two = two;\nexports.plus = a_1.add;\nObject.assign(exports, require('./a'));\n";
        assert_eq!(js, expected);
    }

    #[test]
    fn modules_without_runtime_code_stay_modules() {
        let js = emit(&[("/t.ts", "export interface I {}\nexport type T = I;")], &[], "/t.ts", ModuleFormat::EsModule);
        assert_eq!(js, "export {};\n");
    }

    #[test]
    fn scripts_keep_opaque_statements() {
        let js = emit(&[("/s.ts", "var total = 0;\nfor (let i = 0; i < 3; i++) { total += i; }")], &[], "/s.ts", ModuleFormat::CommonJs);
        assert_eq!(js, "var total = 0;\nfor (let i = 0; i < 3; i++) { total += i; }\n");
    }
}
