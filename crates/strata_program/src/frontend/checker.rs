//! Type inference and semantic checks over bound files.
//!
//! A [`Checker`] caches symbol types for its own lifetime. Programs create
//! one per worker so files can be checked in parallel without sharing the
//! caches.

use super::ast::*;
use super::binder::{Declaration, ModuleKey, SymbolId, SymbolTable};
use super::types::{FunctionParam, NamedType, Type};
use crate::program::SymbolFlags;
use crate::source_file::SourceFile;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use strata_common::FilePath;
use strata_diagnostics::{messages, Diagnostic};

/// Names that are always in scope in expressions.
const INTRINSIC_VALUES: &[&str] = &["undefined", "this", "arguments", "globalThis", "super", "require", "exports", "module"];

/// Value and type bindings introduced by functions and arrow functions.
#[derive(Default)]
pub struct LocalScope<'p> {
    parent: Option<&'p LocalScope<'p>>,
    values: HashMap<String, Type>,
    types: HashSet<String>,
}

impl LocalScope<'_> {
    /// Creates a scope nested in `self`.
    pub fn child(&self) -> LocalScope<'_> {
        LocalScope {
            parent: Some(self),
            values: HashMap::new(),
            types: HashSet::new(),
        }
    }

    fn value(&self, name: &str) -> Option<&Type> {
        self.values
            .get(name)
            .or_else(|| self.parent.and_then(|parent| parent.value(name)))
    }

    fn has_type(&self, name: &str) -> bool {
        self.types.contains(name) || self.parent.is_some_and(|parent| parent.has_type(name))
    }

    fn declare_type_parameters(&mut self, text: Option<&str>) {
        for name in type_parameter_names(text) {
            self.types.insert(name);
        }
    }
}

/// Extracts the declared names from `<T, U extends X = Y>`.
pub fn type_parameter_names(text: Option<&str>) -> Vec<String> {
    let Some(text) = text else {
        return Vec::new();
    };
    let inner = text.trim().trim_start_matches('<').trim_end_matches('>');
    let mut names = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    let bytes = inner.as_bytes();
    for i in 0..=bytes.len() {
        let at_end = i == bytes.len();
        if !at_end {
            match bytes[i] {
                b'<' | b'(' | b'{' | b'[' => depth += 1,
                b'>' | b')' | b'}' | b']' => depth -= 1,
                _ => {}
            }
        }
        if at_end || (bytes[i] == b',' && depth == 0) {
            let part = inner[start..i].trim();
            let name: String = part
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
                .collect();
            if !name.is_empty() {
                names.push(name);
            }
            start = i + 1;
        }
    }
    names
}

/// A constant enum member value.
#[derive(Clone, Debug, PartialEq)]
pub enum EnumValue {
    /// A numeric value, printed in its canonical form.
    Number(String),
    /// A string value.
    String(String),
    /// A value only known at run time; holds the initializer as written.
    Computed(String),
}

/// Computes member values of an enum declared in `text`.
pub fn evaluate_enum(decl: &EnumDeclaration, text: &str) -> Vec<(String, EnumValue)> {
    let mut values: Vec<(String, EnumValue)> = Vec::new();
    let mut next: Option<f64> = Some(0.0);
    for member in &decl.members {
        let value = match &member.initializer {
            Some(initializer) => match constant_number(initializer, &values) {
                Some(number) => EnumValue::Number(format_number(number)),
                None => match &initializer.kind {
                    ExprKind::String(value) => EnumValue::String(value.clone()),
                    _ => EnumValue::Computed(text[initializer.pos as usize..initializer.end as usize].to_string()),
                },
            },
            None => match next {
                Some(number) => EnumValue::Number(format_number(number)),
                None => EnumValue::Computed("undefined".to_string()),
            },
        };
        next = match &value {
            EnumValue::Number(number) => number.parse::<f64>().ok().map(|n| n + 1.0),
            _ => None,
        };
        values.push((member.name.text.clone(), value));
    }
    values
}

fn constant_number(expr: &Expr, previous: &[(String, EnumValue)]) -> Option<f64> {
    match &expr.kind {
        ExprKind::Number(text) => parse_number(text),
        ExprKind::Paren(inner) => constant_number(inner, previous),
        ExprKind::Identifier(name) => previous.iter().find_map(|(member, value)| match value {
            EnumValue::Number(number) if member == name => number.parse().ok(),
            _ => None,
        }),
        ExprKind::Unary { op, operand } => {
            let value = constant_number(operand, previous)?;
            match op.as_str() {
                "-" => Some(-value),
                "+" => Some(value),
                "~" => Some(!(value as i32) as f64),
                _ => None,
            }
        }
        ExprKind::Binary { op, left, right } => {
            let l = constant_number(left, previous)?;
            let r = constant_number(right, previous)?;
            Some(match op.as_str() {
                "+" => l + r,
                "-" => l - r,
                "*" => l * r,
                "/" => l / r,
                "%" => l % r,
                "|" => ((l as i32) | (r as i32)) as f64,
                "&" => ((l as i32) & (r as i32)) as f64,
                "^" => ((l as i32) ^ (r as i32)) as f64,
                "<<" => ((l as i32) << ((r as u32) & 31)) as f64,
                ">>" => ((l as i32) >> ((r as u32) & 31)) as f64,
                _ => return None,
            })
        }
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let cleaned = text.replace('_', "");
    let lower = cleaned.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        return u64::from_str_radix(hex, 16).ok().map(|n| n as f64);
    }
    if let Some(octal) = lower.strip_prefix("0o") {
        return u64::from_str_radix(octal, 8).ok().map(|n| n as f64);
    }
    if let Some(binary) = lower.strip_prefix("0b") {
        return u64::from_str_radix(binary, 2).ok().map(|n| n as f64);
    }
    lower.parse().ok()
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Type queries and per-file checks over one bound program.
pub struct Checker<'a> {
    table: &'a SymbolTable,
    files: &'a [SourceFile],
    index: &'a HashMap<FilePath, usize>,
    strict: bool,
    value_types: RefCell<HashMap<SymbolId, Type>>,
    declared_types: RefCell<HashMap<SymbolId, Type>>,
    resolving: RefCell<HashSet<(SymbolId, bool)>>,
}

impl<'a> Checker<'a> {
    /// Creates a checker over bound `files`.
    pub fn new(
        table: &'a SymbolTable,
        files: &'a [SourceFile],
        index: &'a HashMap<FilePath, usize>,
        strict: bool,
    ) -> Self {
        Self {
            table,
            files,
            index,
            strict,
            value_types: RefCell::new(HashMap::new()),
            declared_types: RefCell::new(HashMap::new()),
            resolving: RefCell::new(HashSet::new()),
        }
    }

    /// The symbol table this checker reads.
    pub fn table(&self) -> &'a SymbolTable {
        self.table
    }

    /// Looks up a bound file.
    pub fn source_file(&self, path: &FilePath) -> Option<&'a SourceFile> {
        self.index.get(path).map(|&i| &self.files[i])
    }

    /// The scope top-level names of `file` are looked up in.
    pub fn module_of(file: &SourceFile) -> Option<ModuleKey> {
        file.is_external_module()
            .then(|| ModuleKey::File(file.path().clone()))
    }

    fn with_guard(&self, id: SymbolId, as_type: bool, compute: impl FnOnce() -> Type) -> Type {
        if !self.resolving.borrow_mut().insert((id, as_type)) {
            return Type::Any;
        }
        let ty = compute();
        self.resolving.borrow_mut().remove(&(id, as_type));
        ty
    }

    /// The type of a symbol used as a value.
    pub fn symbol_value_type(&self, id: SymbolId) -> Type {
        if let Some(ty) = self.value_types.borrow().get(&id) {
            return ty.clone();
        }
        let ty = self.with_guard(id, false, || self.compute_value_type(id));
        self.value_types.borrow_mut().insert(id, ty.clone());
        ty
    }

    fn compute_value_type(&self, id: SymbolId) -> Type {
        let symbol = self.table.symbol(id);
        if symbol.flags.contains(SymbolFlags::ALIAS) {
            if let Some(module) = self.table.namespace_target(id) {
                return Type::Literal(match module {
                    ModuleKey::File(path) => format!("typeof import(\"{}\")", path.as_str()),
                    ModuleKey::Ambient(name) => format!("typeof import(\"{name}\")"),
                });
            }
            return match self.table.resolve_alias(id) {
                Some(target) if target != id => self.symbol_value_type(target),
                _ => Type::Any,
            };
        }
        let Some(file) = self.source_file(&symbol.file) else {
            return Type::Any;
        };
        let module = symbol.module.as_ref();
        let root = LocalScope::default();
        for declaration in &symbol.declarations {
            match declaration {
                Declaration::Variable { kind, decl, .. } => {
                    if let Some(ty) = &decl.ty {
                        return self.type_from_node(ty, file, module, &root);
                    }
                    return match &decl.initializer {
                        Some(initializer) => {
                            let ty = self.infer_expr(initializer, file, module, &root);
                            if *kind == VarKind::Const {
                                ty
                            } else {
                                ty.widen()
                            }
                        }
                        None => Type::Any,
                    };
                }
                Declaration::Function(function) => {
                    return self.function_type(function, file, module, &root);
                }
                Declaration::Enum(decl) => return Type::Literal(format!("typeof {}", decl.name.text)),
                _ => {}
            }
        }
        Type::Any
    }

    /// The type a symbol denotes in a type position.
    pub fn symbol_declared_type(&self, id: SymbolId) -> Type {
        if let Some(ty) = self.declared_types.borrow().get(&id) {
            return ty.clone();
        }
        let ty = self.with_guard(id, true, || self.compute_declared_type(id));
        self.declared_types.borrow_mut().insert(id, ty.clone());
        ty
    }

    fn compute_declared_type(&self, id: SymbolId) -> Type {
        let symbol = self.table.symbol(id);
        if symbol.flags.contains(SymbolFlags::ALIAS) {
            return match self.table.resolve_alias(id) {
                Some(target) if target != id => self.symbol_declared_type(target),
                _ => Type::Any,
            };
        }
        if symbol
            .flags
            .intersects(SymbolFlags::INTERFACE | SymbolFlags::ENUM | SymbolFlags::CONST_ENUM)
        {
            return Type::Named(NamedType {
                name: symbol.name.clone(),
                module: match &symbol.module {
                    Some(ModuleKey::File(path)) => Some(path.clone()),
                    _ => None,
                },
                exported: symbol.exported,
                type_arguments: Vec::new(),
            });
        }
        for declaration in &symbol.declarations {
            if let Declaration::TypeAlias(alias) = declaration {
                let Some(file) = self.source_file(&symbol.file) else {
                    return Type::Any;
                };
                let mut scope = LocalScope::default();
                scope.declare_type_parameters(alias.type_parameters.as_deref());
                return self.type_from_node(&alias.ty, file, symbol.module.as_ref(), &scope);
            }
        }
        Type::Any
    }

    /// Converts an annotation into a type.
    pub fn type_from_node(
        &self,
        node: &TypeNode,
        file: &SourceFile,
        module: Option<&ModuleKey>,
        scope: &LocalScope<'_>,
    ) -> Type {
        match &node.kind {
            TypeNodeKind::Keyword(keyword) => Type::from_keyword(keyword).unwrap_or(Type::Any),
            TypeNodeKind::NumberLiteral(value) => Type::NumberLiteral(value.clone()),
            TypeNodeKind::StringLiteral(value) => Type::StringLiteral(value.clone()),
            TypeNodeKind::BooleanLiteral(value) => Type::BooleanLiteral(*value),
            TypeNodeKind::Array(element) => {
                Type::Array(Box::new(self.type_from_node(element, file, module, scope)))
            }
            TypeNodeKind::Union(members) => Type::union(
                members
                    .iter()
                    .map(|member| self.type_from_node(member, file, module, scope)),
            ),
            TypeNodeKind::Literal(text) => Type::Literal(text.clone()),
            TypeNodeKind::Reference {
                name,
                type_arguments,
            } => {
                let arguments: Vec<Type> = type_arguments
                    .iter()
                    .map(|argument| self.type_from_node(argument, file, module, scope))
                    .collect();
                if name.contains('.') || scope.has_type(name) {
                    return Type::Literal(file.snippet(node.pos, node.end).to_string());
                }
                if (name == "Array" || name == "ReadonlyArray") && arguments.len() == 1 {
                    return Type::Array(Box::new(arguments.into_iter().next().unwrap_or(Type::Any)));
                }
                match self.table.lookup(module, name) {
                    Some(id) => match self.symbol_declared_type(id) {
                        Type::Named(mut named) => {
                            named.type_arguments = arguments;
                            Type::Named(named)
                        }
                        other => other,
                    },
                    None => Type::Any,
                }
            }
        }
    }

    fn function_type(
        &self,
        function: &FunctionDeclaration,
        file: &SourceFile,
        module: Option<&ModuleKey>,
        scope: &LocalScope<'_>,
    ) -> Type {
        let mut inner = scope.child();
        inner.declare_type_parameters(function.type_parameters.as_deref());
        let params = self.params_of(&function.params, file, module, &mut inner);
        let ret = match (&function.return_type, &function.body) {
            (Some(ty), _) => self.type_from_node(ty, file, module, &inner),
            (None, Some(body)) => self.infer_body_return(body, file, module, &inner),
            (None, None) => Type::Any,
        };
        Type::Function {
            params,
            ret: Box::new(ret),
        }
    }

    fn params_of(
        &self,
        params: &[Param],
        file: &SourceFile,
        module: Option<&ModuleKey>,
        scope: &mut LocalScope<'_>,
    ) -> Vec<FunctionParam> {
        let mut out = Vec::new();
        for param in params {
            let ty = match (&param.ty, &param.initializer) {
                (Some(ty), _) => self.type_from_node(ty, file, module, scope),
                (None, Some(initializer)) => self.infer_expr(initializer, file, module, scope).widen(),
                (None, None) if param.rest => Type::Array(Box::new(Type::Any)),
                (None, None) => Type::Any,
            };
            scope.values.insert(param.name.text.clone(), ty.clone());
            out.push(FunctionParam {
                name: param.name.text.clone(),
                ty,
                optional: param.optional || param.initializer.is_some(),
                rest: param.rest,
            });
        }
        out
    }

    /// Infers a function's return type from the first top-level `return`.
    fn infer_body_return(
        &self,
        body: &[Statement],
        file: &SourceFile,
        module: Option<&ModuleKey>,
        scope: &LocalScope<'_>,
    ) -> Type {
        let mut locals = scope.child();
        for statement in body {
            match &statement.kind {
                StatementKind::Variable(variable) => {
                    for decl in &variable.declarations {
                        let ty = self.local_variable_type(variable.kind, decl, file, module, &locals);
                        locals.values.insert(decl.name.text.clone(), ty);
                    }
                }
                StatementKind::Function(function) => {
                    let ty = self.function_type(function, file, module, &locals);
                    locals.values.insert(function.name.text.clone(), ty);
                }
                StatementKind::Return(Some(expr)) => {
                    return self.infer_expr(expr, file, module, &locals).widen();
                }
                StatementKind::Return(None) => return Type::Void,
                _ => {}
            }
        }
        Type::Void
    }

    fn local_variable_type(
        &self,
        kind: VarKind,
        decl: &VariableDeclaration,
        file: &SourceFile,
        module: Option<&ModuleKey>,
        scope: &LocalScope<'_>,
    ) -> Type {
        match (&decl.ty, &decl.initializer) {
            (Some(ty), _) => self.type_from_node(ty, file, module, scope),
            (None, Some(initializer)) => {
                let ty = self.infer_expr(initializer, file, module, scope);
                if kind == VarKind::Const {
                    ty
                } else {
                    ty.widen()
                }
            }
            (None, None) => Type::Any,
        }
    }

    fn lookup_symbol(&self, module: Option<&ModuleKey>, name: &str) -> Option<SymbolId> {
        self.table.lookup(module, name)
    }

    /// Resolves an identifier to the enum it names, following aliases.
    pub fn enum_symbol(&self, name: &str, module: Option<&ModuleKey>) -> Option<SymbolId> {
        let id = self.lookup_symbol(module, name)?;
        let target = self.table.resolve_alias(id)?;
        self.table
            .symbol(target)
            .flags
            .intersects(SymbolFlags::ENUM | SymbolFlags::CONST_ENUM)
            .then_some(target)
    }

    /// Infers the (unwidened) type of an expression.
    pub fn infer_expr(
        &self,
        expr: &Expr,
        file: &SourceFile,
        module: Option<&ModuleKey>,
        scope: &LocalScope<'_>,
    ) -> Type {
        match &expr.kind {
            ExprKind::Number(text) => Type::NumberLiteral(text.clone()),
            ExprKind::String(text) => Type::StringLiteral(text.clone()),
            ExprKind::Bool(value) => Type::BooleanLiteral(*value),
            ExprKind::Null => Type::Null,
            ExprKind::Identifier(name) => {
                if name == "undefined" {
                    return Type::Undefined;
                }
                if let Some(ty) = scope.value(name) {
                    return ty.clone();
                }
                match self.lookup_symbol(module, name) {
                    Some(id) => self.symbol_value_type(id),
                    None => Type::Any,
                }
            }
            ExprKind::Member { object, name } => {
                if let ExprKind::Identifier(object_name) = &object.kind {
                    if scope.value(object_name).is_none() {
                        if let Some(ty) = self.member_of_symbol(object_name, &name.text, module) {
                            return ty;
                        }
                    }
                }
                match (self.infer_expr(object, file, module, scope).widen(), name.text.as_str()) {
                    (Type::Array(_) | Type::String, "length") => Type::Number,
                    _ => Type::Any,
                }
            }
            ExprKind::Index { object, .. } => match self.infer_expr(object, file, module, scope) {
                Type::Array(element) => *element,
                _ => Type::Any,
            },
            ExprKind::Call { callee, .. } => match self.infer_expr(callee, file, module, scope) {
                Type::Function { ret, .. } => *ret,
                _ => Type::Any,
            },
            ExprKind::New { .. } | ExprKind::Opaque => Type::Any,
            ExprKind::Unary { op, operand } => match op.as_str() {
                "!" => Type::Boolean,
                "typeof" => Type::String,
                "void" => Type::Undefined,
                "-" => match self.infer_expr(operand, file, module, scope) {
                    Type::NumberLiteral(value) if !value.starts_with('-') => {
                        Type::NumberLiteral(format!("-{value}"))
                    }
                    _ => Type::Number,
                },
                "+" | "~" | "++" | "--" => Type::Number,
                _ => Type::Any,
            },
            ExprKind::Binary { op, left, right } => {
                let l = self.infer_expr(left, file, module, scope).widen();
                let r = self.infer_expr(right, file, module, scope).widen();
                match op.as_str() {
                    "+" => {
                        if l == Type::String || r == Type::String {
                            Type::String
                        } else if l == Type::Number && r == Type::Number {
                            Type::Number
                        } else {
                            Type::Any
                        }
                    }
                    "-" | "*" | "/" | "%" | "**" | "&" | "|" | "^" | "<<" | ">>" | ">>>" => Type::Number,
                    "<" | ">" | "<=" | ">=" | "==" | "!=" | "===" | "!==" | "in" | "instanceof" => {
                        Type::Boolean
                    }
                    "&&" | "||" | "??" => Type::union([l, r]),
                    "=" => self.infer_expr(right, file, module, scope),
                    _ => l,
                }
            }
            ExprKind::Conditional {
                when_true,
                when_false,
                ..
            } => Type::union([
                self.infer_expr(when_true, file, module, scope),
                self.infer_expr(when_false, file, module, scope),
            ]),
            ExprKind::Paren(inner) => self.infer_expr(inner, file, module, scope),
            ExprKind::Array(elements) => {
                if elements.is_empty() {
                    return Type::Array(Box::new(Type::Any));
                }
                Type::Array(Box::new(Type::union(
                    elements
                        .iter()
                        .map(|element| self.infer_expr(element, file, module, scope).widen()),
                )))
            }
            ExprKind::Object(properties) => {
                if properties.is_empty() {
                    return Type::Literal("{}".to_string());
                }
                let members: Vec<String> = properties
                    .iter()
                    .map(|(name, value)| {
                        let ty = self.infer_expr(value, file, module, scope).widen();
                        format!("{}: {};", name.text, ty.display_in(Some(file.path())))
                    })
                    .collect();
                Type::Literal(format!("{{ {} }}", members.join(" ")))
            }
            ExprKind::Arrow {
                params,
                return_type,
                body,
            } => {
                let mut inner = scope.child();
                let params = self.params_of(params, file, module, &mut inner);
                let ret = match return_type {
                    Some(ty) => self.type_from_node(ty, file, module, &inner),
                    None => self.infer_expr(body, file, module, &inner).widen(),
                };
                Type::Function {
                    params,
                    ret: Box::new(ret),
                }
            }
            ExprKind::As { ty, .. } => self.type_from_node(ty, file, module, scope),
        }
    }

    fn member_of_symbol(&self, object: &str, member: &str, module: Option<&ModuleKey>) -> Option<Type> {
        let id = self.lookup_symbol(module, object)?;
        if let Some(target_module) = self.table.namespace_target(id) {
            let export = self.table.resolve_export(target_module, member)?;
            return Some(self.symbol_value_type(export));
        }
        let target = self.enum_symbol(object, module)?;
        Some(self.symbol_declared_type(target))
    }

    /// Semantic errors of `file`.
    pub fn check_source_file(&self, file: &SourceFile) -> Vec<Diagnostic> {
        if file.is_json_file() {
            return Vec::new();
        }
        let mut check = FileCheck {
            checker: self,
            file,
            diagnostics: Vec::new(),
        };
        let module = Self::module_of(file);
        let root = LocalScope::default();
        check.check_statements(file.statements(), module.as_ref(), &root, None);
        check.diagnostics
    }

    /// Errors that prevent writing a faithful declaration file for `file`.
    pub fn declaration_diagnostics(&self, file: &SourceFile) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let Some(module) = Self::module_of(file) else {
            return diagnostics;
        };
        if file.is_declaration_file() || file.is_json_file() {
            return diagnostics;
        }
        for statement in file.statements() {
            let StatementKind::Variable(variable) = &statement.kind else {
                continue;
            };
            if !variable.modifiers.export {
                continue;
            }
            for decl in &variable.declarations {
                if decl.ty.is_some() {
                    continue;
                }
                let Some(id) = self.table.lookup(Some(&module), &decl.name.text) else {
                    continue;
                };
                let mut private_name = None;
                self.symbol_value_type(id).for_each_named(&mut |named| {
                    let foreign = named.module.as_ref().is_some_and(|m| m != file.path());
                    if foreign && !named.exported && private_name.is_none() {
                        private_name = Some(named.name.clone());
                    }
                });
                if let Some(name) = private_name {
                    diagnostics.push(Diagnostic::at(
                        file.path(),
                        decl.name.pos,
                        decl.name.end,
                        &messages::EXPORTED_VARIABLE_USES_PRIVATE_NAME,
                        &[&decl.name.text, &name],
                    ));
                }
            }
        }
        diagnostics
    }
}

struct FileCheck<'c, 'a> {
    checker: &'c Checker<'a>,
    file: &'c SourceFile,
    diagnostics: Vec<Diagnostic>,
}

impl FileCheck<'_, '_> {
    fn report(&mut self, pos: u32, end: u32, message: &strata_diagnostics::DiagnosticMessage, args: &[&str]) {
        self.diagnostics
            .push(Diagnostic::at(self.file.path(), pos, end, message, args));
    }

    fn check_statements(
        &mut self,
        statements: &[Statement],
        module: Option<&ModuleKey>,
        scope: &LocalScope<'_>,
        expected_return: Option<&Type>,
    ) {
        let mut locals = scope.child();
        for statement in statements {
            match &statement.kind {
                StatementKind::Import(import) => self.check_import(import),
                StatementKind::Export(export) => self.check_export(export, module),
                StatementKind::Variable(variable) => {
                    let ambient = variable.modifiers.declare || self.file.is_declaration_file();
                    for decl in &variable.declarations {
                        self.check_variable(variable.kind, decl, ambient, module, &mut locals);
                    }
                }
                StatementKind::Function(function) => {
                    self.check_function(function, module, &locals);
                    let ty = self.checker.function_type(function, self.file, module, &locals);
                    locals.values.insert(function.name.text.clone(), ty);
                }
                StatementKind::TypeAlias(alias) => {
                    let mut inner = locals.child();
                    inner.declare_type_parameters(alias.type_parameters.as_deref());
                    self.check_type_node(&alias.ty, module, &inner);
                }
                StatementKind::Enum(decl) => {
                    let mut inner = locals.child();
                    for member in &decl.members {
                        if let Some(initializer) = &member.initializer {
                            self.check_expr(initializer, module, &inner);
                        }
                        inner.values.insert(member.name.text.clone(), Type::Number);
                    }
                }
                StatementKind::GlobalAugmentation(body) => {
                    self.check_statements(body, module, &locals, None);
                }
                StatementKind::AmbientModule(ambient) => {
                    let key = self
                        .checker
                        .table
                        .resolve_module(self.file.path(), &ambient.name.text)
                        .cloned()
                        .unwrap_or_else(|| ModuleKey::Ambient(ambient.name.text.clone()));
                    self.check_statements(&ambient.body, Some(&key), &locals, None);
                }
                StatementKind::Return(Some(expr)) => {
                    self.check_expr(expr, module, &locals);
                    if let Some(expected) = expected_return {
                        let actual = self.checker.infer_expr(expr, self.file, module, &locals);
                        self.check_assignable(&actual, expected, expr.pos, expr.end);
                    }
                }
                StatementKind::Expression(expr) => self.check_expr(expr, module, &locals),
                StatementKind::Interface(_) | StatementKind::Return(None) | StatementKind::Opaque => {}
            }
        }
    }

    fn check_assignable(&mut self, source: &Type, target: &Type, pos: u32, end: u32) {
        if source.is_assignable_to(target) {
            return;
        }
        let shown = if target.has_literal() {
            source.clone()
        } else {
            source.widen()
        };
        let from = Some(self.file.path());
        self.report(
            pos,
            end,
            &messages::TYPE_NOT_ASSIGNABLE,
            &[&shown.display_in(from), &target.display_in(from)],
        );
    }

    fn check_import(&mut self, import: &ImportDeclaration) {
        let Some(target) = self.resolve_specifier(&import.module) else {
            return;
        };
        for specifier in &import.named {
            if self
                .checker
                .table
                .resolve_export(&target, &specifier.imported.text)
                .is_none()
            {
                self.report(
                    specifier.imported.pos,
                    specifier.imported.end,
                    &messages::MODULE_HAS_NO_EXPORTED_MEMBER,
                    &[&import.module.text, &specifier.imported.text],
                );
            }
        }
    }

    fn resolve_specifier(&mut self, specifier: &StringLit) -> Option<ModuleKey> {
        match self.checker.table.resolve_module(self.file.path(), &specifier.text) {
            Some(key) => Some(key.clone()),
            None => {
                self.report(
                    specifier.pos,
                    specifier.end,
                    &messages::CANNOT_FIND_MODULE,
                    &[&specifier.text],
                );
                None
            }
        }
    }

    fn check_export(&mut self, export: &ExportDeclaration, module: Option<&ModuleKey>) {
        match &export.module {
            Some(specifier) => {
                let Some(target) = self.resolve_specifier(specifier) else {
                    return;
                };
                for export_specifier in export.specifiers.iter().flatten() {
                    let name = &export_specifier.local;
                    if self.checker.table.resolve_export(&target, &name.text).is_none() {
                        self.report(
                            name.pos,
                            name.end,
                            &messages::MODULE_HAS_NO_EXPORTED_MEMBER,
                            &[&specifier.text, &name.text],
                        );
                    }
                }
            }
            None => {
                for export_specifier in export.specifiers.iter().flatten() {
                    let name = &export_specifier.local;
                    if self.checker.lookup_symbol(module, &name.text).is_none() {
                        self.report(name.pos, name.end, &messages::CANNOT_FIND_NAME, &[&name.text]);
                    }
                }
            }
        }
    }

    fn check_variable(
        &mut self,
        kind: VarKind,
        decl: &VariableDeclaration,
        ambient: bool,
        module: Option<&ModuleKey>,
        locals: &mut LocalScope<'_>,
    ) {
        if let Some(ty) = &decl.ty {
            self.check_type_node(ty, module, locals);
        }
        if let Some(initializer) = &decl.initializer {
            self.check_expr(initializer, module, locals);
            if let Some(ty) = &decl.ty {
                let target = self.checker.type_from_node(ty, self.file, module, locals);
                let source = self.checker.infer_expr(initializer, self.file, module, locals);
                self.check_assignable(&source, &target, decl.name.pos, decl.name.end);
            }
        }
        if decl.ty.is_none() && decl.initializer.is_none() && ambient && self.checker.strict {
            self.report(
                decl.name.pos,
                decl.name.end,
                &messages::IMPLICIT_ANY,
                &[&decl.name.text, "any"],
            );
        }
        let ty = self.checker.local_variable_type(kind, decl, self.file, module, locals);
        locals.values.insert(decl.name.text.clone(), ty);
    }

    fn check_function(&mut self, function: &FunctionDeclaration, module: Option<&ModuleKey>, scope: &LocalScope<'_>) {
        let mut inner = scope.child();
        inner.declare_type_parameters(function.type_parameters.as_deref());
        for param in &function.params {
            if let Some(ty) = &param.ty {
                self.check_type_node(ty, module, &inner);
            }
            if let Some(initializer) = &param.initializer {
                self.check_expr(initializer, module, &inner);
            }
        }
        if let Some(ty) = &function.return_type {
            self.check_type_node(ty, module, &inner);
        }
        self.checker.params_of(&function.params, self.file, module, &mut inner);
        if let Some(body) = &function.body {
            let expected = function
                .return_type
                .as_ref()
                .map(|ty| self.checker.type_from_node(ty, self.file, module, &inner));
            self.check_statements(body, module, &inner, expected.as_ref());
        }
    }

    fn check_type_node(&mut self, node: &TypeNode, module: Option<&ModuleKey>, scope: &LocalScope<'_>) {
        match &node.kind {
            TypeNodeKind::Reference {
                name,
                type_arguments,
            } => {
                let first = name.split('.').next().unwrap_or(name);
                if !scope.has_type(first) && self.checker.lookup_symbol(module, first).is_none() {
                    self.report(node.pos, node.pos + first.len() as u32, &messages::CANNOT_FIND_NAME, &[first]);
                }
                for argument in type_arguments {
                    self.check_type_node(argument, module, scope);
                }
            }
            TypeNodeKind::Array(element) => self.check_type_node(element, module, scope),
            TypeNodeKind::Union(members) => {
                for member in members {
                    self.check_type_node(member, module, scope);
                }
            }
            _ => {}
        }
    }

    fn check_expr(&mut self, expr: &Expr, module: Option<&ModuleKey>, scope: &LocalScope<'_>) {
        match &expr.kind {
            ExprKind::Identifier(name) => {
                if !INTRINSIC_VALUES.contains(&name.as_str())
                    && scope.value(name).is_none()
                    && self.checker.lookup_symbol(module, name).is_none()
                {
                    self.report(expr.pos, expr.end, &messages::CANNOT_FIND_NAME, &[name]);
                }
            }
            ExprKind::Member { object, .. } => self.check_expr(object, module, scope),
            ExprKind::Index { object, index } => {
                self.check_expr(object, module, scope);
                self.check_expr(index, module, scope);
            }
            ExprKind::Call { callee, arguments } | ExprKind::New { callee, arguments } => {
                self.check_expr(callee, module, scope);
                for argument in arguments {
                    self.check_expr(argument, module, scope);
                }
            }
            ExprKind::Unary { operand, .. } => self.check_expr(operand, module, scope),
            ExprKind::Binary { left, right, .. } => {
                self.check_expr(left, module, scope);
                self.check_expr(right, module, scope);
            }
            ExprKind::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                self.check_expr(condition, module, scope);
                self.check_expr(when_true, module, scope);
                self.check_expr(when_false, module, scope);
            }
            ExprKind::Paren(inner) => self.check_expr(inner, module, scope),
            ExprKind::Array(elements) => {
                for element in elements {
                    self.check_expr(element, module, scope);
                }
            }
            ExprKind::Object(properties) => {
                for (_, value) in properties {
                    self.check_expr(value, module, scope);
                }
            }
            ExprKind::Arrow {
                params,
                return_type,
                body,
            } => {
                let mut inner = scope.child();
                for param in params {
                    if let Some(ty) = &param.ty {
                        self.check_type_node(ty, module, &inner);
                    }
                    if let Some(initializer) = &param.initializer {
                        self.check_expr(initializer, module, &inner);
                    }
                }
                self.checker.params_of(params, self.file, module, &mut inner);
                self.check_expr(body, module, &inner);
                if let Some(ty) = return_type {
                    self.check_type_node(ty, module, &inner);
                    if !matches!(body.kind, ExprKind::Opaque) {
                        let expected = self.checker.type_from_node(ty, self.file, module, &inner);
                        let actual = self.checker.infer_expr(body, self.file, module, &inner);
                        self.check_assignable(&actual, &expected, body.pos, body.end);
                    }
                }
            }
            ExprKind::As { expr, ty } => {
                self.check_expr(expr, module, scope);
                self.check_type_node(ty, module, scope);
            }
            ExprKind::Number(_) | ExprKind::String(_) | ExprKind::Bool(_) | ExprKind::Null | ExprKind::Opaque => {}
        }
    }
}
