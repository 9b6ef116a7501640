//! Symbol tables: module scopes, globals, and alias resolution.

use super::ast::*;
use crate::program::SymbolFlags;
use crate::source_file::SourceFile;
use std::collections::{BTreeMap, HashMap, HashSet};
use strata_common::FilePath;
use strata_diagnostics::{messages, Diagnostic};

/// Index of a symbol in [`SymbolTable::symbols`].
pub type SymbolId = usize;

/// Identity of a module scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleKey {
    /// A module source file.
    File(FilePath),
    /// A `declare module "name"` block.
    Ambient(String),
}

/// Which binding of the target module an import refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportedName {
    /// `import { name }`
    Named(String),
    /// `import name`
    Default,
    /// `import * as name`
    Namespace,
}

/// One declaration contributing to a symbol.
#[derive(Clone, Debug)]
pub enum Declaration {
    /// A variable.
    Variable {
        /// `const`, `let`, or `var`.
        kind: VarKind,
        /// The declaration node.
        decl: VariableDeclaration,
        /// Declared with `declare` or in a declaration file.
        ambient: bool,
    },
    /// A function.
    Function(FunctionDeclaration),
    /// An interface.
    Interface,
    /// A type alias.
    TypeAlias(TypeAliasDeclaration),
    /// An enum.
    Enum(EnumDeclaration),
    /// An import binding.
    Import {
        /// The module specifier.
        module: String,
        /// The imported binding.
        name: ImportedName,
    },
    /// An export specifier, optionally re-exporting from another module.
    Reexport {
        /// The source module; `None` for local exports.
        module: Option<String>,
        /// The referenced name.
        name: String,
    },
}

/// A named entity.
#[derive(Clone, Debug)]
pub struct Symbol {
    /// The declared name.
    pub name: String,
    /// Merged declaration kinds.
    pub flags: SymbolFlags,
    /// The file of the first declaration.
    pub file: FilePath,
    /// The scope the symbol belongs to; `None` for globals.
    pub module: Option<ModuleKey>,
    /// Name range of the first declaration.
    pub pos: u32,
    /// Name range end of the first declaration.
    pub end: u32,
    /// All declarations, in binding order.
    pub declarations: Vec<Declaration>,
    /// Visible to importers of the owning module.
    pub exported: bool,
}

/// The bindings of one module.
#[derive(Clone, Debug, Default)]
pub struct ModuleScope {
    /// Every top-level name, including imports.
    pub locals: HashMap<String, SymbolId>,
    /// Exported names.
    pub exports: BTreeMap<String, SymbolId>,
    /// `export * from` specifiers.
    pub export_stars: Vec<String>,
    /// Files contributing declarations (several for merged ambient modules).
    pub files: Vec<FilePath>,
}

/// All symbols of a program.
#[derive(Default)]
pub struct SymbolTable {
    /// The symbol arena.
    pub symbols: Vec<Symbol>,
    /// Module scopes by key.
    pub modules: HashMap<ModuleKey, ModuleScope>,
    /// Script-file and `declare global` declarations.
    pub globals: HashMap<String, SymbolId>,
    /// `(importing file, specifier)` to the module it names.
    pub resolutions: HashMap<(FilePath, String), ModuleKey>,
    /// Duplicate-declaration errors per file.
    pub diagnostics: HashMap<FilePath, Vec<Diagnostic>>,
}

const MAX_ALIAS_DEPTH: usize = 32;

impl SymbolTable {
    /// Binds every file. `resolved_files` maps `(file, specifier)` to the
    /// loaded file the loader resolved it to.
    pub fn bind(
        files: &[SourceFile],
        resolved_files: &HashMap<(FilePath, String), FilePath>,
    ) -> SymbolTable {
        let mut table = SymbolTable::default();
        for file in files {
            if file.is_external_module() {
                table
                    .modules
                    .entry(ModuleKey::File(file.path().clone()))
                    .or_default()
                    .files
                    .push(file.path().clone());
            }
        }
        // Ambient module names must be known before any specifier is resolved.
        for file in files {
            for statement in file.statements() {
                if let StatementKind::AmbientModule(module) = &statement.kind {
                    let key = table.ambient_or_augmented_key(file, &module.name.text, resolved_files);
                    let scope = table.modules.entry(key).or_default();
                    if !scope.files.contains(file.path()) {
                        scope.files.push(file.path().clone());
                    }
                }
            }
        }
        for file in files {
            let scope = file
                .is_external_module()
                .then(|| ModuleKey::File(file.path().clone()));
            let mut binder = FileBinder {
                table: &mut table,
                file,
                resolved_files,
                seen_values: HashMap::new(),
            };
            binder.bind_statements(file.statements(), scope.as_ref(), false);
        }
        table
    }

    fn ambient_or_augmented_key(
        &self,
        file: &SourceFile,
        name: &str,
        resolved_files: &HashMap<(FilePath, String), FilePath>,
    ) -> ModuleKey {
        if file.is_external_module() {
            if let Some(target) = resolved_files.get(&(file.path().clone(), name.to_string())) {
                return ModuleKey::File(target.clone());
            }
        }
        ModuleKey::Ambient(name.to_string())
    }

    /// Resolves `specifier` as written in `file`.
    pub fn resolve_module(&self, file: &FilePath, specifier: &str) -> Option<&ModuleKey> {
        self.resolutions.get(&(file.clone(), specifier.to_string()))
    }

    /// Returns the symbol for `id`.
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    /// Looks up `name` among the exports of `module`, following `export *`.
    pub fn resolve_export(&self, module: &ModuleKey, name: &str) -> Option<SymbolId> {
        let mut visited = HashSet::new();
        self.resolve_export_inner(module, name, &mut visited)
    }

    fn resolve_export_inner(
        &self,
        module: &ModuleKey,
        name: &str,
        visited: &mut HashSet<ModuleKey>,
    ) -> Option<SymbolId> {
        if !visited.insert(module.clone()) {
            return None;
        }
        let scope = self.modules.get(module)?;
        if let Some(id) = scope.exports.get(name) {
            return Some(*id);
        }
        let origin = scope.files.first()?;
        scope.export_stars.iter().find_map(|specifier| {
            let target = self.resolve_module(origin, specifier)?;
            self.resolve_export_inner(target, name, visited)
        })
    }

    /// Every export name of `module`, including those reached through `export *`.
    pub fn export_names(&self, module: &ModuleKey) -> BTreeMap<String, SymbolId> {
        let mut names = BTreeMap::new();
        let mut visited = HashSet::new();
        self.collect_exports(module, &mut names, &mut visited);
        names
    }

    fn collect_exports(
        &self,
        module: &ModuleKey,
        names: &mut BTreeMap<String, SymbolId>,
        visited: &mut HashSet<ModuleKey>,
    ) {
        if !visited.insert(module.clone()) {
            return;
        }
        let Some(scope) = self.modules.get(module) else {
            return;
        };
        for (name, id) in &scope.exports {
            names.entry(name.clone()).or_insert(*id);
        }
        let Some(origin) = scope.files.first() else {
            return;
        };
        for specifier in &scope.export_stars {
            if let Some(target) = self.resolve_module(origin, specifier) {
                self.collect_exports(target, names, visited);
            }
        }
    }

    /// Looks up `name` as seen from `module` (or from global scope).
    pub fn lookup(&self, module: Option<&ModuleKey>, name: &str) -> Option<SymbolId> {
        module
            .and_then(|key| self.modules.get(key))
            .and_then(|scope| scope.locals.get(name).copied())
            .or_else(|| self.globals.get(name).copied())
    }

    /// Follows import and export aliases to the symbol they name.
    ///
    /// Non-alias symbols resolve to themselves. Namespace imports and
    /// unresolvable aliases yield `None`.
    pub fn resolve_alias(&self, id: SymbolId) -> Option<SymbolId> {
        let mut current = id;
        for _ in 0..MAX_ALIAS_DEPTH {
            let symbol = &self.symbols[current];
            if !symbol.flags.contains(SymbolFlags::ALIAS) {
                return Some(current);
            }
            current = match symbol.declarations.first()? {
                Declaration::Import { module, name } => {
                    let target = self.resolve_module(&symbol.file, module)?;
                    match name {
                        ImportedName::Named(name) => self.resolve_export(target, name)?,
                        ImportedName::Default => self.resolve_export(target, "default")?,
                        ImportedName::Namespace => return None,
                    }
                }
                Declaration::Reexport { module: Some(module), name } => {
                    let target = self.resolve_module(&symbol.file, module)?;
                    self.resolve_export(target, name)?
                }
                Declaration::Reexport { module: None, name } => {
                    let local = self.lookup(symbol.module.as_ref(), name)?;
                    if local == current {
                        return None;
                    }
                    local
                }
                _ => return Some(current),
            };
        }
        None
    }

    /// The module a namespace alias refers to.
    pub fn namespace_target(&self, id: SymbolId) -> Option<&ModuleKey> {
        let symbol = &self.symbols[id];
        match symbol.declarations.first()? {
            Declaration::Import {
                module,
                name: ImportedName::Namespace,
            } => self.resolve_module(&symbol.file, module),
            _ => None,
        }
    }
}

struct FileBinder<'a> {
    table: &'a mut SymbolTable,
    file: &'a SourceFile,
    resolved_files: &'a HashMap<(FilePath, String), FilePath>,
    seen_values: HashMap<(Option<ModuleKey>, String), (u32, u32)>,
}

impl FileBinder<'_> {
    fn record_resolution(&mut self, specifier: &StringLit) {
        let file_key = (self.file.path().clone(), specifier.text.clone());
        let key = match self.resolved_files.get(&file_key) {
            Some(target) => ModuleKey::File(target.clone()),
            None => ModuleKey::Ambient(specifier.text.clone()),
        };
        if self.table.modules.contains_key(&key) {
            self.table.resolutions.insert(file_key, key);
        }
    }

    fn bind_statements(&mut self, statements: &[Statement], scope: Option<&ModuleKey>, ambient: bool) {
        let ambient = ambient || self.file.is_declaration_file();
        for statement in statements {
            let modifiers = statement.modifiers();
            // Inside `declare module` bodies every declaration is visible to importers.
            let exported = modifiers.export || (ambient && matches!(scope, Some(ModuleKey::Ambient(_))));
            let declare = ambient || modifiers.declare;
            match &statement.kind {
                StatementKind::Import(import) => {
                    self.record_resolution(&import.module);
                    let module = import.module.text.clone();
                    if let Some(default) = &import.default_binding {
                        self.declare_import(scope, default, &module, ImportedName::Default);
                    }
                    if let Some(namespace) = &import.namespace {
                        self.declare_import(scope, namespace, &module, ImportedName::Namespace);
                    }
                    for specifier in &import.named {
                        let imported = ImportedName::Named(specifier.imported.text.clone());
                        self.declare_import(scope, &specifier.local, &module, imported);
                    }
                }
                StatementKind::Export(export) => {
                    if let Some(module) = &export.module {
                        self.record_resolution(module);
                    }
                    let module = export.module.as_ref().map(|m| m.text.clone());
                    match (&export.specifiers, &export.namespace) {
                        (None, None) => {
                            if let (Some(module), Some(key)) = (module, scope) {
                                if let Some(module_scope) = self.table.modules.get_mut(key) {
                                    module_scope.export_stars.push(module);
                                }
                            }
                        }
                        (None, Some(namespace)) => {
                            let declaration = Declaration::Import {
                                module: module.unwrap_or_default(),
                                name: ImportedName::Namespace,
                            };
                            self.declare_export_alias(scope, namespace, declaration);
                        }
                        (Some(specifiers), _) => {
                            for specifier in specifiers {
                                let declaration = Declaration::Reexport {
                                    module: module.clone(),
                                    name: specifier.local.text.clone(),
                                };
                                self.declare_export_alias(scope, &specifier.exported, declaration);
                            }
                        }
                    }
                }
                StatementKind::Variable(variable) => {
                    for decl in &variable.declarations {
                        let declaration = Declaration::Variable {
                            kind: variable.kind,
                            decl: decl.clone(),
                            ambient: declare,
                        };
                        self.declare(scope, &decl.name, SymbolFlags::VARIABLE, declaration, exported);
                    }
                }
                StatementKind::Function(function) => {
                    self.declare(
                        scope,
                        &function.name,
                        SymbolFlags::FUNCTION,
                        Declaration::Function(function.clone()),
                        exported,
                    );
                }
                StatementKind::Interface(interface) => {
                    self.declare(
                        scope,
                        &interface.name,
                        SymbolFlags::INTERFACE,
                        Declaration::Interface,
                        exported,
                    );
                }
                StatementKind::TypeAlias(alias) => {
                    self.declare(
                        scope,
                        &alias.name,
                        SymbolFlags::TYPE_ALIAS,
                        Declaration::TypeAlias(alias.clone()),
                        exported,
                    );
                }
                StatementKind::Enum(enum_decl) => {
                    let flags = if enum_decl.is_const {
                        SymbolFlags::CONST_ENUM
                    } else {
                        SymbolFlags::ENUM
                    };
                    self.declare(
                        scope,
                        &enum_decl.name,
                        flags,
                        Declaration::Enum(enum_decl.clone()),
                        exported,
                    );
                }
                StatementKind::GlobalAugmentation(body) => {
                    self.bind_statements(body, None, true);
                }
                StatementKind::AmbientModule(module) => {
                    let key = self.table.ambient_or_augmented_key(
                        self.file,
                        &module.name.text,
                        self.resolved_files,
                    );
                    self.table
                        .resolutions
                        .insert((self.file.path().clone(), module.name.text.clone()), key.clone());
                    self.bind_statements(&module.body, Some(&key), true);
                }
                StatementKind::Return(_) | StatementKind::Expression(_) | StatementKind::Opaque => {}
            }
        }
    }

    fn declare_import(&mut self, scope: Option<&ModuleKey>, local: &Ident, module: &str, name: ImportedName) {
        let declaration = Declaration::Import {
            module: module.to_string(),
            name,
        };
        self.declare(scope, local, SymbolFlags::ALIAS, declaration, false);
    }

    fn declare_export_alias(&mut self, scope: Option<&ModuleKey>, exported: &Ident, declaration: Declaration) {
        let Some(key) = scope else {
            return;
        };
        let id = self.new_symbol(Some(key), exported, SymbolFlags::ALIAS, declaration, true);
        if let Some(module_scope) = self.table.modules.get_mut(key) {
            module_scope.exports.insert(exported.text.clone(), id);
        }
    }

    fn new_symbol(
        &mut self,
        scope: Option<&ModuleKey>,
        name: &Ident,
        flags: SymbolFlags,
        declaration: Declaration,
        exported: bool,
    ) -> SymbolId {
        self.table.symbols.push(Symbol {
            name: name.text.clone(),
            flags,
            file: self.file.path().clone(),
            module: scope.cloned(),
            pos: name.pos,
            end: name.end,
            declarations: vec![declaration],
            exported,
        });
        self.table.symbols.len() - 1
    }

    fn declare(
        &mut self,
        scope: Option<&ModuleKey>,
        name: &Ident,
        flags: SymbolFlags,
        declaration: Declaration,
        exported: bool,
    ) {
        if name.text.is_empty() {
            return;
        }
        self.check_duplicate(scope, name, &declaration);
        let existing = match scope.and_then(|key| self.table.modules.get(key)) {
            Some(module_scope) => module_scope.locals.get(&name.text).copied(),
            None if scope.is_none() => self.table.globals.get(&name.text).copied(),
            None => None,
        };
        let id = match existing {
            Some(id) => {
                let symbol = &mut self.table.symbols[id];
                symbol.flags |= flags;
                symbol.exported |= exported;
                symbol.declarations.push(declaration);
                id
            }
            None => {
                let id = self.new_symbol(scope, name, flags, declaration, exported);
                match scope {
                    Some(key) => {
                        if let Some(module_scope) = self.table.modules.get_mut(key) {
                            module_scope.locals.insert(name.text.clone(), id);
                        }
                    }
                    None => {
                        self.table.globals.insert(name.text.clone(), id);
                    }
                }
                id
            }
        };
        if exported {
            if let Some(module_scope) = scope.and_then(|key| self.table.modules.get_mut(key)) {
                module_scope.exports.insert(name.text.clone(), id);
            }
        }
    }

    /// Reports a second value declaration of one name in one scope.
    ///
    /// Function overloads without bodies and ambient redeclarations merge.
    fn check_duplicate(&mut self, scope: Option<&ModuleKey>, name: &Ident, declaration: &Declaration) {
        let is_value = match declaration {
            Declaration::Variable { ambient, .. } => !ambient,
            Declaration::Function(function) => function.body.is_some(),
            Declaration::Enum(_) | Declaration::Import { .. } => true,
            _ => false,
        };
        if !is_value {
            return;
        }
        let key = (scope.cloned(), name.text.clone());
        match self.seen_values.get(&key) {
            Some(&(first_pos, first_end)) => {
                let related = Diagnostic::at(
                    self.file.path(),
                    first_pos,
                    first_end,
                    &messages::DECLARED_HERE,
                    &[&name.text],
                );
                let diagnostic = Diagnostic::at(
                    self.file.path(),
                    name.pos,
                    name.end,
                    &messages::DUPLICATE_IDENTIFIER,
                    &[&name.text],
                )
                .with_related(related);
                self.table
                    .diagnostics
                    .entry(self.file.path().clone())
                    .or_default()
                    .push(diagnostic);
            }
            None => {
                self.seen_values.insert(key, (name.pos, name.end));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(sources: &[(&str, &str)]) -> Vec<SourceFile> {
        sources
            .iter()
            .map(|(name, text)| SourceFile::parse(FilePath::from_canonical(*name), *name, *text))
            .collect()
    }

    fn resolutions(pairs: &[(&str, &str, &str)]) -> HashMap<(FilePath, String), FilePath> {
        pairs
            .iter()
            .map(|(from, spec, to)| {
                (
                    (FilePath::from_canonical(*from), spec.to_string()),
                    FilePath::from_canonical(*to),
                )
            })
            .collect()
    }

    #[test]
    fn exports_and_imports_resolve() {
        let files = files(&[
            ("/a.ts", "export const x = 1; const hidden = 2; export const enum E { A }"),
            ("/b.ts", "import { x, E as F } from './a'; export { x as y };"),
        ]);
        let table = SymbolTable::bind(&files, &resolutions(&[("/b.ts", "./a", "/a.ts")]));
        let a = ModuleKey::File(FilePath::from_canonical("/a.ts"));
        let b = ModuleKey::File(FilePath::from_canonical("/b.ts"));
        assert_eq!(
            table.modules[&a].exports.keys().collect::<Vec<_>>(),
            vec!["E", "x"]
        );
        let y = table.resolve_export(&b, "y").unwrap();
        let target = table.resolve_alias(y).unwrap();
        assert_eq!(table.symbol(target).name, "x");
        assert_eq!(table.symbol(target).file.as_str(), "/a.ts");

        let f = table.lookup(Some(&b), "F").unwrap();
        let enum_symbol = table.resolve_alias(f).unwrap();
        assert!(table.symbol(enum_symbol).flags.contains(SymbolFlags::CONST_ENUM));
    }

    #[test]
    fn export_star_and_ambient_modules() {
        let files = files(&[
            ("/a.ts", "export interface I {}"),
            ("/b.ts", "export * from './a';"),
            ("/g.d.ts", "declare module 'lib' { const v: number; }"),
        ]);
        let table = SymbolTable::bind(&files, &resolutions(&[("/b.ts", "./a", "/a.ts")]));
        let b = ModuleKey::File(FilePath::from_canonical("/b.ts"));
        assert!(table.resolve_export(&b, "I").is_some());
        assert_eq!(table.export_names(&b).len(), 1);
        let lib = ModuleKey::Ambient("lib".to_string());
        assert!(table.resolve_export(&lib, "v").is_some());
    }

    #[test]
    fn scripts_declare_globals() {
        let files = files(&[
            ("/g.ts", "var counter = 0; interface Shared {}"),
            ("/m.ts", "export {}; declare global { var injected: string; }"),
        ]);
        let table = SymbolTable::bind(&files, &HashMap::new());
        assert!(table.globals.contains_key("counter"));
        assert!(table.globals.contains_key("Shared"));
        assert!(table.globals.contains_key("injected"));
    }

    #[test]
    fn duplicates_are_reported_with_related_location() {
        let files = files(&[("/a.ts", "export const x = 1;\nlet x = 2;\ninterface I {}\ninterface I {}")]);
        let table = SymbolTable::bind(&files, &HashMap::new());
        let diags = &table.diagnostics[&FilePath::from_canonical("/a.ts")];
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, 2300);
        assert_eq!(diags[0].related_information[0].code, 2728);
    }

    #[test]
    fn unresolved_import_has_no_target() {
        let files = files(&[("/a.ts", "import { q } from './missing';")]);
        let table = SymbolTable::bind(&files, &HashMap::new());
        let a = ModuleKey::File(FilePath::from_canonical("/a.ts"));
        let q = table.lookup(Some(&a), "q").unwrap();
        assert_eq!(table.resolve_alias(q), None);
        assert!(table.resolve_module(&FilePath::from_canonical("/a.ts"), "./missing").is_none());
    }
}
