//! The reference frontend: loads, binds, checks, and emits a set of files.

use crate::emit::{could_not_write_file, EmitOnly, EmitOptions, EmitResult, WriteFile, WriteFileData};
use crate::frontend::binder::{ModuleKey, ModuleScope, SymbolTable};
use crate::frontend::checker::Checker;
use crate::frontend::declarations::emit_declarations;
use crate::frontend::javascript::{emit_javascript, ModuleFormat};
use crate::frontend::lib_file::{DEFAULT_LIB, DEFAULT_LIB_FILE_NAME, REQUIRED_GLOBAL_TYPES};
use crate::frontend::printer::{MapOutput, PrintedFile};
use crate::host::Host;
use crate::program::{ExportedSymbol, Program, SymbolFlags, TypeChecker};
use crate::source_file::{ResolutionMode, SourceFile};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use strata_common::path::{
    change_extension, combine_paths, file_extension_is_one_of, get_directory_path,
    get_normalized_absolute_path, get_relative_path_from_directory, is_rooted, path_is_relative,
    remove_file_extension, to_path,
};
use strata_common::FilePath;
use strata_config::{CompilerOptions, ModuleKind};
use strata_diagnostics::{messages, Diagnostic};
use tracing::debug;

/// Extensions tried, in order, for an extensionless relative import.
const RESOLVABLE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".d.ts", ".mts", ".cts", ".d.mts", ".d.cts"];

/// The output files a source file maps to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPaths {
    /// The JavaScript output.
    pub js: String,
    /// The JavaScript source map.
    pub js_map: String,
    /// The declaration output.
    pub dts: String,
    /// The declaration map.
    pub dts_map: String,
}

/// A fully loaded and bound program over a [`Host`].
pub struct CompilerProgram {
    options: CompilerOptions,
    host: Arc<dyn Host>,
    root_names: Vec<String>,
    missing_roots: Vec<String>,
    files: Vec<SourceFile>,
    index: HashMap<FilePath, usize>,
    table: SymbolTable,
    type_references: HashMap<FilePath, Vec<String>>,
    has_default_library: bool,
    common_source_directory: String,
    semantic_cache: Mutex<HashMap<FilePath, Vec<Diagnostic>>>,
}

impl CompilerProgram {
    /// Loads `root_names` and everything they reference, plus the default library.
    pub fn new(root_names: Vec<String>, options: CompilerOptions, host: Arc<dyn Host>) -> Self {
        Self::create(root_names, options, host, true)
    }

    /// Like [`new`](Self::new), without the default library.
    pub fn new_without_default_library(
        root_names: Vec<String>,
        options: CompilerOptions,
        host: Arc<dyn Host>,
    ) -> Self {
        Self::create(root_names, options, host, false)
    }

    fn create(root_names: Vec<String>, options: CompilerOptions, host: Arc<dyn Host>, with_lib: bool) -> Self {
        let mut loader = Loader {
            host: host.as_ref(),
            case_sensitive: host.use_case_sensitive_file_names(),
            files: Vec::new(),
            seen: HashSet::new(),
            resolved_modules: HashMap::new(),
            type_references: HashMap::new(),
        };
        if with_lib {
            let path = FilePath::from_canonical(DEFAULT_LIB_FILE_NAME);
            loader.seen.insert(path.clone());
            loader
                .files
                .push(SourceFile::parse(path, DEFAULT_LIB_FILE_NAME, DEFAULT_LIB));
        }
        let mut missing_roots = Vec::new();
        let root_names: Vec<String> = root_names
            .iter()
            .map(|name| get_normalized_absolute_path(name, host.current_directory()))
            .collect();
        for root in &root_names {
            if !loader.host.file_exists(root) {
                missing_roots.push(root.clone());
                continue;
            }
            loader.load(root);
        }

        let Loader {
            files,
            resolved_modules,
            type_references,
            ..
        } = loader;
        let index: HashMap<FilePath, usize> = files
            .iter()
            .enumerate()
            .map(|(i, file)| (file.path().clone(), i))
            .collect();
        let table = SymbolTable::bind(&files, &resolved_modules);
        debug!(files = files.len(), missing = missing_roots.len(), "program loaded");

        let mut program = Self {
            options,
            host,
            root_names,
            missing_roots,
            files,
            index,
            table,
            type_references,
            has_default_library: with_lib,
            common_source_directory: String::new(),
            semantic_cache: Mutex::new(HashMap::new()),
        };
        program.common_source_directory = program.compute_common_source_directory();
        program
    }

    /// The absolute root file names.
    pub fn root_names(&self) -> &[String] {
        &self.root_names
    }

    /// The directory mirrored under `out_dir`.
    pub fn common_source_directory(&self) -> &str {
        &self.common_source_directory
    }

    fn compute_common_source_directory(&self) -> String {
        if let Some(root_dir) = &self.options.root_dir {
            return root_dir.clone();
        }
        let mut common: Option<Vec<String>> = None;
        for file in self.files.iter().filter(|f| self.source_file_may_be_emitted(f, false)) {
            let directory = get_directory_path(file.file_name());
            let parts = directory.split('/');
            common = Some(match common {
                None => parts.map(str::to_owned).collect(),
                Some(mut current) => {
                    let shared = current.iter().zip(parts).take_while(|(a, b)| a.as_str() == *b).count();
                    current.truncate(shared);
                    current
                }
            });
        }
        match common {
            Some(parts) if parts.len() > 1 => parts.join("/"),
            Some(_) => "/".to_string(),
            None => self.host.current_directory().to_string(),
        }
    }

    /// Where the outputs of `file` are written.
    pub fn output_paths(&self, file: &SourceFile) -> OutputPaths {
        let case_sensitive = self.host.use_case_sensitive_file_names();
        let rebase = |dir: Option<&String>| match dir {
            Some(dir) => combine_paths(
                dir,
                &get_relative_path_from_directory(&self.common_source_directory, file.file_name(), case_sensitive),
            ),
            None => file.file_name().to_string(),
        };
        let name = file.file_name();
        let (js_ext, dts_ext) = if file_extension_is_one_of(name, &[".mts"]) {
            (".mjs", ".d.mts")
        } else if file_extension_is_one_of(name, &[".cts"]) {
            (".cjs", ".d.cts")
        } else {
            (".js", ".d.ts")
        };
        let js = change_extension(&rebase(self.options.out_dir.as_ref()), js_ext);
        let dts_base = rebase(self.options.declaration_dir.as_ref().or(self.options.out_dir.as_ref()));
        let dts = format!("{}{dts_ext}", remove_file_extension(&dts_base));
        OutputPaths {
            js_map: format!("{js}.map"),
            dts_map: format!("{dts}.map"),
            js,
            dts,
        }
    }

    fn checker(&self) -> Checker<'_> {
        Checker::new(&self.table, &self.files, &self.index, self.options.strict)
    }

    fn module_format(&self, file: &SourceFile) -> ModuleFormat {
        match self.options.module_kind() {
            ModuleKind::None | ModuleKind::CommonJs => ModuleFormat::CommonJs,
            kind if kind.is_node() => match self.implied_node_format(file) {
                ResolutionMode::EsNext => ModuleFormat::EsModule,
                _ => ModuleFormat::CommonJs,
            },
            _ => ModuleFormat::EsModule,
        }
    }

    fn package_type_is_module(&self, file_name: &str) -> bool {
        let mut directory = get_directory_path(file_name);
        loop {
            let package = combine_paths(&directory, "package.json");
            if let Some(text) = self.host.read_file(&package) {
                return serde_json::from_str::<serde_json::Value>(&text)
                    .ok()
                    .and_then(|json| json.get("type").and_then(|t| t.as_str()).map(|t| t == "module"))
                    .unwrap_or(false);
            }
            let parent = get_directory_path(&directory);
            if parent == directory {
                return false;
            }
            directory = parent;
        }
    }

    fn emit_file(
        &self,
        checker: &Checker<'_>,
        file: &SourceFile,
        emit_only: Option<EmitOnly>,
        writer: &mut dyn WriteFile,
    ) -> EmitResult {
        let paths = self.output_paths(file);
        let mut result = EmitResult::default();

        let emit_js = matches!(emit_only, None | Some(EmitOnly::Js)) && !self.options.emit_declaration_only;
        if emit_js {
            let map_output = if self.options.inline_source_map {
                MapOutput::Inline
            } else if self.options.source_map {
                MapOutput::File(paths.js_map.clone())
            } else {
                MapOutput::None
            };
            let printed = emit_javascript(checker, file, self.module_format(file), &paths.js, &map_output);
            self.write_printed(writer, &paths.js, &paths.js_map, printed, Vec::new(), &mut result);
        }

        let forced = emit_only == Some(EmitOnly::ForcedDts);
        let emit_dts =
            forced || (matches!(emit_only, None | Some(EmitOnly::Dts)) && self.options.emit_declarations());
        if emit_dts {
            let diagnostics = checker.declaration_diagnostics(file);
            if !diagnostics.is_empty() && !forced {
                result.diagnostics.extend(diagnostics);
            } else {
                let map_output = if self.options.declaration_map && !forced {
                    MapOutput::File(paths.dts_map.clone())
                } else {
                    MapOutput::None
                };
                let printed = emit_declarations(checker, file, &paths.dts, &map_output);
                self.write_printed(writer, &paths.dts, &paths.dts_map, printed, diagnostics, &mut result);
            }
        }
        result
    }

    fn write_printed(
        &self,
        writer: &mut dyn WriteFile,
        file_name: &str,
        map_file_name: &str,
        printed: PrintedFile,
        diagnostics: Vec<Diagnostic>,
        result: &mut EmitResult,
    ) {
        if let Some(map) = &printed.map {
            self.write(writer, map_file_name, map, WriteFileData::default(), result);
        }
        let data = WriteFileData {
            source_map_url_pos: printed.source_map_url_pos,
            diagnostics,
            ..WriteFileData::default()
        };
        self.write(writer, file_name, &printed.text, data, result);
    }

    fn write(
        &self,
        writer: &mut dyn WriteFile,
        file_name: &str,
        text: &str,
        mut data: WriteFileData,
        result: &mut EmitResult,
    ) {
        match writer.write_file(file_name, text, false, &mut data) {
            Ok(()) => {
                if self.options.list_emitted_files && !data.skipped_dts_write {
                    result.emitted_files.push(file_name.to_string());
                }
            }
            Err(error) => {
                result.emit_skipped = true;
                result.diagnostics.push(could_not_write_file(file_name, &error));
            }
        }
    }

    fn exported_symbol(&self, id: usize, follow_alias: bool) -> ExportedSymbol {
        let symbol = self.table.symbol(id);
        let target = (follow_alias && symbol.flags.contains(SymbolFlags::ALIAS))
            .then(|| self.table.resolve_alias(id))
            .flatten()
            .filter(|&target| target != id)
            .map(|target| Box::new(self.exported_symbol(target, false)));
        ExportedSymbol {
            name: symbol.name.clone(),
            flags: symbol.flags,
            declaration_files: vec![symbol.file.clone()],
            target,
        }
    }
}

impl TypeChecker for CompilerProgram {
    fn module_declaration_files(&self, file: &SourceFile, specifier: &str) -> Vec<FilePath> {
        self.table
            .resolve_module(file.path(), specifier)
            .and_then(|key| self.table.modules.get(key))
            .map(|scope| scope.files.clone())
            .unwrap_or_default()
    }

    fn exported_symbols(&self, file: &SourceFile) -> Vec<ExportedSymbol> {
        if !file.is_external_module() {
            return Vec::new();
        }
        self.table
            .export_names(&ModuleKey::File(file.path().clone()))
            .into_iter()
            .map(|(name, id)| ExportedSymbol {
                name,
                ..self.exported_symbol(id, true)
            })
            .collect()
    }

    fn ambient_module_files(&self) -> Vec<Vec<FilePath>> {
        let mut modules: Vec<(&String, &ModuleScope)> = self
            .table
            .modules
            .iter()
            .filter_map(|(key, scope)| match key {
                ModuleKey::Ambient(name) => Some((name, scope)),
                ModuleKey::File(_) => None,
            })
            .collect();
        modules.sort_by(|a, b| a.0.cmp(b.0));
        modules.into_iter().map(|(_, scope)| scope.files.clone()).collect()
    }
}

impl Program for CompilerProgram {
    fn options(&self) -> &CompilerOptions {
        &self.options
    }

    fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    fn source_files(&self) -> &[SourceFile] {
        &self.files
    }

    fn source_file(&self, path: &FilePath) -> Option<&SourceFile> {
        self.index.get(path).map(|&i| &self.files[i])
    }

    fn is_source_file_default_library(&self, path: &FilePath) -> bool {
        self.has_default_library && path.as_str() == DEFAULT_LIB_FILE_NAME
    }

    /// There are no project-reference redirects, so forcing declaration
    /// emit does not widen the set of emitted files.
    fn source_file_may_be_emitted(&self, file: &SourceFile, _force_dts_emit: bool) -> bool {
        !file.is_declaration_file()
            && !file.is_json_file()
            && !self.is_source_file_default_library(file.path())
            && !file.file_name().contains("/node_modules/")
    }

    fn implied_node_format(&self, file: &SourceFile) -> ResolutionMode {
        if !self.options.module_kind().is_node() {
            return ResolutionMode::None;
        }
        let name = file.file_name();
        if file_extension_is_one_of(name, &[".mts", ".d.mts"]) {
            ResolutionMode::EsNext
        } else if file_extension_is_one_of(name, &[".cts", ".d.cts"]) {
            ResolutionMode::CommonJs
        } else if self.package_type_is_module(name) {
            ResolutionMode::EsNext
        } else {
            ResolutionMode::CommonJs
        }
    }

    fn config_file_parsing_diagnostics(&self) -> Vec<Diagnostic> {
        Vec::new()
    }

    fn options_diagnostics(&self) -> Vec<Diagnostic> {
        let options = &self.options;
        let mut diagnostics = Vec::new();
        if options.emit_declaration_only && options.no_emit {
            diagnostics.push(Diagnostic::global(
                &messages::OPTION_CONFLICT,
                &["emitDeclarationOnly", "noEmit"],
            ));
        }
        if options.source_map && options.inline_source_map {
            diagnostics.push(Diagnostic::global(
                &messages::OPTION_CONFLICT,
                &["sourceMap", "inlineSourceMap"],
            ));
        }
        if options.emit_declaration_only && !options.emit_declarations() {
            diagnostics.push(Diagnostic::global(
                &messages::OPTION_REQUIRES_ONE_OF,
                &["emitDeclarationOnly", "declaration", "composite"],
            ));
        }
        if options.declaration_map && !options.emit_declarations() {
            diagnostics.push(Diagnostic::global(
                &messages::OPTION_REQUIRES_ONE_OF,
                &["declarationMap", "declaration", "composite"],
            ));
        }
        for root in &self.missing_roots {
            diagnostics.push(Diagnostic::global(&messages::FILE_NOT_FOUND, &[root]));
        }
        diagnostics
    }

    fn global_diagnostics(&self) -> Vec<Diagnostic> {
        REQUIRED_GLOBAL_TYPES
            .iter()
            .filter(|name| {
                !self
                    .table
                    .globals
                    .get(**name)
                    .is_some_and(|&id| self.table.symbol(id).flags.intersects(SymbolFlags::TYPE))
            })
            .map(|name| Diagnostic::global(&messages::CANNOT_FIND_GLOBAL_TYPE, &[name]))
            .collect()
    }

    fn syntactic_diagnostics(&self, file: Option<&SourceFile>) -> Vec<Diagnostic> {
        match file {
            Some(file) => file.parse_diagnostics().to_vec(),
            None => self
                .files
                .iter()
                .flat_map(|file| file.parse_diagnostics().iter().cloned())
                .collect(),
        }
    }

    fn bind_diagnostics(&self, file: Option<&SourceFile>) -> Vec<Diagnostic> {
        match file {
            Some(file) => self.table.diagnostics.get(file.path()).cloned().unwrap_or_default(),
            None => self
                .files
                .iter()
                .filter_map(|file| self.table.diagnostics.get(file.path()))
                .flatten()
                .cloned()
                .collect(),
        }
    }

    fn semantic_diagnostics(&self, file: &SourceFile) -> Vec<Diagnostic> {
        let skipped = self.options.no_check
            || file.is_json_file()
            || (self.options.skip_lib_check && file.is_declaration_file())
            || (self.options.skip_default_lib_check && self.is_source_file_default_library(file.path()));
        if skipped {
            return Vec::new();
        }
        if let Some(cached) = self
            .semantic_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(file.path())
        {
            return cached.clone();
        }
        let diagnostics = self.checker().check_source_file(file);
        self.semantic_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file.path().clone(), diagnostics.clone());
        diagnostics
    }

    fn semantic_diagnostics_of_files(&self, files: &[&SourceFile]) -> Vec<Vec<Diagnostic>> {
        files.par_iter().map(|file| self.semantic_diagnostics(file)).collect()
    }

    fn declaration_diagnostics(&self, file: &SourceFile) -> Vec<Diagnostic> {
        if !self.source_file_may_be_emitted(file, false) {
            return Vec::new();
        }
        self.checker().declaration_diagnostics(file)
    }

    fn emit(&self, options: &EmitOptions, writer: &mut dyn WriteFile) -> EmitResult {
        if self.options.no_emit && options.emit_only != Some(EmitOnly::ForcedDts) {
            return EmitResult::skipped();
        }
        let forced = options.emit_only == Some(EmitOnly::ForcedDts);
        let targets: Vec<&SourceFile> = match &options.target_source_file {
            Some(path) => self.source_file(path).into_iter().collect(),
            None => self.files.iter().collect(),
        };
        let checker = self.checker();
        EmitResult::combine(
            targets
                .into_iter()
                .filter(|file| self.source_file_may_be_emitted(file, forced))
                .map(|file| self.emit_file(&checker, file, options.emit_only, writer))
                .collect::<Vec<_>>(),
        )
    }

    fn type_checker_for_file(&self, _file: &SourceFile) -> &dyn TypeChecker {
        self
    }

    fn resolved_type_reference_directives(&self, file: &SourceFile) -> Vec<String> {
        self.type_references.get(file.path()).cloned().unwrap_or_default()
    }
}

/// Discovers files depth-first, placing dependencies before their importers.
struct Loader<'h> {
    host: &'h dyn Host,
    case_sensitive: bool,
    files: Vec<SourceFile>,
    seen: HashSet<FilePath>,
    resolved_modules: HashMap<(FilePath, String), FilePath>,
    type_references: HashMap<FilePath, Vec<String>>,
}

impl Loader<'_> {
    fn to_path(&self, file_name: &str) -> FilePath {
        to_path(file_name, self.host.current_directory(), self.case_sensitive)
    }

    fn load(&mut self, file_name: &str) -> Option<FilePath> {
        let path = self.to_path(file_name);
        if !self.seen.insert(path.clone()) {
            return Some(path);
        }
        let text = self.host.read_file(file_name)?;
        let file = if file_name.ends_with(".json") {
            SourceFile::json(path.clone(), file_name, text)
        } else {
            SourceFile::parse(path.clone(), file_name, text)
        };

        let mut specifiers: Vec<String> = file.imports().iter().map(|s| s.text.clone()).collect();
        for augmentation in file.module_augmentations() {
            if let crate::source_file::ModuleAugmentation::Module(name) = augmentation {
                if !specifiers.contains(&name.text) {
                    specifiers.push(name.text.clone());
                }
            }
        }
        for specifier in specifiers {
            if let Some(resolved) = self.resolve_module_name(&specifier, file_name) {
                if let Some(target) = self.load(&resolved) {
                    self.resolved_modules.insert((path.clone(), specifier), target);
                }
            }
        }

        let directory = get_directory_path(file_name);
        for reference in file.referenced_files() {
            let referenced = get_normalized_absolute_path(&reference.file_name, &directory);
            if self.host.file_exists(&referenced) {
                self.load(&referenced);
            }
        }
        for directive in file.type_reference_directives() {
            if let Some(resolved) = self.resolve_type_reference(&directive.file_name, file_name) {
                self.load(&resolved);
                self.type_references
                    .entry(path.clone())
                    .or_default()
                    .push(resolved);
            }
        }
        self.files.push(file);
        Some(path)
    }

    fn resolve_module_name(&self, specifier: &str, containing_file: &str) -> Option<String> {
        let directory = get_directory_path(containing_file);
        if path_is_relative(specifier) || is_rooted(specifier) {
            return self.try_file(&get_normalized_absolute_path(specifier, &directory));
        }
        self.walk_node_modules(&directory, |node_modules| {
            [
                format!("{node_modules}/{specifier}.d.ts"),
                format!("{node_modules}/{specifier}/index.d.ts"),
                format!("{node_modules}/@types/{specifier}/index.d.ts"),
            ]
            .to_vec()
        })
    }

    fn resolve_type_reference(&self, name: &str, containing_file: &str) -> Option<String> {
        self.walk_node_modules(&get_directory_path(containing_file), |node_modules| {
            vec![format!("{node_modules}/@types/{name}/index.d.ts")]
        })
    }

    fn walk_node_modules(&self, start: &str, candidates: impl Fn(&str) -> Vec<String>) -> Option<String> {
        let mut directory = start.to_string();
        loop {
            let node_modules = combine_paths(&directory, "node_modules");
            if let Some(found) = candidates(&node_modules)
                .into_iter()
                .find(|candidate| self.host.file_exists(candidate))
            {
                return Some(found);
            }
            let parent = get_directory_path(&directory);
            if parent == directory {
                return None;
            }
            directory = parent;
        }
    }

    fn try_file(&self, base: &str) -> Option<String> {
        let exists = |name: &String| self.host.file_exists(name);
        if base.ends_with(".json") {
            return Some(base.to_string()).filter(exists);
        }
        for (output, sources) in [
            (".js", &[".ts", ".tsx", ".d.ts"][..]),
            (".mjs", &[".mts", ".d.mts"][..]),
            (".cjs", &[".cts", ".d.cts"][..]),
        ] {
            if let Some(stem) = base.strip_suffix(output) {
                return sources.iter().map(|ext| format!("{stem}{ext}")).find(exists);
            }
        }
        if file_extension_is_one_of(base, RESOLVABLE_EXTENSIONS) && self.host.file_exists(base) {
            return Some(base.to_string());
        }
        RESOLVABLE_EXTENSIONS
            .iter()
            .map(|ext| format!("{base}{ext}"))
            .chain([format!("{base}/index.ts"), format!("{base}/index.d.ts")])
            .find(exists)
    }
}
