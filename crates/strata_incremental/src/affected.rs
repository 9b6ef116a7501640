//! The affected-file worklist.
//!
//! Changed files are processed one at a time. For each, the set of files
//! whose cached results it invalidates is computed once and stored in a
//! [`PendingBatch`]; callers then pull files from the batch with
//! [`Snapshot::next_affected_file`] and confirm each with
//! [`Snapshot::commit_affected_file`]. Until a file is committed the same
//! file keeps coming back, so an interrupted caller loses nothing.
//!
//! Shape signatures updated while a batch is open are logged in the batch's
//! rollback map. A snapshot built from a generation with an open batch
//! restores those prior signatures, which keeps half-processed work from
//! hiding a change.

use crate::diagnostics_cache::CachedDiagnostics;
use crate::emit_kind::FileEmitKind;
use crate::signature::compute_signature_with_diagnostics;
use crate::snapshot::Snapshot;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;
use strata_common::path::is_declaration_file_name;
use strata_common::FilePath;
use strata_diagnostics::Diagnostic;
use strata_program::{EmitOnly, EmitOptions, Program, SourceFile, SymbolFlags, WriteFileData};
use tracing::trace;

/// The files affected by one changed file, and the undo log for the shape
/// signatures updated while computing them.
#[derive(Debug)]
pub(crate) struct PendingBatch {
    pub(crate) changed_file: FilePath,
    pub(crate) files: Vec<FilePath>,
    pub(crate) cursor: usize,
    pub(crate) covers_all_files: bool,
    pub(crate) rollback: HashMap<FilePath, String>,
}

impl PendingBatch {
    fn new(changed_file: FilePath) -> Self {
        Self {
            changed_file,
            files: Vec::new(),
            cursor: 0,
            covers_all_files: false,
            rollback: HashMap::new(),
        }
    }
}

/// What a reverse-reference walk does after visiting a file.
enum Visit {
    /// Do not descend into this file's referencing files.
    Skip,
    /// Descend into this file's referencing files.
    Queue,
    /// End the walk.
    Stop,
}

impl Snapshot {
    /// Returns the next file affected by a pending change, or `None` when
    /// every change has been processed.
    ///
    /// The returned file stays current until
    /// [`commit_affected_file`](Self::commit_affected_file) is called for it.
    /// Returning a file schedules its full emit and invalidates what its
    /// declaration change may have touched.
    pub fn next_affected_file(&mut self, program: &dyn Program) -> Option<FilePath> {
        loop {
            if let Some(batch) = &self.batch {
                let next = batch.files[batch.cursor.min(batch.files.len())..]
                    .iter()
                    .position(|path| !self.seen_affected_files.contains(path))
                    .map(|offset| batch.cursor + offset);
                if let Some(index) = next {
                    let path = batch.files[index].clone();
                    if let Some(batch) = self.batch.as_mut() {
                        batch.cursor = index;
                    }
                    trace!(file = %path, "affected file");
                    let kind = FileEmitKind::from_options(&self.options);
                    self.add_file_to_affected_files_pending_emit(path.clone(), kind);
                    self.handle_dts_may_change_of_affected_file(program, &path);
                    return Some(path);
                }
                if let Some(batch) = self.batch.take() {
                    trace!(file = %batch.changed_file, "batch finished");
                    self.changed_files_set.remove(&batch.changed_file);
                }
            }

            let changed = self.changed_files_set.first()?.clone();
            trace!(file = %changed, "batch started");
            self.batch = Some(PendingBatch::new(changed.clone()));
            let (files, covers_all_files) = self.files_affected_by(program, &changed);
            if let Some(batch) = self.batch.as_mut() {
                batch.files = files;
                batch.covers_all_files = covers_all_files;
            }
        }
    }

    /// Marks `path`, last returned by
    /// [`next_affected_file`](Self::next_affected_file), as processed.
    pub fn commit_affected_file(&mut self, path: &FilePath) {
        self.seen_affected_files.insert(path.clone());
        if let Some(batch) = self.batch.as_mut() {
            if batch.files.get(batch.cursor) == Some(path) {
                batch.cursor += 1;
            }
        }
        self.build_info_emit_pending = true;
    }

    /// Files whose results depend on the shape of `path`, `path` first.
    ///
    /// The flag is set when the change reaches every file of the program.
    fn files_affected_by(&mut self, program: &dyn Program, path: &FilePath) -> (Vec<FilePath>, bool) {
        let Some(file) = program.source_file(path) else {
            return (Vec::new(), false);
        };
        if !self.update_shape_signature(program, file, false) {
            return (vec![path.clone()], false);
        }
        let affects_global_scope = self
            .file_infos
            .get(path)
            .is_some_and(|info| info.affects_global_scope);
        if !self.tracks_references() || affects_global_scope {
            return (self.all_files_excluding_default_library(program, Some(path)), true);
        }
        if self.options.isolated_modules || self.options.assume_changes_only_affect_direct_dependencies {
            let mut files = vec![path.clone()];
            if let Some(graph) = &self.referenced_map {
                files.extend(
                    graph
                        .referencing_files(path)
                        .into_iter()
                        .filter(|referencing| program.source_file(referencing).is_some()),
                );
            }
            return (files, false);
        }
        let files = self.for_each_file_referenced_by(program, path, |snapshot, current| {
            match program.source_file(current) {
                Some(current_file) if snapshot.update_shape_signature(program, current_file, false) => Visit::Queue,
                _ => Visit::Skip,
            }
        });
        (files, false)
    }

    /// Walks the reverse reference graph from `path`, calling `visit` once
    /// per reached file present in the program. Returns `path` followed by
    /// every visited file.
    fn for_each_file_referenced_by<F>(&mut self, program: &dyn Program, path: &FilePath, mut visit: F) -> Vec<FilePath>
    where
        F: FnMut(&mut Snapshot, &FilePath) -> Visit,
    {
        let mut seen = HashSet::from([path.clone()]);
        let mut visited = vec![path.clone()];
        let mut queue = self.referencing_files(path);
        while let Some(current) = queue.pop() {
            if !seen.insert(current.clone()) || program.source_file(&current).is_none() {
                continue;
            }
            visited.push(current.clone());
            match visit(self, &current) {
                Visit::Skip => {}
                Visit::Queue => queue.extend(self.referencing_files(&current)),
                Visit::Stop => break,
            }
        }
        visited
    }

    fn referencing_files(&self, path: &FilePath) -> Vec<FilePath> {
        self.referenced_map
            .as_ref()
            .map(|graph| graph.referencing_files(path))
            .unwrap_or_default()
    }

    /// Recomputes the shape signature of `file` once per generation.
    ///
    /// Declaration files, and callers passing `use_version`, take the file
    /// version as the shape instead of emitting declarations. Returns `true`
    /// if the signature changed.
    pub(crate) fn update_shape_signature(&mut self, program: &dyn Program, file: &SourceFile, use_version: bool) -> bool {
        let path = file.path();
        if self.has_called_update_shape_signature.contains(path) {
            return false;
        }
        let Some(info) = self.file_infos.get(path) else {
            return false;
        };
        let prior = info.signature.clone();
        let version = info.version.clone();
        let mut latest = String::new();
        if !file.is_declaration_file() && !use_version {
            latest = compute_dts_signature(program, file);
        }
        if latest.is_empty() {
            latest = version;
        }
        if let Some(batch) = self.batch.as_mut() {
            batch.rollback.insert(path.clone(), prior.clone());
        }
        self.has_called_update_shape_signature.insert(path.clone());
        let changed = latest != prior;
        if changed {
            trace!(file = %path, "shape signature changed");
        }
        if let Some(info) = self.file_infos.get_mut(path) {
            info.signature = latest;
        }
        changed
    }

    fn is_changed_signature(&self, path: &FilePath) -> bool {
        let prior = self
            .batch
            .as_ref()
            .and_then(|batch| batch.rollback.get(path))
            .map_or("", String::as_str);
        let current = self.file_infos.get(path).map_or("", |info| info.signature.as_str());
        current != prior
    }

    /// Drops semantic diagnostics of `path` carried over from the previous
    /// generation. Diagnostics computed in this generation are already fresh.
    pub(crate) fn remove_semantic_diagnostics_of(&mut self, path: &FilePath) {
        if self.semantic_diagnostics_from_old_state.remove(path) {
            self.semantic_diagnostics_per_file.remove(path);
        }
    }

    fn remove_diagnostics_of_library_files(&mut self, program: &dyn Program) {
        if self.cleaned_diagnostics_of_lib_files {
            return;
        }
        self.cleaned_diagnostics_of_lib_files = true;
        if self.options.skip_lib_check || self.options.skip_default_lib_check {
            return;
        }
        let libs: Vec<FilePath> = program
            .source_files()
            .iter()
            .map(SourceFile::path)
            .filter(|path| program.is_source_file_default_library(path))
            .cloned()
            .collect();
        for path in libs {
            self.remove_semantic_diagnostics_of(&path);
        }
    }

    /// Invalidates files whose declaration output or diagnostics may depend
    /// on the declarations of `path`.
    fn handle_dts_may_change_of_affected_file(&mut self, program: &dyn Program, path: &FilePath) {
        self.remove_semantic_diagnostics_of(path);
        let Some(file) = program.source_file(path) else {
            return;
        };

        if self.batch.as_ref().is_some_and(|batch| batch.covers_all_files) {
            self.remove_diagnostics_of_library_files(program);
            // Files reached by a global change were never shape-checked.
            self.update_shape_signature(program, file, false);
            return;
        }
        if self.options.assume_changes_only_affect_direct_dependencies {
            return;
        }
        if !self.tracks_references() || !self.changed_files_set.contains(path) || !self.is_changed_signature(path) {
            return;
        }

        if self.options.isolated_modules {
            let mut reached_global = false;
            self.for_each_file_referenced_by(program, path, |snapshot, current| {
                if snapshot.handle_dts_may_change_of_global_scope(program, current, false) {
                    reached_global = true;
                    return Visit::Stop;
                }
                snapshot.handle_dts_may_change_of(program, current, false);
                if snapshot.is_changed_signature(current) {
                    Visit::Queue
                } else {
                    Visit::Skip
                }
            });
            if reached_global {
                return;
            }
        }

        let invalidate_js = self.dependents_need_js_emit(program, file);
        let mut seen = HashSet::new();
        for exported_from in self.referencing_files(path) {
            if self.handle_dts_may_change_of_global_scope(program, &exported_from, invalidate_js) {
                return;
            }
            for referencing in self.referencing_files(&exported_from) {
                if self.handle_dts_may_change_of_file_and_exports_of_file(program, referencing, invalidate_js, &mut seen) {
                    return;
                }
            }
        }
    }

    /// Returns `true` if files depending on `file` must re-emit JavaScript
    /// when its declarations change.
    ///
    /// Const enum values are inlined into importers, so an exported const
    /// enum declared in `file`, directly or behind an alias, makes the
    /// importers' JavaScript stale. Isolated modules never inline across
    /// files.
    fn dependents_need_js_emit(&self, program: &dyn Program, file: &SourceFile) -> bool {
        if self.options.isolated_modules {
            return false;
        }
        let checker = program.type_checker_for_file(file);
        checker.exported_symbols(file).iter().any(|symbol| {
            symbol.flags.contains(SymbolFlags::CONST_ENUM)
                || symbol.target.as_ref().is_some_and(|target| {
                    target.flags.contains(SymbolFlags::CONST_ENUM)
                        && target.declaration_files.iter().any(|declaring| declaring == file.path())
                })
        })
    }

    /// Returns `true` when the walk reached a global file and every file was
    /// handled.
    fn handle_dts_may_change_of_file_and_exports_of_file(
        &mut self,
        program: &dyn Program,
        path: FilePath,
        invalidate_js: bool,
        seen: &mut HashSet<FilePath>,
    ) -> bool {
        if !seen.insert(path.clone()) {
            return false;
        }
        if self.handle_dts_may_change_of_global_scope(program, &path, invalidate_js) {
            return true;
        }
        self.handle_dts_may_change_of(program, &path, invalidate_js);
        for referencing in self.referencing_files(&path) {
            if self.handle_dts_may_change_of_file_and_exports_of_file(program, referencing, invalidate_js, seen) {
                return true;
            }
        }
        false
    }

    fn handle_dts_may_change_of_global_scope(&mut self, program: &dyn Program, path: &FilePath, invalidate_js: bool) -> bool {
        if !self.file_infos.get(path).is_some_and(|info| info.affects_global_scope) {
            return false;
        }
        for file in self.all_files_excluding_default_library(program, None) {
            self.handle_dts_may_change_of(program, &file, invalidate_js);
        }
        self.remove_diagnostics_of_library_files(program);
        true
    }

    fn handle_dts_may_change_of(&mut self, program: &dyn Program, path: &FilePath, invalidate_js: bool) {
        self.remove_semantic_diagnostics_of(path);
        if self.changed_files_set.contains(path) {
            return;
        }
        let Some(file) = program.source_file(path) else {
            return;
        };
        // The version stands in for the shape; a full declaration emit here
        // would cost more than the rebuild it saves.
        self.update_shape_signature(program, file, true);
        if invalidate_js {
            let kind = FileEmitKind::from_options(&self.options);
            self.add_file_to_affected_files_pending_emit(path.clone(), kind);
        } else if self.options.emit_declarations() {
            let kind = if self.options.declaration_map {
                FileEmitKind::ALL_DTS
            } else {
                FileEmitKind::DTS
            };
            self.add_file_to_affected_files_pending_emit(path.clone(), kind);
        }
    }

    /// Semantic diagnostics of the next affected file, or `None` once the
    /// worklist is drained.
    ///
    /// Diagnostics are cached and the file committed before returning.
    pub fn semantic_diagnostics_of_next_affected_file(&mut self, program: &dyn Program) -> Option<Vec<Diagnostic>> {
        loop {
            let Some(path) = self.next_affected_file(program) else {
                if self.check_pending && !self.options.no_check {
                    self.check_pending = false;
                    self.build_info_emit_pending = true;
                }
                return None;
            };
            let diagnostics = program
                .source_file(&path)
                .map(|file| self.semantic_diagnostics_of_file(program, file));
            self.commit_affected_file(&path);
            if let Some(diagnostics) = diagnostics {
                return Some(diagnostics);
            }
        }
    }

    /// Semantic diagnostics of `file`, from the cache when present.
    pub(crate) fn semantic_diagnostics_of_file(&mut self, program: &dyn Program, file: &SourceFile) -> Vec<Diagnostic> {
        if self.options.no_check {
            return Vec::new();
        }
        let path = file.path();
        if let Some(cached) = self.semantic_diagnostics_per_file.get(path) {
            return self.filter_no_emit(cached.diagnostics(path));
        }
        let diagnostics = program.semantic_diagnostics(file);
        let filtered = self.filter_no_emit(&diagnostics);
        self.semantic_diagnostics_per_file.insert(
            path.clone(),
            Arc::new(CachedDiagnostics::resolved(diagnostics)),
        );
        self.build_info_emit_pending = true;
        filtered
    }

    /// Drains the worklist, then checks every file without cached semantic
    /// diagnostics in one parallel pass. Returns every file's diagnostics.
    pub(crate) fn collect_semantic_diagnostics(&mut self, program: &dyn Program) -> Vec<Diagnostic> {
        if self.options.no_check {
            return Vec::new();
        }
        while let Some(path) = self.next_affected_file(program) {
            self.commit_affected_file(&path);
        }

        let missing: Vec<&SourceFile> = program
            .source_files()
            .iter()
            .filter(|file| !self.semantic_diagnostics_per_file.contains_key(file.path()))
            .collect();
        if !missing.is_empty() {
            trace!(files = missing.len(), "checking files without cached diagnostics");
            let computed = program.semantic_diagnostics_of_files(&missing);
            for (file, diagnostics) in missing.iter().zip(computed) {
                self.semantic_diagnostics_per_file.insert(
                    file.path().clone(),
                    Arc::new(CachedDiagnostics::resolved(diagnostics)),
                );
            }
            self.build_info_emit_pending = true;
        }
        if self.check_pending {
            self.check_pending = false;
            self.build_info_emit_pending = true;
        }

        program
            .source_files()
            .iter()
            .filter_map(|file| {
                self.semantic_diagnostics_per_file
                    .get(file.path())
                    .map(|cached| self.filter_no_emit(cached.diagnostics(file.path())))
            })
            .flatten()
            .collect()
    }

    fn filter_no_emit(&self, diagnostics: &[Diagnostic]) -> Vec<Diagnostic> {
        diagnostics
            .iter()
            .filter(|diag| !(self.options.no_emit && diag.skipped_on_no_emit))
            .cloned()
            .collect()
    }
}

/// Hash of the declaration output of `file` plus its declaration
/// diagnostics, or an empty string when no declaration file is produced.
pub(crate) fn compute_dts_signature(program: &dyn Program, file: &SourceFile) -> String {
    let mut signature = String::new();
    let path = file.path().clone();
    let mut writer = |file_name: &str, text: &str, _bom: bool, data: &mut WriteFileData| -> io::Result<()> {
        if is_declaration_file_name(file_name) {
            signature = compute_signature_with_diagnostics(&path, text, data);
        }
        Ok(())
    };
    program.emit(
        &EmitOptions {
            target_source_file: Some(file.path().clone()),
            emit_only: Some(EmitOnly::ForcedDts),
        },
        &mut writer,
    );
    signature
}
