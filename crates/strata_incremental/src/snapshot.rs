//! The incremental state of one program generation.
//!
//! A [`Snapshot`] is built by diffing a freshly created program against the
//! previous generation's snapshot (or one decoded from build info). The diff
//! reuses everything provably unchanged and records what is not in two
//! worklists: the changed-file set, drained by the affected-file iterator in
//! [`affected`](crate::affected), and the pending-emit map, drained by the
//! emit loop in [`emit`](crate::emit).

use crate::affected::PendingBatch;
use crate::diagnostics_cache::CachedDiagnostics;
use crate::emit_kind::{pending_emit_kind_for_options, FileEmitKind};
use crate::file_info::{file_affects_global_scope, FileInfo};
use crate::reference_graph::{referenced_files, ReferenceGraph};
use crate::signature::EmitSignature;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use strata_common::{compute_hash, FilePath};
use strata_config::{
    compiler_options_affect_declaration_path, compiler_options_affect_emit,
    compiler_options_affect_semantic_diagnostics, CompilerOptions,
};
use strata_program::{Program, SourceFile};
use tracing::debug;

/// Incremental state for one program generation.
#[derive(Debug)]
pub struct Snapshot {
    pub(crate) options: CompilerOptions,
    pub(crate) file_infos: HashMap<FilePath, FileInfo>,
    pub(crate) referenced_map: Option<ReferenceGraph>,
    pub(crate) changed_files_set: BTreeSet<FilePath>,
    pub(crate) affected_files_pending_emit: BTreeMap<FilePath, FileEmitKind>,
    pub(crate) semantic_diagnostics_per_file: HashMap<FilePath, Arc<CachedDiagnostics>>,
    pub(crate) emit_diagnostics_per_file: BTreeMap<FilePath, Arc<CachedDiagnostics>>,
    pub(crate) emit_signatures: HashMap<FilePath, EmitSignature>,
    pub(crate) latest_changed_dts_file: Option<String>,
    pub(crate) has_errors: Option<bool>,
    pub(crate) check_pending: bool,

    // Not persisted.
    pub(crate) build_info_emit_pending: bool,
    pub(crate) has_errors_from_old_state: Option<bool>,
    pub(crate) semantic_diagnostics_from_old_state: HashSet<FilePath>,
    pub(crate) has_called_update_shape_signature: HashSet<FilePath>,
    pub(crate) cleaned_diagnostics_of_lib_files: bool,
    pub(crate) all_files_excluding_default_library: Option<Vec<FilePath>>,
    pub(crate) batch: Option<PendingBatch>,
    pub(crate) seen_affected_files: HashSet<FilePath>,
    pub(crate) seen_emitted_files: HashMap<FilePath, FileEmitKind>,
    pub(crate) has_changed_emit_signature: bool,
    pub(crate) build_info_write_failed: bool,
}

impl Snapshot {
    /// A snapshot with no files, used as the starting point of decoding.
    pub(crate) fn empty(options: CompilerOptions) -> Self {
        let referenced_map = options.tracks_references().then(ReferenceGraph::new);
        Self {
            check_pending: options.no_check,
            options,
            file_infos: HashMap::new(),
            referenced_map,
            changed_files_set: BTreeSet::new(),
            affected_files_pending_emit: BTreeMap::new(),
            semantic_diagnostics_per_file: HashMap::new(),
            emit_diagnostics_per_file: BTreeMap::new(),
            emit_signatures: HashMap::new(),
            latest_changed_dts_file: None,
            has_errors: None,
            build_info_emit_pending: false,
            has_errors_from_old_state: None,
            semantic_diagnostics_from_old_state: HashSet::new(),
            has_called_update_shape_signature: HashSet::new(),
            cleaned_diagnostics_of_lib_files: false,
            all_files_excluding_default_library: None,
            batch: None,
            seen_affected_files: HashSet::new(),
            seen_emitted_files: HashMap::new(),
            has_changed_emit_signature: false,
            build_info_write_failed: false,
        }
    }

    /// Diffs `program` against `old`, the previous generation's snapshot.
    ///
    /// Without an old snapshot, or when reference tracking was switched on or
    /// off, every file starts out changed.
    pub fn new(program: &dyn Program, old: Option<&Snapshot>) -> Self {
        let mut snapshot = Snapshot::empty(program.options().clone());
        let old = old.filter(|old| old.tracks_references() == snapshot.tracks_references());
        if let Some(old) = old {
            snapshot.changed_files_set = old.changed_files_set.clone();
            snapshot.affected_files_pending_emit = old.affected_files_pending_emit.clone();
            snapshot.build_info_emit_pending = old.build_info_emit_pending;
            snapshot.has_errors_from_old_state = old.has_errors;
            if snapshot.options.composite {
                snapshot.latest_changed_dts_file = old.latest_changed_dts_file.clone();
            }
        } else {
            debug!("no reusable incremental state; every file is changed");
            snapshot.build_info_emit_pending = snapshot.options.is_incremental();
        }

        let options = &snapshot.options;
        let can_copy_semantic_diagnostics = old
            .is_some_and(|old| !compiler_options_affect_semantic_diagnostics(&old.options, options));
        let copy_declaration_file_diagnostics = can_copy_semantic_diagnostics
            && old.is_some_and(|old| old.options.skip_lib_check == options.skip_lib_check);
        let copy_lib_file_diagnostics = copy_declaration_file_diagnostics
            && old.is_some_and(|old| old.options.skip_default_lib_check == options.skip_default_lib_check);
        let can_copy_emit_signatures = options.composite
            && old.is_some_and(|old| !compiler_options_affect_declaration_path(&old.options, options));

        for file in program.source_files() {
            let path = file.path().clone();
            let version = compute_hash(file.text());
            let affects_global_scope = file_affects_global_scope(file);
            let implied_node_format = program.implied_node_format(file);
            let new_references = snapshot
                .referenced_map
                .is_some()
                .then(|| referenced_files(program, file))
                .flatten();

            let Some(old) = old else {
                snapshot.add_file_to_change_set(path.clone());
                if let (Some(graph), Some(references)) = (snapshot.referenced_map.as_mut(), new_references) {
                    graph.set(path.clone(), references);
                }
                snapshot.file_infos.insert(
                    path,
                    FileInfo {
                        version,
                        signature: String::new(),
                        affects_global_scope,
                        implied_node_format,
                    },
                );
                continue;
            };

            let uncommitted = old
                .batch
                .as_ref()
                .and_then(|batch| batch.rollback.get(&path).cloned());
            let signature = match old.file_infos.get(&path) {
                Some(old_info) => {
                    if old_info.version != version {
                        debug!(file = %path, "content changed");
                        snapshot.add_file_to_change_set(path.clone());
                    } else if old_info.affects_global_scope != affects_global_scope
                        || old_info.implied_node_format != implied_node_format
                    {
                        debug!(file = %path, "global scope or module format changed");
                        snapshot.add_file_to_change_set(path.clone());
                    } else if snapshot.referenced_map.is_some()
                        && references_changed(program, old, &path, new_references.as_ref())
                    {
                        debug!(file = %path, "references changed");
                        snapshot.add_file_to_change_set(path.clone());
                    }
                    uncommitted.unwrap_or_else(|| old_info.signature.clone())
                }
                None => {
                    debug!(file = %path, "new file");
                    snapshot.add_file_to_change_set(path.clone());
                    String::new()
                }
            };
            if let (Some(graph), Some(references)) = (snapshot.referenced_map.as_mut(), new_references) {
                graph.set(path.clone(), references);
            }

            if !snapshot.changed_files_set.contains(&path) {
                if let Some(emit_diagnostics) = old.emit_diagnostics_per_file.get(&path) {
                    snapshot
                        .emit_diagnostics_per_file
                        .insert(path.clone(), Arc::clone(emit_diagnostics));
                }
                let is_lib = program.is_source_file_default_library(&path);
                if can_copy_semantic_diagnostics
                    && (!file.is_declaration_file() || copy_declaration_file_diagnostics)
                    && (!is_lib || copy_lib_file_diagnostics)
                {
                    if let Some(diagnostics) = old.semantic_diagnostics_per_file.get(&path) {
                        snapshot
                            .semantic_diagnostics_per_file
                            .insert(path.clone(), Arc::clone(diagnostics));
                        snapshot.semantic_diagnostics_from_old_state.insert(path.clone());
                    }
                }
            }
            if can_copy_emit_signatures {
                if let Some(emit_signature) = old.emit_signatures.get(&path) {
                    snapshot.emit_signatures.insert(
                        path.clone(),
                        emit_signature.carried_forward(old.options.declaration_map, snapshot.options.declaration_map),
                    );
                }
            }
            snapshot.file_infos.insert(
                path,
                FileInfo {
                    version,
                    signature,
                    affects_global_scope,
                    implied_node_format,
                },
            );
        }

        if let Some(old) = old {
            snapshot.apply_removed_files(program, old);
            if snapshot.semantic_diagnostics_per_file.len() != snapshot.file_infos.len()
                && old.check_pending != snapshot.check_pending
            {
                snapshot.build_info_emit_pending = true;
            }
        }
        snapshot
    }

    /// Handles files that left the program, then schedules outputs owed
    /// because emit options changed.
    fn apply_removed_files(&mut self, program: &dyn Program, old: &Snapshot) {
        let mut removed: Vec<&FilePath> = old
            .file_infos
            .keys()
            .filter(|path| !self.file_infos.contains_key(*path))
            .collect();
        removed.sort();
        if !removed.is_empty() {
            self.build_info_emit_pending = true;
        }
        if let Some(global) = removed
            .iter()
            .find(|path| old.file_infos.get(**path).is_some_and(|info| info.affects_global_scope))
        {
            debug!(file = %global, "global file removed; every file is changed");
            for path in self.all_files_excluding_default_library(program, None) {
                self.add_file_to_change_set(path);
            }
            return;
        }

        let pending = if compiler_options_affect_emit(&old.options, &self.options) {
            FileEmitKind::from_options(&self.options)
        } else {
            pending_emit_kind_for_options(&self.options, &old.options)
        };
        if pending.is_empty() {
            return;
        }
        debug!(kind = %pending, "emit options changed");
        let unchanged: Vec<FilePath> = program
            .source_files()
            .iter()
            .map(SourceFile::path)
            .filter(|path| !self.changed_files_set.contains(*path))
            .cloned()
            .collect();
        for path in unchanged {
            self.add_file_to_affected_files_pending_emit(path, pending);
        }
        self.build_info_emit_pending = true;
    }

    /// Whether cross-file references are recorded.
    pub fn tracks_references(&self) -> bool {
        self.options.tracks_references()
    }

    pub(crate) fn add_file_to_change_set(&mut self, path: FilePath) {
        self.changed_files_set.insert(path);
        self.build_info_emit_pending = true;
    }

    pub(crate) fn add_file_to_affected_files_pending_emit(&mut self, path: FilePath, kind: FileEmitKind) {
        self.emit_diagnostics_per_file.remove(&path);
        *self.affected_files_pending_emit.entry(path).or_default() |= kind;
    }

    /// Every file but the default library, `first` leading. Computed once per
    /// generation.
    pub(crate) fn all_files_excluding_default_library(
        &mut self,
        program: &dyn Program,
        first: Option<&FilePath>,
    ) -> Vec<FilePath> {
        if let Some(files) = &self.all_files_excluding_default_library {
            return files.clone();
        }
        let files: Vec<FilePath> = first
            .into_iter()
            .chain(
                program
                    .source_files()
                    .iter()
                    .map(SourceFile::path)
                    .filter(|path| Some(*path) != first),
            )
            .filter(|path| !program.is_source_file_default_library(path))
            .cloned()
            .collect();
        self.all_files_excluding_default_library = Some(files.clone());
        files
    }

    /// The options this snapshot was built for.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Per-file version and shape metadata.
    pub fn file_info(&self, path: &FilePath) -> Option<&FileInfo> {
        self.file_infos.get(path)
    }

    /// All file metadata, sorted by path.
    pub fn file_infos(&self) -> Vec<(&FilePath, &FileInfo)> {
        let mut infos: Vec<_> = self.file_infos.iter().collect();
        infos.sort_by(|a, b| a.0.cmp(b.0));
        infos
    }

    /// The reference graph, absent when references are not tracked.
    pub fn referenced_map(&self) -> Option<&ReferenceGraph> {
        self.referenced_map.as_ref()
    }

    /// Files whose changes have not been fully processed.
    pub fn changed_files(&self) -> &BTreeSet<FilePath> {
        &self.changed_files_set
    }

    /// Outputs still owed per file.
    pub fn affected_files_pending_emit(&self) -> &BTreeMap<FilePath, FileEmitKind> {
        &self.affected_files_pending_emit
    }

    /// Returns `true` if semantic diagnostics of `path` are cached.
    pub fn has_semantic_diagnostics(&self, path: &FilePath) -> bool {
        self.semantic_diagnostics_per_file.contains_key(path)
    }

    /// Cached semantic diagnostics of `path`.
    pub fn semantic_diagnostics_of(&self, path: &FilePath) -> Option<&[strata_diagnostics::Diagnostic]> {
        self.semantic_diagnostics_per_file
            .get(path)
            .map(|cached| cached.diagnostics(path))
    }

    /// Cached declaration diagnostics of `path`.
    pub fn emit_diagnostics_of(&self, path: &FilePath) -> Option<&[strata_diagnostics::Diagnostic]> {
        self.emit_diagnostics_per_file
            .get(path)
            .map(|cached| cached.diagnostics(path))
    }

    /// Number of cached errors across semantic and declaration diagnostics.
    pub fn cached_error_count(&self) -> usize {
        self.semantic_diagnostics_per_file
            .iter()
            .chain(self.emit_diagnostics_per_file.iter())
            .map(|(path, cached)| cached.diagnostics(path).iter().filter(|d| d.is_error()).count())
            .sum()
    }

    /// The last recorded `.d.ts` hash of `path` in a composite build.
    pub fn emit_signature(&self, path: &FilePath) -> Option<&EmitSignature> {
        self.emit_signatures.get(path)
    }

    /// The most recently changed declaration output.
    pub fn latest_changed_dts_file(&self) -> Option<&str> {
        self.latest_changed_dts_file.as_deref()
    }

    /// Whether the program had errors, once computed.
    pub fn has_errors(&self) -> Option<bool> {
        self.has_errors
    }

    /// Semantic checking was skipped and still has to run.
    pub fn check_pending(&self) -> bool {
        self.check_pending
    }

    /// The build-info file is out of date.
    pub fn build_info_emit_pending(&self) -> bool {
        self.build_info_emit_pending
    }

    /// Returns `true` if a `.d.ts` hash changed this generation.
    pub fn has_changed_emit_signature(&self) -> bool {
        self.has_changed_emit_signature
    }
}

fn references_changed(
    program: &dyn Program,
    old: &Snapshot,
    path: &FilePath,
    new_references: Option<&BTreeSet<FilePath>>,
) -> bool {
    let old_references = old.referenced_map.as_ref().and_then(|graph| graph.references(path));
    if old_references != new_references {
        return true;
    }
    new_references
        .into_iter()
        .flatten()
        .any(|reference| program.source_file(reference).is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_program::{CompilerProgram, MemoryHost};

    fn program(files: &[(&str, &str)], options: CompilerOptions) -> CompilerProgram {
        let host = Arc::new(MemoryHost::with_files("/p", files.iter().copied()));
        let roots = files.iter().map(|(name, _)| name.to_string()).collect();
        CompilerProgram::new_without_default_library(roots, options, host)
    }

    fn path(name: &str) -> FilePath {
        FilePath::from_canonical(name)
    }

    fn module_options() -> CompilerOptions {
        CompilerOptions {
            module: Some(strata_config::ModuleKind::EsNext),
            incremental: true,
            ..CompilerOptions::default()
        }
    }

    #[test]
    fn cold_snapshot_marks_every_file_changed() {
        let program = program(
            &[("/p/a.ts", "export const x = 1;"), ("/p/b.ts", "import { x } from './a';\nexport const y = x + 1;")],
            module_options(),
        );
        let snapshot = Snapshot::new(&program, None);
        assert_eq!(
            snapshot.changed_files().iter().collect::<Vec<_>>(),
            vec![&path("/p/a.ts"), &path("/p/b.ts")]
        );
        assert!(snapshot.build_info_emit_pending());
        let graph = snapshot.referenced_map().unwrap();
        assert_eq!(
            graph.referenced_by(&path("/p/a.ts")).unwrap().iter().collect::<Vec<_>>(),
            vec![&path("/p/b.ts")]
        );
        assert_eq!(snapshot.file_info(&path("/p/a.ts")).unwrap().signature, "");
    }

    #[test]
    fn unchanged_program_reuses_state() {
        let files = [("/p/a.ts", "export const x = 1;")];
        let mut first = Snapshot::new(&program(&files, module_options()), None);
        first.changed_files_set.clear();
        first.build_info_emit_pending = false;
        first
            .semantic_diagnostics_per_file
            .insert(path("/p/a.ts"), Arc::new(CachedDiagnostics::empty()));

        let second = Snapshot::new(&program(&files, module_options()), Some(&first));
        assert!(second.changed_files().is_empty());
        assert!(second.affected_files_pending_emit().is_empty());
        assert!(!second.build_info_emit_pending());
        assert!(second.has_semantic_diagnostics(&path("/p/a.ts")));
    }

    #[test]
    fn reference_tracking_toggle_discards_old_state() {
        let files = [("/p/a.ts", "export const x = 1;")];
        let mut first = Snapshot::new(&program(&files, module_options()), None);
        first.changed_files_set.clear();
        let none = CompilerOptions {
            module: Some(strata_config::ModuleKind::None),
            ..module_options()
        };
        let second = Snapshot::new(&program(&files, none), Some(&first));
        assert!(second.referenced_map().is_none());
        assert_eq!(second.changed_files().len(), 1);
    }
}
