//! Snapshot to build info.

use super::{
    BuildInfo, BuildInfoDiagnostic, BuildInfoDiagnosticFile, BuildInfoFileInfo, DiagnosticsOfFile,
    EmitSignatureEntry, FileIdListId, PendingEmitEntry, SemanticDiagnosticsEntry, BUILD_INFO_VERSION,
};
use crate::diagnostics_cache::{PersistedDiagnostic, PersistedFile};
use crate::emit_kind::FileEmitKind;
use crate::file_info::FileInfo;
use crate::signature::EmitSignature;
use crate::snapshot::Snapshot;
use std::collections::{BTreeSet, HashMap};
use std::num::NonZeroU32;
use strata_common::path::{ensure_path_is_non_module_name, get_relative_path_from_directory};
use strata_common::{FileId, FileIdInterner, FilePath};
use strata_config::{get_build_info_directory, options_to_build_info};
use strata_program::{Program, ResolutionMode};

impl BuildInfo {
    /// Encodes `snapshot` for the build-info file at `build_info_file`, an
    /// absolute path.
    ///
    /// Program files get the first ids, in program order, so that
    /// `fileInfos` lines up with `fileNames`.
    pub fn from_snapshot(snapshot: &Snapshot, program: &dyn Program, build_info_file: &str) -> BuildInfo {
        let mut encoder = Encoder {
            snapshot,
            program,
            directory: get_build_info_directory(build_info_file),
            case_sensitive: program.use_case_sensitive_file_names(),
            file_ids: FileIdInterner::new(),
            file_id_lists: HashMap::new(),
            build_info: BuildInfo {
                version: BUILD_INFO_VERSION.to_string(),
                errors: snapshot.has_errors == Some(true),
                check_pending: snapshot.check_pending,
                ..BuildInfo::default()
            },
        };
        encoder.file_infos();
        encoder.options();
        encoder.referenced_map();
        encoder.change_file_set();
        encoder.semantic_diagnostics();
        encoder.emit_diagnostics();
        encoder.affected_files_pending_emit();
        encoder.latest_changed_dts_file();

        let mut build_info = encoder.build_info;
        build_info.file_names = encoder.file_ids.names();
        build_info
    }
}

struct Encoder<'a> {
    snapshot: &'a Snapshot,
    program: &'a dyn Program,
    directory: String,
    case_sensitive: bool,
    file_ids: FileIdInterner,
    file_id_lists: HashMap<Vec<FileId>, FileIdListId>,
    build_info: BuildInfo,
}

impl Encoder<'_> {
    fn relative(&self, path: &str) -> String {
        ensure_path_is_non_module_name(&get_relative_path_from_directory(
            &self.directory,
            path,
            self.case_sensitive,
        ))
    }

    fn file_id(&self, path: &FilePath) -> FileId {
        self.file_ids.intern(&self.relative(path.as_str()))
    }

    fn file_id_list(&mut self, files: &BTreeSet<FilePath>) -> FileIdListId {
        let mut ids: Vec<FileId> = files.iter().map(|file| self.file_id(file)).collect();
        ids.sort_unstable();
        if let Some(&existing) = self.file_id_lists.get(&ids) {
            return existing;
        }
        let count = u32::try_from(self.build_info.file_ids_list.len()).unwrap_or(u32::MAX);
        let list_id = FileIdListId(NonZeroU32::MIN.saturating_add(count));
        self.build_info.file_ids_list.push(ids.clone());
        self.file_id_lists.insert(ids, list_id);
        list_id
    }

    /// The shape signature to persist: the value from before an unfinished
    /// batch started, so that the next build redoes the batch.
    fn actual_signature<'s>(&'s self, path: &FilePath, info: &'s FileInfo) -> &'s str {
        self.snapshot
            .batch
            .as_ref()
            .and_then(|batch| batch.rollback.get(path))
            .map_or(info.signature.as_str(), String::as_str)
    }

    fn file_infos(&mut self) {
        let (snapshot, program) = (self.snapshot, self.program);
        let composite = snapshot.options.composite;
        for file in program.source_files() {
            let path = file.path();
            let id = self.file_id(path);
            let info = snapshot
                .file_infos
                .get(path)
                .cloned()
                .unwrap_or_else(|| FileInfo {
                    signature: String::new(),
                    ..FileInfo::new(String::new(), false, ResolutionMode::None)
                });
            let signature = self.actual_signature(path, &info).to_string();

            if composite && !file.is_json_file() && program.source_file_may_be_emitted(file, false) {
                let entry = match snapshot.emit_signatures.get(path) {
                    None => Some(EmitSignatureEntry::NotEmitted(id)),
                    Some(EmitSignature::Current(hash)) if *hash != signature => {
                        Some(EmitSignatureEntry::Signature(id, hash.clone()))
                    }
                    Some(EmitSignature::Current(_)) => None,
                    Some(EmitSignature::DifferentOptions(hash)) if *hash == signature => {
                        Some(EmitSignatureEntry::DifferentOptions(id, Vec::new()))
                    }
                    Some(EmitSignature::DifferentOptions(hash)) => {
                        Some(EmitSignatureEntry::DifferentOptions(id, vec![hash.clone()]))
                    }
                };
                self.build_info.emit_signatures.extend(entry);
            }

            self.build_info
                .file_infos
                .push(BuildInfoFileInfo(FileInfo { signature, ..info }));
        }
    }

    fn options(&mut self) {
        self.build_info.options =
            options_to_build_info(&self.snapshot.options, &self.directory, self.case_sensitive);
    }

    fn referenced_map(&mut self) {
        let snapshot = self.snapshot;
        let Some(graph) = snapshot.referenced_map.as_ref() else {
            return;
        };
        for file in graph.files() {
            let Some(references) = graph.references(file) else {
                continue;
            };
            let id = self.file_id(file);
            let list = self.file_id_list(references);
            self.build_info.referenced_map.push((id, list));
        }
    }

    fn change_file_set(&mut self) {
        let snapshot = self.snapshot;
        for path in &snapshot.changed_files_set {
            let id = self.file_id(path);
            self.build_info.change_file_set.push(id);
        }
        self.build_info.change_file_set.sort_unstable();
    }

    fn semantic_diagnostics(&mut self) {
        let (snapshot, program) = (self.snapshot, self.program);
        for file in program.source_files() {
            let path = file.path();
            let id = self.file_id(path);
            match snapshot.semantic_diagnostics_per_file.get(path) {
                None if !snapshot.changed_files_set.contains(path) => {
                    self.build_info
                        .semantic_diagnostics_per_file
                        .push(SemanticDiagnosticsEntry::Pending(id));
                }
                Some(cached) if !cached.is_empty() => {
                    let diagnostics = self.diagnostics(&cached.to_persisted(path));
                    self.build_info
                        .semantic_diagnostics_per_file
                        .push(SemanticDiagnosticsEntry::Diagnostics(id, diagnostics));
                }
                _ => {}
            }
        }
    }

    fn emit_diagnostics(&mut self) {
        let snapshot = self.snapshot;
        for (path, cached) in &snapshot.emit_diagnostics_per_file {
            let id = self.file_id(path);
            let diagnostics = self.diagnostics(&cached.to_persisted(path));
            self.build_info
                .emit_diagnostics_per_file
                .push(DiagnosticsOfFile(id, diagnostics));
        }
        self.build_info.emit_diagnostics_per_file.sort_by_key(|entry| entry.0);
    }

    fn affected_files_pending_emit(&mut self) {
        let (snapshot, program) = (self.snapshot, self.program);
        let full = FileEmitKind::from_options(&snapshot.options);
        for (path, &kind) in &snapshot.affected_files_pending_emit {
            match program.source_file(path) {
                Some(file) if program.source_file_may_be_emitted(file, false) => {}
                _ => continue,
            }
            let id = self.file_id(path);
            let entry = if kind == full {
                PendingEmitEntry::Full(id)
            } else if kind == FileEmitKind::DTS {
                PendingEmitEntry::Dts([id])
            } else {
                PendingEmitEntry::Kind(id, kind.bits())
            };
            self.build_info.affected_files_pending_emit.push(entry);
        }
        self.build_info
            .affected_files_pending_emit
            .sort_by_key(PendingEmitEntry::file_id);
    }

    fn latest_changed_dts_file(&mut self) {
        let snapshot = self.snapshot;
        self.build_info.latest_changed_dts_file = snapshot
            .latest_changed_dts_file
            .as_deref()
            .map(|file| self.relative(file));
    }

    fn diagnostics(&self, diagnostics: &[PersistedDiagnostic]) -> Vec<BuildInfoDiagnostic> {
        diagnostics.iter().map(|diag| self.diagnostic(diag)).collect()
    }

    fn diagnostic(&self, diag: &PersistedDiagnostic) -> BuildInfoDiagnostic {
        let file = match &diag.file {
            PersistedFile::Owner => None,
            PersistedFile::Global => Some(BuildInfoDiagnosticFile::Global(false)),
            PersistedFile::Other(path) => Some(BuildInfoDiagnosticFile::File(self.file_id(path))),
        };
        BuildInfoDiagnostic {
            file,
            pos: diag.pos,
            end: diag.end,
            code: diag.code,
            category: diag.category.as_u8(),
            message: diag.message.clone(),
            message_chain: self.diagnostics(&diag.message_chain),
            related_information: self.diagnostics(&diag.related_information),
            reports_unnecessary: diag.reports_unnecessary,
            reports_deprecated: diag.reports_deprecated,
            skipped_on_no_emit: diag.skipped_on_no_emit,
        }
    }
}
