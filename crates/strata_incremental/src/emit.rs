//! The emit loop.
//!
//! Each step emits exactly one file: first the files the worklist hands
//! out, then files that still owe outputs from an earlier generation or an
//! option change, then files whose cached declaration diagnostics have not
//! been reported. The build-info file is written last, once nothing else is
//! owed.

use crate::build_info::BuildInfo;
use crate::diagnostics_cache::CachedDiagnostics;
use crate::emit_kind::{pending_emit_kind, pending_emit_kind_with_seen, FileEmitKind};
use crate::signature::{compute_signature_with_diagnostics, text_for_signature, EmitSignature};
use crate::snapshot::Snapshot;
use std::io;
use std::sync::Arc;
use strata_common::path::{get_normalized_absolute_path, is_declaration_file_name};
use strata_common::{compute_hash, FilePath};
use strata_config::get_build_info_file_path;
use strata_diagnostics::Diagnostic;
use strata_program::{
    could_not_write_file, EmitOnly, EmitOptions, EmitResult, Program, WriteFile, WriteFileData,
};
use tracing::{debug, info, trace};

impl Snapshot {
    /// Emits the next file that owes output, or writes build info once none
    /// does. Returns `None` when there is nothing left to do.
    ///
    /// With `for_dts_errors`, declaration diagnostics are computed instead of
    /// emitting, and build info is never written.
    pub fn emit_next_affected_file(
        &mut self,
        program: &dyn Program,
        emit_only: Option<EmitOnly>,
        writer: &mut dyn WriteFile,
        for_dts_errors: bool,
    ) -> Option<EmitResult> {
        let program_kind = FileEmitKind::from_options(&self.options);
        let (path, kind) = match self.next_affected_file(program) {
            Some(path) => {
                let kind = if for_dts_errors {
                    FileEmitKind::DTS_ERRORS
                } else if emit_only == Some(EmitOnly::Dts) {
                    program_kind & FileEmitKind::ALL_DTS
                } else {
                    program_kind
                };
                (path, kind)
            }
            None => {
                if let Some(pending) = self.next_affected_file_pending_emit(program, emit_only, for_dts_errors) {
                    pending
                } else if let Some(diagnostics) = self.next_pending_emit_diagnostics_file(program, for_dts_errors) {
                    return Some(EmitResult {
                        emit_skipped: true,
                        diagnostics,
                        emitted_files: Vec::new(),
                    });
                } else if for_dts_errors || self.build_info_write_failed {
                    return None;
                } else {
                    return self.emit_build_info(program, writer);
                }
            }
        };

        trace!(file = %path, %kind, "emitting");
        let result = if for_dts_errors {
            EmitResult {
                emit_skipped: true,
                diagnostics: program
                    .source_file(&path)
                    .map(|file| program.declaration_diagnostics(file))
                    .unwrap_or_default(),
                emitted_files: Vec::new(),
            }
        } else if kind.is_empty() {
            EmitResult::default()
        } else {
            let options = EmitOptions {
                target_source_file: Some(path.clone()),
                emit_only: kind.emit_only(),
            };
            self.emit_with_signature_tracking(program, &options, writer)
        };

        self.commit_affected_file(&path);
        let seen = self.seen_emitted_files.get(&path).copied().unwrap_or_default();
        self.seen_emitted_files.insert(path.clone(), kind | seen);
        if result.emit_skipped && !for_dts_errors {
            // A failed write leaves the outputs owed for the next build.
            debug!(file = %path, "emit failed; outputs stay pending");
            return Some(result);
        }
        let existing = self
            .affected_files_pending_emit
            .get(&path)
            .copied()
            .unwrap_or(program_kind);
        let pending = pending_emit_kind(existing, kind | seen);
        if pending.is_empty() {
            self.affected_files_pending_emit.remove(&path);
        } else {
            self.affected_files_pending_emit.insert(path.clone(), pending);
        }
        if !result.diagnostics.is_empty() {
            self.emit_diagnostics_per_file
                .insert(path, Arc::new(CachedDiagnostics::resolved(result.diagnostics.clone())));
        }
        Some(result)
    }

    /// A file still owing outputs not produced yet this generation, with the
    /// outputs it owes. Entries for files that left the program, or can no
    /// longer be emitted, are dropped.
    fn next_affected_file_pending_emit(
        &mut self,
        program: &dyn Program,
        emit_only: Option<EmitOnly>,
        for_dts_errors: bool,
    ) -> Option<(FilePath, FileEmitKind)> {
        let mut stale = Vec::new();
        let mut found = None;
        for (path, &kind) in &self.affected_files_pending_emit {
            match program.source_file(path) {
                Some(file) if program.source_file_may_be_emitted(file, false) => {}
                _ => {
                    stale.push(path.clone());
                    continue;
                }
            }
            let seen = self.seen_emitted_files.get(path).copied().unwrap_or_default();
            let pending = pending_emit_kind_with_seen(kind, seen, emit_only, for_dts_errors);
            if !pending.is_empty() {
                found = Some((path.clone(), pending));
                break;
            }
        }
        for path in stale {
            trace!(file = %path, "dropping pending emit of non-emittable file");
            self.affected_files_pending_emit.remove(&path);
        }
        found
    }

    /// A file with cached declaration diagnostics not reported yet this
    /// generation. The file is marked as reported.
    fn next_pending_emit_diagnostics_file(
        &mut self,
        program: &dyn Program,
        for_dts_errors: bool,
    ) -> Option<Vec<Diagnostic>> {
        let all_dts = FileEmitKind::all_dts(for_dts_errors);
        let mut stale = Vec::new();
        let mut found = None;
        for (path, cached) in &self.emit_diagnostics_per_file {
            match program.source_file(path) {
                Some(file) if program.source_file_may_be_emitted(file, false) => {}
                _ => {
                    stale.push(path.clone());
                    continue;
                }
            }
            let seen = self.seen_emitted_files.get(path).copied().unwrap_or_default();
            if (seen & all_dts).is_empty() {
                found = Some((path.clone(), seen, cached.diagnostics(path).to_vec()));
                break;
            }
        }
        for path in stale {
            self.emit_diagnostics_per_file.remove(&path);
        }
        let (path, seen, diagnostics) = found?;
        trace!(file = %path, "reporting cached declaration diagnostics");
        self.seen_emitted_files.insert(path, seen | all_dts);
        Some(diagnostics)
    }

    /// Emits through a writer that keeps shape and emit signatures in step
    /// with the declaration files written.
    pub(crate) fn emit_with_signature_tracking(
        &mut self,
        program: &dyn Program,
        options: &EmitOptions,
        writer: &mut dyn WriteFile,
    ) -> EmitResult {
        let Some(file) = options.target_source_file.clone() else {
            return program.emit(options, writer);
        };
        if !self.options.emit_declarations() {
            return program.emit(options, writer);
        }
        let mut tracking = SignatureTrackingWriter {
            snapshot: self,
            file,
            inner: writer,
        };
        program.emit(options, &mut tracking)
    }

    /// Records the emit signature of a composite build's declaration file.
    ///
    /// Returns `true` when the declaration file is unchanged and must not be
    /// written.
    fn skip_dts_output_of_composite(
        &mut self,
        file: &FilePath,
        output_file_name: &str,
        text: &str,
        data: &mut WriteFileData,
        new_signature: Option<String>,
    ) -> bool {
        if !self.options.composite {
            return false;
        }
        let new_signature = new_signature.unwrap_or_else(|| compute_hash(text_for_signature(text, data)));
        match self.emit_signatures.get(file) {
            Some(EmitSignature::Current(old)) if *old == new_signature => {
                trace!(file = %file, "declaration output unchanged");
                data.skipped_dts_write = true;
                return true;
            }
            Some(EmitSignature::DifferentOptions(old)) if *old == new_signature => {
                data.differs_only_in_map = true;
            }
            _ => {
                self.has_changed_emit_signature = true;
                self.latest_changed_dts_file = Some(output_file_name.to_string());
            }
        }
        self.emit_signatures
            .insert(file.clone(), EmitSignature::Current(new_signature));
        false
    }

    /// Writes the build-info file when it is out of date.
    ///
    /// Returns `None` when no build info is configured or nothing changed.
    pub(crate) fn emit_build_info(&mut self, program: &dyn Program, writer: &mut dyn WriteFile) -> Option<EmitResult> {
        let file_name = get_build_info_file_path(&self.options)?;
        let file_name = get_normalized_absolute_path(&file_name, program.current_directory());
        self.ensure_has_errors(program);
        if !self.build_info_emit_pending && self.has_errors_from_old_state == self.has_errors {
            return None;
        }

        let build_info = BuildInfo::from_snapshot(self, program, &file_name);
        let written = serde_json::to_string(&build_info)
            .map_err(io::Error::other)
            .and_then(|text| {
                let mut data = WriteFileData {
                    build_info: true,
                    ..WriteFileData::default()
                };
                writer.write_file(&file_name, &text, false, &mut data)
            });
        if let Err(error) = written {
            self.build_info_write_failed = true;
            return Some(EmitResult {
                emit_skipped: true,
                diagnostics: vec![could_not_write_file(&file_name, &error)],
                emitted_files: Vec::new(),
            });
        }

        info!(file = %file_name, files = build_info.file_names.len(), "wrote build info");
        self.build_info_emit_pending = false;
        self.has_errors_from_old_state = self.has_errors;
        Some(EmitResult {
            emit_skipped: false,
            diagnostics: Vec::new(),
            emitted_files: if self.options.list_emitted_files {
                vec![file_name]
            } else {
                Vec::new()
            },
        })
    }

    /// Decides whether the program has errors, once per generation.
    ///
    /// Incremental build info records diagnostics per file, so cached
    /// diagnostics only count towards `has_errors` for non-incremental build
    /// info.
    fn ensure_has_errors(&mut self, program: &dyn Program) {
        if self.has_errors.is_some() {
            return;
        }
        let incremental = self.options.is_incremental();
        let has_cached = program.source_files().iter().any(|file| {
            let path = file.path();
            match self.semantic_diagnostics_per_file.get(path) {
                None => incremental,
                Some(cached) => !cached.is_empty() || self.emit_diagnostics_per_file.contains_key(path),
            }
        });
        let has_errors = if has_cached {
            !incremental
        } else {
            !program.config_file_parsing_diagnostics().is_empty()
                || !program.syntactic_diagnostics(None).is_empty()
                || !program.bind_diagnostics(None).is_empty()
                || !program.options_diagnostics().is_empty()
        };
        self.has_errors = Some(has_errors);
    }
}

/// Wraps the caller's writer for one targeted emit, hashing declaration
/// output as it passes through.
struct SignatureTrackingWriter<'a> {
    snapshot: &'a mut Snapshot,
    file: FilePath,
    inner: &'a mut dyn WriteFile,
}

impl SignatureTrackingWriter<'_> {
    /// Replaces a version-as-shape signature with the real declaration hash.
    /// Returns the emit signature, absent when the declaration file has
    /// diagnostics.
    fn update_signature(&mut self, text: &str, data: &WriteFileData) -> Option<String> {
        let info = self.snapshot.file_infos.get(&self.file)?;
        if info.signature != info.version {
            return None;
        }
        let signature = compute_signature_with_diagnostics(&self.file, text, data);
        let emit_signature = data.diagnostics.is_empty().then(|| signature.clone());
        if signature != info.version {
            let prior = info.signature.clone();
            if let Some(batch) = self.snapshot.batch.as_mut() {
                batch.rollback.entry(self.file.clone()).or_insert(prior);
            }
            if let Some(info) = self.snapshot.file_infos.get_mut(&self.file) {
                info.signature = signature;
            }
        }
        emit_signature
    }
}

impl WriteFile for SignatureTrackingWriter<'_> {
    fn write_file(
        &mut self,
        file_name: &str,
        text: &str,
        write_byte_order_mark: bool,
        data: &mut WriteFileData,
    ) -> io::Result<()> {
        if is_declaration_file_name(file_name) {
            let emit_signature = self.update_signature(text, data);
            let file = self.file.clone();
            if self
                .snapshot
                .skip_dts_output_of_composite(&file, file_name, text, data, emit_signature)
            {
                return Ok(());
            }
        }
        self.inner.write_file(file_name, text, write_byte_order_mark, data)
    }
}
