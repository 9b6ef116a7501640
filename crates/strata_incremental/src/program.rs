//! [`IncrementalProgram`]: a program paired with the snapshot that tracks
//! what changed since the previous build.

use crate::build_info::BuildInfo;
use crate::error::BuildInfoError;
use crate::snapshot::Snapshot;
use std::io;
use std::sync::Arc;
use strata_common::path::get_normalized_absolute_path;
use strata_common::FilePath;
use strata_config::{get_build_info_file_path, CompilerOptions};
use strata_diagnostics::Diagnostic;
use strata_program::{EmitOptions, EmitResult, Host, HostWriter, Program, SourceFile, WriteFile, WriteFileData};
use tracing::{debug, warn};

/// A program whose diagnostics and emit only redo the work its changes
/// require.
pub struct IncrementalProgram {
    program: Arc<dyn Program>,
    snapshot: Snapshot,
}

impl IncrementalProgram {
    /// Pairs `program` with a snapshot diffed against `old`, the state left
    /// by the previous build or decoded from its build info.
    pub fn new(program: Arc<dyn Program>, old: Option<&Snapshot>) -> Self {
        let snapshot = Snapshot::new(program.as_ref(), old);
        Self { program, snapshot }
    }

    /// The underlying program.
    pub fn program(&self) -> &dyn Program {
        self.program.as_ref()
    }

    /// The current state.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Consumes the program, keeping the state to seed the next build.
    pub fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }

    /// Returns the next file affected by a pending change.
    ///
    /// See [`Snapshot::next_affected_file`].
    pub fn next_affected_file(&mut self) -> Option<FilePath> {
        self.snapshot.next_affected_file(self.program.as_ref())
    }

    /// Confirms that the file last returned by
    /// [`next_affected_file`](Self::next_affected_file) was handled.
    pub fn commit_affected_file(&mut self, path: &FilePath) {
        self.snapshot.commit_affected_file(path);
    }

    /// Semantic diagnostics of the next affected file, or `None` when every
    /// change has been processed.
    pub fn semantic_diagnostics_of_next_affected_file(&mut self) -> Option<Vec<Diagnostic>> {
        self.snapshot
            .semantic_diagnostics_of_next_affected_file(self.program.as_ref())
    }

    /// Emits the next file owing output. See
    /// [`Snapshot::emit_next_affected_file`].
    pub fn emit_next_affected_file(&mut self, options: &EmitOptions, writer: &mut dyn WriteFile) -> Option<EmitResult> {
        self.snapshot
            .emit_next_affected_file(self.program.as_ref(), options.emit_only, writer, false)
    }

    /// Errors in the configuration file.
    pub fn config_file_parsing_diagnostics(&self) -> Vec<Diagnostic> {
        self.program.config_file_parsing_diagnostics()
    }

    /// Errors in the option combination.
    pub fn options_diagnostics(&self) -> Vec<Diagnostic> {
        self.program.options_diagnostics()
    }

    /// Diagnostics not tied to a file.
    pub fn global_diagnostics(&self) -> Vec<Diagnostic> {
        self.program.global_diagnostics()
    }

    /// Parse errors of `file`, or of every file.
    pub fn syntactic_diagnostics(&self, file: Option<&FilePath>) -> Vec<Diagnostic> {
        match self.source_file(file) {
            Ok(file) => self.program.syntactic_diagnostics(file),
            Err(()) => Vec::new(),
        }
    }

    /// Binding errors of `file`, or of every file.
    pub fn bind_diagnostics(&self, file: Option<&FilePath>) -> Vec<Diagnostic> {
        match self.source_file(file) {
            Ok(file) => self.program.bind_diagnostics(file),
            Err(()) => Vec::new(),
        }
    }

    /// Type errors of `file`, or of every file.
    ///
    /// Pending changes are processed first, so the result reflects the
    /// current program. Files whose cached diagnostics survived the change
    /// are not checked again.
    pub fn semantic_diagnostics(&mut self, file: Option<&FilePath>) -> Vec<Diagnostic> {
        let program = self.program.as_ref();
        let Some(path) = file else {
            return self.snapshot.collect_semantic_diagnostics(program);
        };
        if self.snapshot.options.no_check {
            return Vec::new();
        }
        while let Some(affected) = self.snapshot.next_affected_file(program) {
            self.snapshot.commit_affected_file(&affected);
        }
        match program.source_file(path) {
            Some(file) => self.snapshot.semantic_diagnostics_of_file(program, file),
            None => Vec::new(),
        }
    }

    /// Declaration diagnostics of `file`, or of every file that has some.
    ///
    /// Processes pending changes in declaration-errors mode: nothing is
    /// written, and the results are cached for later emits.
    pub fn declaration_diagnostics(&mut self, file: Option<&FilePath>) -> Vec<Diagnostic> {
        let program = self.program.as_ref();
        let mut discard = |_: &str, _: &str, _: bool, _: &mut WriteFileData| -> io::Result<()> { Ok(()) };
        let mut collected = Vec::new();
        while let Some(result) = self
            .snapshot
            .emit_next_affected_file(program, None, &mut discard, true)
        {
            if file.is_none() {
                collected.extend(result.diagnostics);
            }
        }
        match file {
            None => collected,
            Some(path) => self
                .snapshot
                .emit_diagnostics_of(path)
                .map(<[Diagnostic]>::to_vec)
                .unwrap_or_default(),
        }
    }

    /// Emits every file owing output, then the build info.
    ///
    /// With a target file in `options`, only that file is emitted and the
    /// pending state is left alone. Under `no_emit`, or `no_emit_on_error`
    /// with errors present, nothing but the build info is written and the
    /// result is skipped.
    pub fn emit(&mut self, options: &EmitOptions, writer: &mut dyn WriteFile) -> EmitResult {
        self.snapshot.build_info_write_failed = false;
        let program = Arc::clone(&self.program);
        let program = program.as_ref();

        let skipped = if self.snapshot.options.no_emit {
            Some(EmitResult {
                emit_skipped: true,
                ..EmitResult::default()
            })
        } else {
            self.no_emit_on_error_result(options)
        };
        if let Some(mut result) = skipped {
            if options.target_source_file.is_some() {
                return result;
            }
            if let Some(build_info) = self.snapshot.emit_build_info(program, writer) {
                result.diagnostics.extend(build_info.diagnostics);
                result.emitted_files.extend(build_info.emitted_files);
            }
            return result;
        }

        if options.target_source_file.is_some() {
            return self
                .snapshot
                .emit_with_signature_tracking(program, options, writer);
        }

        let mut results = Vec::new();
        while let Some(result) = self
            .snapshot
            .emit_next_affected_file(program, options.emit_only, writer, false)
        {
            results.push(result);
        }
        EmitResult::combine(results)
    }

    /// [`emit`](Self::emit) through the program's host.
    pub fn emit_to_host(&mut self, options: &EmitOptions) -> EmitResult {
        let program = Arc::clone(&self.program);
        let mut writer = HostWriter(program.host());
        self.emit(options, &mut writer)
    }

    /// The skipped result `no_emit_on_error` calls for, if any diagnostics
    /// stand in the way of emitting.
    fn no_emit_on_error_result(&mut self, options: &EmitOptions) -> Option<EmitResult> {
        if !self.snapshot.options.no_emit_on_error {
            return None;
        }
        let target = options.target_source_file.as_ref();
        let mut diagnostics = self.config_file_parsing_diagnostics();
        diagnostics.extend(self.options_diagnostics());
        diagnostics.extend(self.syntactic_diagnostics(target));
        if diagnostics.is_empty() {
            diagnostics.extend(self.global_diagnostics());
            diagnostics.extend(self.semantic_diagnostics(target));
        }
        if diagnostics.is_empty() && self.snapshot.options.emit_declarations() {
            diagnostics.extend(self.declaration_diagnostics(target));
        }
        if diagnostics.is_empty() {
            return None;
        }
        debug!(count = diagnostics.len(), "skipping emit: program has errors");
        Some(EmitResult {
            emit_skipped: true,
            diagnostics,
            emitted_files: Vec::new(),
        })
    }

    /// Resolves an optional path. `Err` when a path was given but is not in
    /// the program.
    fn source_file(&self, file: Option<&FilePath>) -> Result<Option<&SourceFile>, ()> {
        match file {
            None => Ok(None),
            Some(path) => self.program.source_file(path).map(Some).ok_or(()),
        }
    }
}

/// Reads and parses the build-info file at `build_info_file`.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_build_info(build_info_file: &str, host: &dyn Host) -> Result<Option<BuildInfo>, BuildInfoError> {
    let Some(text) = host.read_file(build_info_file) else {
        return Ok(None);
    };
    BuildInfo::parse(&text).map(Some)
}

/// Loads the state persisted by the previous build, to seed an
/// [`IncrementalProgram`].
///
/// Fail-safe: a missing, unreadable, outdated or corrupt build-info file
/// yields `None`, and the build starts from scratch.
pub fn read_build_info_program(options: &CompilerOptions, host: &dyn Host) -> Option<Snapshot> {
    let file = get_build_info_file_path(options)?;
    let file = get_normalized_absolute_path(&file, host.current_directory());
    let build_info = match read_build_info(&file, host) {
        Ok(Some(build_info)) => build_info,
        Ok(None) => {
            debug!(file = %file, "no previous build info");
            return None;
        }
        Err(error) => {
            warn!(file = %file, %error, "discarding build info");
            return None;
        }
    };
    if !build_info.is_incremental() {
        debug!(file = %file, "build info holds no incremental state");
        return None;
    }
    match build_info.to_snapshot(&file, host.current_directory(), host.use_case_sensitive_file_names()) {
        Ok(snapshot) => {
            debug!(file = %file, files = build_info.file_names.len(), "loaded previous build state");
            Some(snapshot)
        }
        Err(error) => {
            warn!(file = %file, %error, "discarding build info");
            None
        }
    }
}
