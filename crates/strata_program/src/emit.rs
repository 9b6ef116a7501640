//! Emit requests, results, and the write callback.

use crate::host::Host;
use std::io;
use strata_common::FilePath;
use strata_diagnostics::{messages, Diagnostic};

/// Restricts an emit to one kind of output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EmitOnly {
    /// JavaScript (and its source map) only.
    Js,
    /// Declaration files only, when declarations are enabled.
    Dts,
    /// Declaration text regardless of options; used to compute shape signatures.
    ForcedDts,
}

/// What to emit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmitOptions {
    /// Emit a single file instead of the whole program.
    pub target_source_file: Option<FilePath>,
    /// Restrict the output kinds.
    pub emit_only: Option<EmitOnly>,
}

/// The outcome of an emit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmitResult {
    /// Nothing was written.
    pub emit_skipped: bool,
    /// Declaration and write diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    /// Written file names, when listing is enabled.
    pub emitted_files: Vec<String>,
}

impl EmitResult {
    /// A result for an emit that did not run.
    pub fn skipped() -> Self {
        Self {
            emit_skipped: true,
            ..Self::default()
        }
    }

    /// Merges results; the combination is skipped only if every part was.
    pub fn combine(results: impl IntoIterator<Item = EmitResult>) -> EmitResult {
        let mut combined = EmitResult::default();
        let mut any = false;
        let mut all_skipped = true;
        for result in results {
            any = true;
            all_skipped &= result.emit_skipped;
            combined.diagnostics.extend(result.diagnostics);
            combined.emitted_files.extend(result.emitted_files);
        }
        combined.emit_skipped = any && all_skipped;
        combined
    }
}

/// Metadata passed to and returned from a [`WriteFile`] callback.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteFileData {
    /// Offset of the `//# sourceMappingURL=` comment in the written text.
    pub source_map_url_pos: Option<usize>,
    /// Declaration diagnostics of the written `.d.ts`.
    pub diagnostics: Vec<Diagnostic>,
    /// Set by the callback when it decided not to write an unchanged `.d.ts`.
    pub skipped_dts_write: bool,
    /// Set by the callback when a `.d.ts` differs from the last one only in its map.
    pub differs_only_in_map: bool,
    /// The text is a build-info file.
    pub build_info: bool,
}

/// Receives emitted files.
pub trait WriteFile {
    /// Writes one output file.
    fn write_file(
        &mut self,
        file_name: &str,
        text: &str,
        write_byte_order_mark: bool,
        data: &mut WriteFileData,
    ) -> io::Result<()>;
}

impl<F> WriteFile for F
where
    F: FnMut(&str, &str, bool, &mut WriteFileData) -> io::Result<()>,
{
    fn write_file(
        &mut self,
        file_name: &str,
        text: &str,
        write_byte_order_mark: bool,
        data: &mut WriteFileData,
    ) -> io::Result<()> {
        self(file_name, text, write_byte_order_mark, data)
    }
}

/// A [`WriteFile`] that writes straight to a [`Host`].
pub struct HostWriter<'a>(pub &'a dyn Host);

impl WriteFile for HostWriter<'_> {
    fn write_file(
        &mut self,
        file_name: &str,
        text: &str,
        write_byte_order_mark: bool,
        _data: &mut WriteFileData,
    ) -> io::Result<()> {
        self.0.write_file(file_name, text, write_byte_order_mark)
    }
}

/// The diagnostic reported when an output cannot be written.
pub fn could_not_write_file(file_name: &str, error: &io::Error) -> Diagnostic {
    Diagnostic::global(
        &messages::COULD_NOT_WRITE_FILE,
        &[file_name, &error.to_string()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_results() {
        let a = EmitResult {
            emit_skipped: false,
            diagnostics: Vec::new(),
            emitted_files: vec!["a.js".to_string()],
        };
        let b = EmitResult {
            emit_skipped: true,
            diagnostics: vec![Diagnostic::global(&messages::FILE_NOT_FOUND, &["x.ts"])],
            emitted_files: Vec::new(),
        };
        let combined = EmitResult::combine([a, b]);
        assert!(!combined.emit_skipped);
        assert_eq!(combined.diagnostics.len(), 1);
        assert_eq!(combined.emitted_files, vec!["a.js"]);

        assert!(EmitResult::combine([EmitResult::skipped(), EmitResult::skipped()]).emit_skipped);
        assert!(!EmitResult::combine([]).emit_skipped);
    }

    #[test]
    fn closures_are_writers() {
        let mut written = Vec::new();
        let mut writer = |name: &str, text: &str, _bom: bool, _data: &mut WriteFileData| {
            written.push((name.to_string(), text.to_string()));
            Ok(())
        };
        let mut data = WriteFileData::default();
        writer.write_file("a.js", "x", false, &mut data).unwrap();
        assert_eq!(written, vec![("a.js".to_string(), "x".to_string())]);
    }

    #[test]
    fn write_failure_diagnostic() {
        let error = io::Error::new(io::ErrorKind::Other, "disk full");
        let diag = could_not_write_file("/p/a.js", &error);
        assert_eq!(diag.code, 5033);
        assert!(diag.message.contains("/p/a.js") && diag.message.contains("disk full"));
    }
}
