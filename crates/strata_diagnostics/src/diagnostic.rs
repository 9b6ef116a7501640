//! The diagnostic record shared by the frontend and the incremental engine.

use crate::category::Category;
use crate::messages::DiagnosticMessage;
use serde::{Deserialize, Serialize};
use strata_common::FilePath;

/// A structured diagnostic with an optional file location.
///
/// Diagnostics without a file are global (options, configuration). Message
/// chains carry elaboration lines; related information points at other
/// locations, possibly in other files.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The file this diagnostic is reported in, if any.
    pub file: Option<FilePath>,
    /// Start offset in the file's text.
    pub pos: u32,
    /// End offset in the file's text.
    pub end: u32,
    /// The numeric diagnostic code.
    pub code: u32,
    /// The category of this diagnostic.
    pub category: Category,
    /// The main diagnostic message.
    pub message: String,
    /// Nested elaboration messages.
    pub message_chain: Vec<Diagnostic>,
    /// Related locations.
    pub related_information: Vec<Diagnostic>,
    /// The reported code is unnecessary (rendered faded by editors).
    pub reports_unnecessary: bool,
    /// The reported code uses something deprecated.
    pub reports_deprecated: bool,
    /// The diagnostic is suppressed when emit is disabled.
    pub skipped_on_no_emit: bool,
}

impl Diagnostic {
    /// Creates a diagnostic at `pos..end` in `file` from a catalogue message.
    pub fn new(
        file: Option<FilePath>,
        pos: u32,
        end: u32,
        message: &DiagnosticMessage,
        args: &[&str],
    ) -> Self {
        Self {
            file,
            pos,
            end,
            code: message.code,
            category: message.category,
            message: message.format(args),
            message_chain: Vec::new(),
            related_information: Vec::new(),
            reports_unnecessary: false,
            reports_deprecated: false,
            skipped_on_no_emit: false,
        }
    }

    /// Creates a diagnostic located in `file`.
    pub fn at(file: &FilePath, pos: u32, end: u32, message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self::new(Some(file.clone()), pos, end, message, args)
    }

    /// Creates a global diagnostic with no file location.
    pub fn global(message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self::new(None, 0, 0, message, args)
    }

    /// Returns the length of the reported range.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.pos)
    }

    /// Returns `true` if the reported range is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.category.is_error()
    }

    /// Appends an elaboration message.
    pub fn with_chain(mut self, chain: Diagnostic) -> Self {
        self.message_chain.push(chain);
        self
    }

    /// Appends related information.
    pub fn with_related(mut self, related: Diagnostic) -> Self {
        self.related_information.push(related);
        self
    }

    /// Marks this diagnostic as suppressed under `no_emit`.
    pub fn skipped_on_no_emit(mut self) -> Self {
        self.skipped_on_no_emit = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages;

    #[test]
    fn create_located() {
        let file = FilePath::from_canonical("/p/a.ts");
        let diag = Diagnostic::at(&file, 4, 9, &messages::CANNOT_FIND_NAME, &["foo"]);
        assert_eq!(diag.code, 2304);
        assert_eq!(diag.category, Category::Error);
        assert_eq!(diag.message, "Cannot find name 'foo'.");
        assert_eq!(diag.len(), 5);
        assert!(diag.is_error());
        assert_eq!(diag.file.as_ref(), Some(&file));
    }

    #[test]
    fn create_global() {
        let diag = Diagnostic::global(
            &messages::OPTION_CONFLICT,
            &["sourceMap", "inlineSourceMap"],
        );
        assert!(diag.file.is_none());
        assert!(diag.is_empty());
    }

    #[test]
    fn builder_methods() {
        let file = FilePath::from_canonical("/p/a.ts");
        let other = FilePath::from_canonical("/p/b.ts");
        let diag = Diagnostic::at(&file, 0, 1, &messages::TYPE_NOT_ASSIGNABLE, &["string", "number"])
            .with_related(Diagnostic::at(&other, 2, 3, &messages::DECLARED_HERE, &["x"]))
            .skipped_on_no_emit();
        assert_eq!(diag.related_information.len(), 1);
        assert!(diag.message_chain.is_empty());
        assert!(diag.skipped_on_no_emit);
    }
}
