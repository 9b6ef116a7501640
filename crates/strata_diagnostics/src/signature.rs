//! Canonical text folding of diagnostics for shape-signature hashing.
//!
//! Declaration diagnostics change a file's observable shape just like the
//! emitted declaration text does, so both are hashed together. The folded
//! form is independent of absolute paths: locations in other files are
//! written relative to the owning file's directory.

use crate::diagnostic::Diagnostic;
use std::fmt::Write;
use strata_common::path::{ensure_path_is_non_module_name, get_relative_path_from_directory};
use strata_common::FilePath;

/// Appends the canonical text of `diag` (and its chain and related
/// information, recursively) to `out`.
///
/// Each diagnostic contributes a newline, the relative path of its file when
/// that differs from `owning_file`, `(pos,len): ` when it has a file, then the
/// category name, code, and message.
pub fn write_diagnostic_for_signature(diag: &Diagnostic, owning_file: &FilePath, out: &mut String) {
    out.push('\n');
    if let Some(file) = diag.file.as_ref().filter(|file| *file != owning_file) {
        let relative = get_relative_path_from_directory(&owning_file.directory(), file.as_str(), true);
        out.push_str(&ensure_path_is_non_module_name(&relative));
    }
    if diag.file.is_some() {
        // Writing into a String never fails.
        let _ = write!(out, "({},{}): ", diag.pos, diag.len());
    }
    out.push_str(diag.category.name());
    let _ = write!(out, "{}: ", diag.code);
    out.push_str(&diag.message);
    for chain in &diag.message_chain {
        write_diagnostic_for_signature(chain, owning_file, out);
    }
    for related in &diag.related_information {
        write_diagnostic_for_signature(related, owning_file, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages;

    #[test]
    fn same_file_omits_path() {
        let file = FilePath::from_canonical("/p/src/a.ts");
        let diag = Diagnostic::at(
            &file,
            13,
            14,
            &messages::EXPORTED_VARIABLE_USES_PRIVATE_NAME,
            &["x", "Hidden"],
        );
        let mut out = String::new();
        write_diagnostic_for_signature(&diag, &file, &mut out);
        assert_eq!(
            out,
            "\n(13,1): error4025: Exported variable 'x' has or is using private name 'Hidden'."
        );
    }

    #[test]
    fn related_in_other_file_is_relative() {
        let file = FilePath::from_canonical("/p/src/a.ts");
        let other = FilePath::from_canonical("/p/lib/b.ts");
        let diag = Diagnostic::at(&file, 0, 2, &messages::CANNOT_FIND_NAME, &["y"])
            .with_related(Diagnostic::at(&other, 5, 8, &messages::DECLARED_HERE, &["y"]));
        let mut out = String::new();
        write_diagnostic_for_signature(&diag, &file, &mut out);
        assert_eq!(
            out,
            "\n(0,2): error2304: Cannot find name 'y'.\n../lib/b.ts(5,3): message2728: 'y' is declared here."
        );
    }

    #[test]
    fn global_has_no_location() {
        let file = FilePath::from_canonical("/p/a.ts");
        let diag = Diagnostic::global(&messages::FILE_NOT_FOUND, &["x.ts"]);
        let mut out = String::new();
        write_diagnostic_for_signature(&diag, &file, &mut out);
        assert_eq!(out, "\nerror6053: File 'x.ts' not found.");
    }
}
