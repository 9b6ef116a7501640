//! Shape signatures and composite emit signatures.

use strata_common::{compute_hash, FilePath};
use strata_diagnostics::write_diagnostic_for_signature;
use strata_program::WriteFileData;

/// The part of an emitted declaration file that is hashed: everything before
/// the source-map URL comment.
pub fn text_for_signature<'a>(text: &'a str, data: &WriteFileData) -> &'a str {
    match data.source_map_url_pos {
        Some(pos) if pos <= text.len() => text.get(..pos).unwrap_or(text),
        _ => text,
    }
}

/// Hash of a declaration file's text plus its declaration diagnostics.
///
/// Diagnostics are folded in because they are part of what importers observe
/// about the file.
pub fn compute_signature_with_diagnostics(file: &FilePath, text: &str, data: &WriteFileData) -> String {
    let mut folded = text_for_signature(text, data).to_string();
    for diag in &data.diagnostics {
        write_diagnostic_for_signature(diag, file, &mut folded);
    }
    compute_hash(&folded)
}

/// Hash of the last `.d.ts` written for a file in a composite build.
///
/// The variant records whether it was produced under the current
/// `declaration_map` setting.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EmitSignature {
    /// Emitted with the current `declaration_map` setting.
    Current(String),
    /// Emitted with the opposite `declaration_map` setting.
    DifferentOptions(String),
}

impl EmitSignature {
    /// The hash, whichever options produced it.
    pub fn hash(&self) -> &str {
        match self {
            EmitSignature::Current(hash) | EmitSignature::DifferentOptions(hash) => hash,
        }
    }

    /// The signature carried into a generation whose `declaration_map`
    /// setting is `new_declaration_map`, given it was recorded under
    /// `old_declaration_map`.
    pub fn carried_forward(&self, old_declaration_map: bool, new_declaration_map: bool) -> EmitSignature {
        if old_declaration_map == new_declaration_map {
            return self.clone();
        }
        match self {
            EmitSignature::Current(hash) => EmitSignature::DifferentOptions(hash.clone()),
            EmitSignature::DifferentOptions(hash) => EmitSignature::Current(hash.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_diagnostics::{messages, Diagnostic};

    #[test]
    fn source_map_comment_is_ignored() {
        let file = FilePath::from_canonical("/p/a.ts");
        let plain = "export declare const x = 1;\n";
        let mapped = format!("{plain}//# sourceMappingURL=a.d.ts.map");
        let data = WriteFileData {
            source_map_url_pos: Some(plain.len()),
            ..WriteFileData::default()
        };
        assert_eq!(
            compute_signature_with_diagnostics(&file, &mapped, &data),
            compute_signature_with_diagnostics(&file, plain, &WriteFileData::default())
        );
    }

    #[test]
    fn diagnostics_change_the_signature() {
        let file = FilePath::from_canonical("/p/a.ts");
        let text = "export declare const x: Hidden;\n";
        let clean = compute_signature_with_diagnostics(&file, text, &WriteFileData::default());
        let data = WriteFileData {
            diagnostics: vec![Diagnostic::at(
                &file,
                13,
                14,
                &messages::EXPORTED_VARIABLE_USES_PRIVATE_NAME,
                &["x", "Hidden"],
            )],
            ..WriteFileData::default()
        };
        assert_ne!(compute_signature_with_diagnostics(&file, text, &data), clean);
        assert_eq!(clean, compute_hash(text));
    }

    #[test]
    fn emit_signature_swaps_on_declaration_map_toggle() {
        let current = EmitSignature::Current("h".to_string());
        assert_eq!(current.carried_forward(true, true), current);
        let swapped = current.carried_forward(false, true);
        assert_eq!(swapped, EmitSignature::DifferentOptions("h".to_string()));
        assert_eq!(swapped.carried_forward(true, false), current);
        assert_eq!(swapped.hash(), "h");
    }
}
