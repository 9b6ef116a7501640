//! The catalogue of diagnostic messages reported by the toolchain.
//!
//! Message texts use `{0}`, `{1}`, ... placeholders filled by
//! [`DiagnosticMessage::format`].

use crate::category::Category;

/// A known diagnostic: numeric code, default category, and message template.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DiagnosticMessage {
    /// The numeric diagnostic code (rendered as `TS{code}`).
    pub code: u32,
    /// The default category.
    pub category: Category,
    /// The message template.
    pub text: &'static str,
}

impl DiagnosticMessage {
    const fn error(code: u32, text: &'static str) -> Self {
        Self {
            code,
            category: Category::Error,
            text,
        }
    }

    /// Fills the template's numbered placeholders with `args`.
    pub fn format(&self, args: &[&str]) -> String {
        let mut out = self.text.to_string();
        for (index, arg) in args.iter().enumerate() {
            out = out.replace(&format!("{{{index}}}"), arg);
        }
        out
    }
}

/// `Unterminated string literal.`
pub const UNTERMINATED_STRING_LITERAL: DiagnosticMessage =
    DiagnosticMessage::error(1002, "Unterminated string literal.");
/// `'{0}' expected.`
pub const TOKEN_EXPECTED: DiagnosticMessage = DiagnosticMessage::error(1005, "'{0}' expected.");
/// `'*/' expected.`
pub const COMMENT_END_EXPECTED: DiagnosticMessage =
    DiagnosticMessage::error(1010, "'*/' expected.");
/// `Duplicate identifier '{0}'.`
pub const DUPLICATE_IDENTIFIER: DiagnosticMessage =
    DiagnosticMessage::error(2300, "Duplicate identifier '{0}'.");
/// `Cannot find name '{0}'.`
pub const CANNOT_FIND_NAME: DiagnosticMessage =
    DiagnosticMessage::error(2304, "Cannot find name '{0}'.");
/// `Module '{0}' has no exported member '{1}'.`
pub const MODULE_HAS_NO_EXPORTED_MEMBER: DiagnosticMessage =
    DiagnosticMessage::error(2305, "Module '{0}' has no exported member '{1}'.");
/// `Cannot find module '{0}' or its corresponding type declarations.`
pub const CANNOT_FIND_MODULE: DiagnosticMessage = DiagnosticMessage::error(
    2307,
    "Cannot find module '{0}' or its corresponding type declarations.",
);
/// `Cannot find global type '{0}'.`
pub const CANNOT_FIND_GLOBAL_TYPE: DiagnosticMessage =
    DiagnosticMessage::error(2318, "Cannot find global type '{0}'.");
/// `Type '{0}' is not assignable to type '{1}'.`
pub const TYPE_NOT_ASSIGNABLE: DiagnosticMessage =
    DiagnosticMessage::error(2322, "Type '{0}' is not assignable to type '{1}'.");
/// `Exported variable '{0}' has or is using private name '{1}'.`
pub const EXPORTED_VARIABLE_USES_PRIVATE_NAME: DiagnosticMessage = DiagnosticMessage::error(
    4025,
    "Exported variable '{0}' has or is using private name '{1}'.",
);
/// `Could not write file '{0}': {1}.`
pub const COULD_NOT_WRITE_FILE: DiagnosticMessage =
    DiagnosticMessage::error(5033, "Could not write file '{0}': {1}.");
/// `Option '{0}' cannot be specified with option '{1}'.`
pub const OPTION_CONFLICT: DiagnosticMessage =
    DiagnosticMessage::error(5053, "Option '{0}' cannot be specified with option '{1}'.");
/// `Option '{0}' cannot be specified without specifying option '{1}' or option '{2}'.`
pub const OPTION_REQUIRES_ONE_OF: DiagnosticMessage = DiagnosticMessage::error(
    5069,
    "Option '{0}' cannot be specified without specifying option '{1}' or option '{2}'.",
);
/// `File '{0}' not found.`
pub const FILE_NOT_FOUND: DiagnosticMessage =
    DiagnosticMessage::error(6053, "File '{0}' not found.");
/// `Variable '{0}' implicitly has an '{1}' type.`
pub const IMPLICIT_ANY: DiagnosticMessage =
    DiagnosticMessage::error(7005, "Variable '{0}' implicitly has an '{1}' type.");
/// `'{0}' is declared here.`
pub const DECLARED_HERE: DiagnosticMessage = DiagnosticMessage {
    code: 2728,
    category: Category::Message,
    text: "'{0}' is declared here.",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_fills_placeholders() {
        assert_eq!(
            TYPE_NOT_ASSIGNABLE.format(&["string", "number"]),
            "Type 'string' is not assignable to type 'number'."
        );
        assert_eq!(CANNOT_FIND_NAME.format(&["foo"]), "Cannot find name 'foo'.");
    }

    #[test]
    fn missing_args_leave_placeholder() {
        assert_eq!(TOKEN_EXPECTED.format(&[]), "'{0}' expected.");
    }

    #[test]
    fn codes_and_categories() {
        assert_eq!(COULD_NOT_WRITE_FILE.code, 5033);
        assert_eq!(DECLARED_HERE.category, Category::Message);
    }
}
