//! Diagnostic categories and their persisted numeric codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic message.
///
/// The discriminants are the numeric codes persisted in build info, so they
/// must never be reordered.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// A potential issue that does not fail the build.
    Warning = 0,
    /// A definite problem.
    Error = 1,
    /// An editor-style suggestion.
    Suggestion = 2,
    /// An informational message, typically part of a message chain.
    Message = 3,
}

impl Category {
    /// Returns the lower-case name used in rendered and folded diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Category::Warning => "warning",
            Category::Error => "error",
            Category::Suggestion => "suggestion",
            Category::Message => "message",
        }
    }

    /// Returns `true` for [`Category::Error`].
    pub fn is_error(self) -> bool {
        self == Category::Error
    }

    /// Returns the persisted numeric code.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a persisted numeric code.
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Category::Warning),
            1 => Some(Category::Error),
            2 => Some(Category::Suggestion),
            3 => Some(Category::Message),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_codes_round_trip() {
        for category in [
            Category::Warning,
            Category::Error,
            Category::Suggestion,
            Category::Message,
        ] {
            assert_eq!(Category::from_u8(category.as_u8()), Some(category));
        }
        assert_eq!(Category::from_u8(4), None);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Category::Error), "error");
        assert_eq!(format!("{}", Category::Warning), "warning");
        assert_eq!(Category::Error.as_u8(), 1);
        assert!(Category::Error.is_error());
        assert!(!Category::Message.is_error());
    }
}
