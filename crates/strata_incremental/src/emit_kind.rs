//! Bitmask of the outputs a file owes.
//!
//! Each output artifact has its own bit so that an option change can
//! schedule exactly the artifacts that became stale instead of a full
//! re-emit. The bits group into JavaScript outputs, declaration errors, and
//! declaration outputs; [`pending_emit_kind`] compares masks group by group.

use bitflags::bitflags;
use std::fmt;
use strata_config::CompilerOptions;
use strata_program::EmitOnly;

bitflags! {
    /// Outputs owed for a file.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FileEmitKind: u32 {
        /// The `.js` file.
        const JS = 1 << 0;
        /// The `.js.map` file.
        const JS_MAP = 1 << 1;
        /// An inline source map inside the `.js` file.
        const JS_INLINE_MAP = 1 << 2;
        /// Declaration diagnostics.
        const DTS_ERRORS = 1 << 3;
        /// The `.d.ts` file.
        const DTS_EMIT = 1 << 4;
        /// The `.d.ts.map` file.
        const DTS_MAP = 1 << 5;

        /// Declaration diagnostics and the `.d.ts` file.
        const DTS = Self::DTS_ERRORS.bits() | Self::DTS_EMIT.bits();
        /// Every JavaScript output.
        const ALL_JS = Self::JS.bits() | Self::JS_MAP.bits() | Self::JS_INLINE_MAP.bits();
        /// The `.d.ts` file and its map.
        const ALL_DTS_EMIT = Self::DTS_EMIT.bits() | Self::DTS_MAP.bits();
        /// Every declaration output, diagnostics included.
        const ALL_DTS = Self::DTS.bits() | Self::DTS_MAP.bits();
    }
}

impl FileEmitKind {
    /// The outputs `options` ask for.
    pub fn from_options(options: &CompilerOptions) -> Self {
        let mut kind = FileEmitKind::JS;
        if options.source_map {
            kind |= FileEmitKind::JS_MAP;
        }
        if options.inline_source_map {
            kind |= FileEmitKind::JS_INLINE_MAP;
        }
        if options.emit_declarations() {
            kind |= FileEmitKind::DTS;
        }
        if options.declaration_map {
            kind |= FileEmitKind::DTS_MAP;
        }
        if options.emit_declaration_only {
            kind &= FileEmitKind::ALL_DTS;
        }
        kind
    }

    /// Declaration outputs, or only declaration diagnostics when collecting errors.
    pub fn all_dts(for_dts_errors: bool) -> Self {
        if for_dts_errors {
            FileEmitKind::DTS_ERRORS
        } else {
            FileEmitKind::ALL_DTS
        }
    }

    /// The emit restriction that produces exactly these outputs.
    ///
    /// `None` means both JavaScript and declarations are needed.
    pub fn emit_only(self) -> Option<EmitOnly> {
        match (self.intersects(FileEmitKind::ALL_JS), self.intersects(FileEmitKind::ALL_DTS)) {
            (true, false) => Some(EmitOnly::Js),
            (false, true) => Some(EmitOnly::Dts),
            _ => None,
        }
    }
}

/// Outputs of `new` that must be produced given that `old` was produced.
///
/// Equal masks owe nothing. When either side is empty the whole new mask is
/// owed. Otherwise each group (JavaScript, declaration errors, declaration
/// outputs) that differs contributes only the bits `new` sets and `old` does
/// not, so turning on a map owes just the map.
pub fn pending_emit_kind(new: FileEmitKind, old: FileEmitKind) -> FileEmitKind {
    if new == old {
        return FileEmitKind::empty();
    }
    if new.is_empty() || old.is_empty() {
        return new;
    }
    let diff = new ^ old;
    let mut pending = FileEmitKind::empty();
    for group in [FileEmitKind::ALL_JS, FileEmitKind::DTS_ERRORS, FileEmitKind::ALL_DTS_EMIT] {
        if diff.intersects(group) {
            pending |= (new & group).difference(old);
        }
    }
    pending
}

/// Outputs owed because the options changed from `old_options` to `options`.
pub fn pending_emit_kind_for_options(options: &CompilerOptions, old_options: &CompilerOptions) -> FileEmitKind {
    pending_emit_kind(
        FileEmitKind::from_options(options),
        FileEmitKind::from_options(old_options),
    )
}

/// Outputs still owed for a file that already produced `seen` this generation.
pub fn pending_emit_kind_with_seen(
    kind: FileEmitKind,
    seen: FileEmitKind,
    emit_only: Option<EmitOnly>,
    for_dts_errors: bool,
) -> FileEmitKind {
    let mut pending = pending_emit_kind(kind, seen);
    if emit_only == Some(EmitOnly::Dts) {
        pending &= FileEmitKind::ALL_DTS;
    }
    if for_dts_errors {
        pending &= FileEmitKind::DTS_ERRORS;
    }
    pending
}

impl fmt::Display for FileEmitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.contains(FileEmitKind::JS) {
            parts.push("Js");
        }
        if self.contains(FileEmitKind::JS_MAP) {
            parts.push("JsMap");
        }
        if self.contains(FileEmitKind::JS_INLINE_MAP) {
            parts.push("JsInlineMap");
        }
        if self.contains(FileEmitKind::DTS) {
            parts.push("Dts");
        } else if self.contains(FileEmitKind::DTS_EMIT) {
            parts.push("DtsEmit");
        } else if self.contains(FileEmitKind::DTS_ERRORS) {
            parts.push("DtsErrors");
        }
        if self.contains(FileEmitKind::DTS_MAP) {
            parts.push("DtsMap");
        }
        if parts.is_empty() {
            f.write_str("None")
        } else {
            f.write_str(&parts.join("|"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_options() {
        let mut options = CompilerOptions::default();
        assert_eq!(FileEmitKind::from_options(&options), FileEmitKind::JS);

        options.source_map = true;
        options.declaration = true;
        options.declaration_map = true;
        assert_eq!(
            FileEmitKind::from_options(&options),
            FileEmitKind::JS | FileEmitKind::JS_MAP | FileEmitKind::DTS | FileEmitKind::DTS_MAP
        );

        options.emit_declaration_only = true;
        assert_eq!(
            FileEmitKind::from_options(&options),
            FileEmitKind::DTS | FileEmitKind::DTS_MAP
        );

        let composite = CompilerOptions {
            composite: true,
            inline_source_map: true,
            ..CompilerOptions::default()
        };
        assert_eq!(
            FileEmitKind::from_options(&composite),
            FileEmitKind::JS | FileEmitKind::JS_INLINE_MAP | FileEmitKind::DTS
        );
    }

    #[test]
    fn pending_is_the_newly_set_bits() {
        let js_dts = FileEmitKind::JS | FileEmitKind::DTS;
        assert_eq!(pending_emit_kind(js_dts, js_dts), FileEmitKind::empty());
        assert_eq!(pending_emit_kind(js_dts, FileEmitKind::empty()), js_dts);
        assert_eq!(pending_emit_kind(FileEmitKind::empty(), js_dts), FileEmitKind::empty());

        assert_eq!(pending_emit_kind(js_dts | FileEmitKind::JS_MAP, js_dts), FileEmitKind::JS_MAP);
        assert_eq!(pending_emit_kind(js_dts | FileEmitKind::DTS_MAP, js_dts), FileEmitKind::DTS_MAP);
        // Swapping an external map for an inline one owes only the inline map.
        assert_eq!(
            pending_emit_kind(FileEmitKind::JS | FileEmitKind::JS_INLINE_MAP, FileEmitKind::JS | FileEmitKind::JS_MAP),
            FileEmitKind::JS_INLINE_MAP
        );
        // Declaration map alone without declarations.
        assert_eq!(
            pending_emit_kind(FileEmitKind::JS | FileEmitKind::DTS_MAP, FileEmitKind::JS),
            FileEmitKind::DTS_MAP
        );
        // Turning something off owes nothing new in that group.
        assert_eq!(pending_emit_kind(FileEmitKind::JS, js_dts), FileEmitKind::empty());
    }

    #[test]
    fn pending_for_option_change() {
        let old = CompilerOptions {
            declaration: true,
            ..CompilerOptions::default()
        };
        let new = CompilerOptions {
            declaration: true,
            source_map: true,
            ..CompilerOptions::default()
        };
        assert_eq!(pending_emit_kind_for_options(&new, &old), FileEmitKind::JS_MAP);
        assert_eq!(pending_emit_kind_for_options(&old, &old), FileEmitKind::empty());
    }

    #[test]
    fn pending_with_seen_respects_restrictions() {
        let all = FileEmitKind::JS | FileEmitKind::DTS;
        assert_eq!(
            pending_emit_kind_with_seen(all, FileEmitKind::JS, None, false),
            FileEmitKind::DTS
        );
        assert_eq!(
            pending_emit_kind_with_seen(all, FileEmitKind::empty(), Some(EmitOnly::Dts), false),
            FileEmitKind::DTS
        );
        assert_eq!(
            pending_emit_kind_with_seen(all, FileEmitKind::empty(), None, true),
            FileEmitKind::DTS_ERRORS
        );
        assert_eq!(
            pending_emit_kind_with_seen(all, all, None, false),
            FileEmitKind::empty()
        );
    }

    #[test]
    fn emit_only_for_kind() {
        assert_eq!((FileEmitKind::JS | FileEmitKind::JS_MAP).emit_only(), Some(EmitOnly::Js));
        assert_eq!(FileEmitKind::DTS_MAP.emit_only(), Some(EmitOnly::Dts));
        assert_eq!((FileEmitKind::JS | FileEmitKind::DTS).emit_only(), None);
    }

    #[test]
    fn display() {
        assert_eq!(FileEmitKind::empty().to_string(), "None");
        assert_eq!(
            (FileEmitKind::JS | FileEmitKind::JS_MAP | FileEmitKind::DTS | FileEmitKind::DTS_MAP).to_string(),
            "Js|JsMap|Dts|DtsMap"
        );
        assert_eq!(FileEmitKind::DTS_EMIT.to_string(), "DtsEmit");
        assert_eq!(FileEmitKind::DTS_ERRORS.to_string(), "DtsErrors");
        assert_eq!(FileEmitKind::JS_INLINE_MAP.to_string(), "JsInlineMap");
    }
}
