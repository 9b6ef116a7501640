//! Per-file version and shape metadata.

use strata_program::{ResolutionMode, SourceFile};

/// What the engine remembers about a file between generations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    /// Hash of the file text.
    pub version: String,
    /// Hash of the file's declaration output, or its version when no shape
    /// has been computed. Empty when unknown.
    pub signature: String,
    /// The file contributes global declarations.
    pub affects_global_scope: bool,
    /// The module format the file was interpreted with.
    pub implied_node_format: ResolutionMode,
}

impl FileInfo {
    /// A file whose shape is its version.
    pub fn new(version: String, affects_global_scope: bool, implied_node_format: ResolutionMode) -> Self {
        Self {
            signature: version.clone(),
            version,
            affects_global_scope,
            implied_node_format,
        }
    }
}

/// Returns `true` if editing `file` can change any other file's meaning
/// without an import relationship.
///
/// Global augmentations always count. Otherwise modules and JSON files are
/// local, and a script counts unless it holds nothing but
/// `declare module "name"` blocks, which only importers of those names see.
pub fn file_affects_global_scope(file: &SourceFile) -> bool {
    if file.has_global_augmentation() {
        return true;
    }
    if file.is_external_module() || file.is_json_file() {
        return false;
    }
    !file.statements().is_empty() && !file.contains_only_ambient_modules()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::FilePath;

    fn parse(text: &str) -> SourceFile {
        SourceFile::parse(FilePath::from_canonical("/p/a.ts"), "/p/a.ts", text)
    }

    #[test]
    fn scripts_and_modules() {
        assert!(file_affects_global_scope(&parse("var counter = 0;")));
        assert!(!file_affects_global_scope(&parse("export const x = 1;")));
        assert!(file_affects_global_scope(&parse(
            "export {};\ndeclare global { var g: number; }"
        )));
        assert!(!file_affects_global_scope(&parse(
            "declare module 'lib' { export const v: number; }"
        )));
        assert!(!file_affects_global_scope(&parse("")));
        let json = SourceFile::json(FilePath::from_canonical("/p/d.json"), "/p/d.json", "{}");
        assert!(!file_affects_global_scope(&json));
    }

    #[test]
    fn new_info_uses_version_as_signature() {
        let info = FileInfo::new("abc".to_string(), false, ResolutionMode::None);
        assert_eq!(info.signature, info.version);
    }
}
