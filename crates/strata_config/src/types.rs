//! Configuration types deserialized from `strata.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

/// The top-level project configuration parsed from `strata.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Project metadata and root file selection.
    pub project: ProjectMeta,
    /// Compiler options applied to every file in the project.
    #[serde(default)]
    pub compiler_options: CompilerOptions,
}

/// Project metadata and the set of root files.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// Explicit root files, relative to the project directory.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub files: Vec<String>,
    /// Directories scanned recursively for source files.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub include: Vec<String>,
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows `include = "src"` as shorthand for `include = ["src"]`.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// The module system emitted JavaScript targets.
///
/// `None` disables module emit entirely, which also disables reference
/// tracking between files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// No module system.
    None,
    /// `require`/`exports`.
    #[serde(rename = "commonjs")]
    CommonJs,
    /// ES2015 modules.
    Es2015,
    /// ES2020 modules (dynamic import, `import.meta`).
    Es2020,
    /// ES2022 modules (top-level await).
    Es2022,
    /// The latest ES module features.
    #[serde(rename = "esnext")]
    EsNext,
    /// Node 16 hybrid resolution.
    Node16,
    /// Latest Node hybrid resolution.
    #[serde(rename = "nodenext")]
    NodeNext,
}

impl ModuleKind {
    /// Returns the numeric code persisted in build info.
    pub fn code(self) -> u32 {
        match self {
            ModuleKind::None => 0,
            ModuleKind::CommonJs => 1,
            ModuleKind::Es2015 => 5,
            ModuleKind::Es2020 => 6,
            ModuleKind::Es2022 => 7,
            ModuleKind::EsNext => 99,
            ModuleKind::Node16 => 100,
            ModuleKind::NodeNext => 199,
        }
    }

    /// Parses a persisted numeric code.
    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            0 => ModuleKind::None,
            1 => ModuleKind::CommonJs,
            5 => ModuleKind::Es2015,
            6 => ModuleKind::Es2020,
            7 => ModuleKind::Es2022,
            99 => ModuleKind::EsNext,
            100 => ModuleKind::Node16,
            199 => ModuleKind::NodeNext,
            _ => return None,
        })
    }

    /// Returns `true` for modes where module format is decided per file.
    pub fn is_node(self) -> bool {
        matches!(self, ModuleKind::Node16 | ModuleKind::NodeNext)
    }
}

/// The ECMAScript language level of emitted JavaScript.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptTarget {
    /// ES5.
    Es5,
    /// ES2015.
    Es2015,
    /// ES2017.
    Es2017,
    /// ES2020.
    Es2020,
    /// ES2022.
    Es2022,
    /// The latest supported features.
    #[serde(rename = "esnext")]
    EsNext,
}

impl ScriptTarget {
    /// Returns the numeric code persisted in build info.
    pub fn code(self) -> u32 {
        match self {
            ScriptTarget::Es5 => 1,
            ScriptTarget::Es2015 => 2,
            ScriptTarget::Es2017 => 4,
            ScriptTarget::Es2020 => 7,
            ScriptTarget::Es2022 => 9,
            ScriptTarget::EsNext => 99,
        }
    }

    /// Parses a persisted numeric code.
    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            1 => ScriptTarget::Es5,
            2 => ScriptTarget::Es2015,
            4 => ScriptTarget::Es2017,
            7 => ScriptTarget::Es2020,
            9 => ScriptTarget::Es2022,
            99 => ScriptTarget::EsNext,
            _ => return None,
        })
    }
}

/// Compiler options controlling checking, emit, and incremental behaviour.
///
/// Path-valued options are absolute and normalized once loaded; the loader
/// resolves them against the project directory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerOptions {
    /// Module system of emitted JavaScript.
    pub module: Option<ModuleKind>,
    /// Language level of emitted JavaScript.
    pub target: Option<ScriptTarget>,
    /// Enables strict checks such as implicit-any reporting.
    pub strict: bool,
    /// Emits `.d.ts` files.
    pub declaration: bool,
    /// Emits `.d.ts.map` files.
    pub declaration_map: bool,
    /// Tracks declaration emit signatures for downstream project references.
    pub composite: bool,
    /// Emits only declaration files.
    pub emit_declaration_only: bool,
    /// Emits `.js.map` files.
    pub source_map: bool,
    /// Embeds source maps in the emitted JavaScript.
    pub inline_source_map: bool,
    /// Treats every file as separately transpilable.
    pub isolated_modules: bool,
    /// Skips semantic checking.
    pub no_check: bool,
    /// Disables all emit.
    pub no_emit: bool,
    /// Skips emit when any errors are reported.
    pub no_emit_on_error: bool,
    /// Skips checking of declaration files.
    pub skip_lib_check: bool,
    /// Skips checking of default library files.
    pub skip_default_lib_check: bool,
    /// Persists incremental state in build info.
    pub incremental: bool,
    /// Explicit location of the build-info file.
    pub ts_build_info_file: Option<String>,
    /// Output directory for emitted files.
    pub out_dir: Option<String>,
    /// Output directory for declaration files.
    pub declaration_dir: Option<String>,
    /// Root of the source tree mirrored under `out_dir`.
    pub root_dir: Option<String>,
    /// Limits invalidation to direct importers of a changed file.
    pub assume_changes_only_affect_direct_dependencies: bool,
    /// Reports emitted file names.
    pub list_emitted_files: bool,
    /// Path of the configuration file these options were read from.
    #[serde(skip)]
    pub config_file_path: Option<String>,
}

impl CompilerOptions {
    /// Returns the effective module kind.
    pub fn module_kind(&self) -> ModuleKind {
        self.module.unwrap_or(ModuleKind::EsNext)
    }

    /// Returns the effective script target.
    pub fn script_target(&self) -> ScriptTarget {
        self.target.unwrap_or(ScriptTarget::Es2022)
    }

    /// Returns `true` if declaration files are emitted.
    pub fn emit_declarations(&self) -> bool {
        self.declaration || self.composite
    }

    /// Returns `true` if incremental state is persisted between builds.
    pub fn is_incremental(&self) -> bool {
        self.incremental || self.composite
    }

    /// Returns `true` if cross-file references are tracked.
    pub fn tracks_references(&self) -> bool {
        self.module_kind() != ModuleKind::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_codes_round_trip() {
        for kind in [
            ModuleKind::None,
            ModuleKind::CommonJs,
            ModuleKind::Es2015,
            ModuleKind::Es2020,
            ModuleKind::Es2022,
            ModuleKind::EsNext,
            ModuleKind::Node16,
            ModuleKind::NodeNext,
        ] {
            assert_eq!(ModuleKind::from_code(kind.code() as u64), Some(kind));
        }
        assert_eq!(ModuleKind::from_code(2), None);
        assert_eq!(ModuleKind::EsNext.code(), 99);
    }

    #[test]
    fn target_codes_round_trip() {
        for target in [
            ScriptTarget::Es5,
            ScriptTarget::Es2015,
            ScriptTarget::Es2017,
            ScriptTarget::Es2020,
            ScriptTarget::Es2022,
            ScriptTarget::EsNext,
        ] {
            assert_eq!(ScriptTarget::from_code(target.code() as u64), Some(target));
        }
    }

    #[test]
    fn derived_predicates() {
        let mut options = CompilerOptions::default();
        assert!(!options.emit_declarations());
        assert!(!options.is_incremental());
        assert!(options.tracks_references());

        options.composite = true;
        assert!(options.emit_declarations());
        assert!(options.is_incremental());

        options.module = Some(ModuleKind::None);
        assert!(!options.tracks_references());
    }

    #[test]
    fn deserialize_lowercase_names() {
        let options: CompilerOptions =
            toml::from_str("module = \"commonjs\"\ntarget = \"esnext\"\nsource_map = true").unwrap();
        assert_eq!(options.module, Some(ModuleKind::CommonJs));
        assert_eq!(options.target, Some(ScriptTarget::EsNext));
        assert!(options.source_map);
        assert!(!options.declaration);
    }

    #[test]
    fn unknown_option_rejected() {
        assert!(toml::from_str::<CompilerOptions>("not_an_option = true").is_err());
    }
}
