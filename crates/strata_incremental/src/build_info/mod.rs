//! The build-info file.
//!
//! Build info is the persisted form of a [`Snapshot`](crate::Snapshot). Paths
//! are stored once, in `fileNames`, relative to the build-info file; every
//! other field refers to files by 1-based [`FileId`]. Sets of files that
//! appear as reference targets are deduplicated into `fileIdsList`.
//!
//! Most fields use a compact JSON shape whose meaning depends on the JSON
//! type (a bare id versus an array). The serde types here spell those shapes
//! out as untagged enums so that [`encode`] and [`decode`] only deal with
//! typed values.

mod decode;
mod encode;
mod readable;

pub use readable::readable_build_info;

use crate::error::BuildInfoError;
use crate::file_info::FileInfo;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::num::NonZeroU32;
use strata_common::FileId;
use strata_program::ResolutionMode;

/// Toolchain version recorded in, and required of, build info.
pub const BUILD_INFO_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A 1-based index into `fileIdsList`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileIdListId(NonZeroU32);

impl FileIdListId {
    /// Creates an id from a raw 1-based index, returning `None` for zero.
    pub fn from_raw(index: u32) -> Option<Self> {
        NonZeroU32::new(index).map(Self)
    }

    /// The raw 1-based index.
    pub fn as_raw(self) -> u32 {
        self.0.get()
    }

    /// The 0-based position in `fileIdsList`.
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// The top-level build-info document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// Version of the toolchain that wrote the file.
    pub version: String,
    /// The program had errors when the file was written.
    #[serde(default, skip_serializing_if = "is_false")]
    pub errors: bool,
    /// Semantic checking was skipped and is still owed.
    #[serde(default, skip_serializing_if = "is_false")]
    pub check_pending: bool,
    /// Relative file names, indexed by [`FileId`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_names: Vec<String>,
    /// One entry per program file, in `fileNames` order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_infos: Vec<BuildInfoFileInfo>,
    /// Deduplicated reference target sets, indexed by [`FileIdListId`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_ids_list: Vec<Vec<FileId>>,
    /// Persisted compiler options.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
    /// `[file, referenced files]` pairs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced_map: Vec<(FileId, FileIdListId)>,
    /// Cached semantic diagnostics, and files still to be checked.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub semantic_diagnostics_per_file: Vec<SemanticDiagnosticsEntry>,
    /// Cached declaration diagnostics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emit_diagnostics_per_file: Vec<DiagnosticsOfFile>,
    /// Files changed since they were last fully processed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub change_file_set: Vec<FileId>,
    /// Files still owing outputs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_files_pending_emit: Vec<PendingEmitEntry>,
    /// The last declaration file whose contents changed, relative to the
    /// build-info directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_changed_dts_file: Option<String>,
    /// Emit signatures that differ from the file's shape signature.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emit_signatures: Vec<EmitSignatureEntry>,
}

impl BuildInfo {
    /// Parses build-info text, rejecting files written by another version.
    ///
    /// The version is checked before the rest of the document so that a
    /// layout change between versions reports as a version mismatch.
    pub fn parse(text: &str) -> Result<BuildInfo, BuildInfoError> {
        #[derive(Deserialize)]
        struct VersionOnly {
            version: String,
        }

        let VersionOnly { version } = serde_json::from_str(text)?;
        if version != BUILD_INFO_VERSION {
            return Err(BuildInfoError::VersionMismatch {
                expected: BUILD_INFO_VERSION.to_string(),
                actual: version,
            });
        }
        Ok(serde_json::from_str(text)?)
    }

    /// Returns `true` if this describes an incremental program rather than
    /// only recording errors.
    pub fn is_incremental(&self) -> bool {
        !self.file_names.is_empty()
    }
}

/// A [`FileInfo`] in its compact persisted form.
///
/// Serialized as the bare version string when the signature equals the
/// version and nothing else is set, otherwise as an object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFileInfo", into = "RawFileInfo")]
pub struct BuildInfoFileInfo(pub FileInfo);

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawFileInfo {
    Version(String),
    Object(RawFileInfoObject),
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFileInfoObject {
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    no_signature: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    affects_global_scope: bool,
    #[serde(default, skip_serializing_if = "is_default_format")]
    implied_node_format: ResolutionMode,
}

fn is_default_format(format: &ResolutionMode) -> bool {
    *format == ResolutionMode::None
}

impl From<RawFileInfo> for BuildInfoFileInfo {
    fn from(raw: RawFileInfo) -> Self {
        match raw {
            RawFileInfo::Version(version) => {
                BuildInfoFileInfo(FileInfo::new(version, false, ResolutionMode::None))
            }
            RawFileInfo::Object(object) => {
                let signature = if object.no_signature {
                    String::new()
                } else {
                    object.signature.unwrap_or_else(|| object.version.clone())
                };
                BuildInfoFileInfo(FileInfo {
                    version: object.version,
                    signature,
                    affects_global_scope: object.affects_global_scope,
                    implied_node_format: object.implied_node_format,
                })
            }
        }
    }
}

impl From<BuildInfoFileInfo> for RawFileInfo {
    fn from(BuildInfoFileInfo(info): BuildInfoFileInfo) -> Self {
        if info.version == info.signature
            && !info.affects_global_scope
            && info.implied_node_format == ResolutionMode::None
        {
            return RawFileInfo::Version(info.version);
        }
        let mut object = RawFileInfoObject {
            affects_global_scope: info.affects_global_scope,
            implied_node_format: info.implied_node_format,
            ..RawFileInfoObject::default()
        };
        if info.signature.is_empty() {
            object.no_signature = true;
        } else if info.signature != info.version {
            object.signature = Some(info.signature);
        }
        object.version = info.version;
        RawFileInfo::Object(object)
    }
}

/// Where a persisted diagnostic is located.
///
/// Absent means the file the entry belongs to; `false` means no file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildInfoDiagnosticFile {
    /// Another file.
    File(FileId),
    /// Always `false`: the diagnostic has no file.
    Global(bool),
}

/// A diagnostic as stored in build info.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfoDiagnostic {
    /// The file, when not the owner of the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<BuildInfoDiagnosticFile>,
    /// Start offset.
    pub pos: u32,
    /// End offset.
    pub end: u32,
    /// Diagnostic code.
    pub code: u32,
    /// Numeric category.
    pub category: u8,
    /// Message text.
    pub message: String,
    /// Elaboration messages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub message_chain: Vec<BuildInfoDiagnostic>,
    /// Related locations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_information: Vec<BuildInfoDiagnostic>,
    /// Reported as unnecessary code.
    #[serde(default, skip_serializing_if = "is_false")]
    pub reports_unnecessary: bool,
    /// Reported as deprecated usage.
    #[serde(default, skip_serializing_if = "is_false")]
    pub reports_deprecated: bool,
    /// Dropped when emit is disabled.
    #[serde(default, skip_serializing_if = "is_false")]
    pub skipped_on_no_emit: bool,
}

/// Semantic diagnostics state of one file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SemanticDiagnosticsEntry {
    /// `fileId`: the file has not been checked.
    Pending(FileId),
    /// `[fileId, [diagnostics]]`: cached non-empty diagnostics.
    Diagnostics(FileId, Vec<BuildInfoDiagnostic>),
}

/// `[fileId, [diagnostics]]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsOfFile(pub FileId, pub Vec<BuildInfoDiagnostic>);

/// Outputs a file still owes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PendingEmitEntry {
    /// `fileId`: everything the options produce.
    Full(FileId),
    /// `[fileId, kind]`: the given emit-kind bits.
    Kind(FileId, u32),
    /// `[fileId]`: only the declaration file.
    Dts([FileId; 1]),
}

impl PendingEmitEntry {
    /// The file the entry is for.
    pub fn file_id(&self) -> FileId {
        match *self {
            PendingEmitEntry::Full(id) | PendingEmitEntry::Kind(id, _) | PendingEmitEntry::Dts([id]) => id,
        }
    }
}

/// Emit signature of a composite file, stored when it differs from the
/// file's shape signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmitSignatureEntry {
    /// `fileId`: the declaration file has not been emitted.
    NotEmitted(FileId),
    /// `[fileId, "signature"]`: emitted with the current options.
    Signature(FileId, String),
    /// `[fileId, []]` when the hash equals the shape signature, otherwise
    /// `[fileId, ["signature"]]`: emitted with a different
    /// `declarationMap` setting.
    DifferentOptions(FileId, Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> FileId {
        FileId::from_raw(raw).unwrap()
    }

    #[test]
    fn file_info_compact_forms() {
        let plain = BuildInfoFileInfo(FileInfo::new("v1".into(), false, ResolutionMode::None));
        assert_eq!(serde_json::to_string(&plain).unwrap(), r#""v1""#);

        let mut shaped = plain.clone();
        shaped.0.signature = "s1".into();
        shaped.0.affects_global_scope = true;
        assert_eq!(
            serde_json::to_string(&shaped).unwrap(),
            r#"{"version":"v1","signature":"s1","affectsGlobalScope":true}"#
        );

        let mut unknown = plain.clone();
        unknown.0.signature.clear();
        unknown.0.implied_node_format = ResolutionMode::EsNext;
        let text = serde_json::to_string(&unknown).unwrap();
        assert_eq!(text, r#"{"version":"v1","noSignature":true,"impliedNodeFormat":99}"#);
        assert_eq!(serde_json::from_str::<BuildInfoFileInfo>(&text).unwrap(), unknown);

        let global: BuildInfoFileInfo =
            serde_json::from_str(r#"{"version":"v2","affectsGlobalScope":true}"#).unwrap();
        assert_eq!(global.0.signature, "v2");
        assert!(global.0.affects_global_scope);
    }

    #[test]
    fn pending_emit_shapes() {
        let entries: Vec<PendingEmitEntry> = serde_json::from_str("[1,[2],[3,17]]").unwrap();
        assert_eq!(
            entries,
            vec![
                PendingEmitEntry::Full(id(1)),
                PendingEmitEntry::Dts([id(2)]),
                PendingEmitEntry::Kind(id(3), 17),
            ]
        );
        assert_eq!(
            entries.iter().map(|entry| entry.file_id().as_raw()).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(serde_json::from_str::<PendingEmitEntry>("[1,2,3]").is_err());
    }

    #[test]
    fn emit_signature_shapes() {
        let entries: Vec<EmitSignatureEntry> = serde_json::from_str(r#"[4,[5,"h"],[6,[]],[7,["g"]]]"#).unwrap();
        assert_eq!(
            entries,
            vec![
                EmitSignatureEntry::NotEmitted(id(4)),
                EmitSignatureEntry::Signature(id(5), "h".into()),
                EmitSignatureEntry::DifferentOptions(id(6), vec![]),
                EmitSignatureEntry::DifferentOptions(id(7), vec!["g".into()]),
            ]
        );
    }

    #[test]
    fn diagnostic_file_forms() {
        let diag: BuildInfoDiagnostic =
            serde_json::from_str(r#"{"file":false,"pos":0,"end":1,"code":2304,"category":1,"message":"m"}"#)
                .unwrap();
        assert_eq!(diag.file, Some(BuildInfoDiagnosticFile::Global(false)));
        let owned = BuildInfoDiagnostic { file: None, ..diag };
        assert_eq!(
            serde_json::to_string(&owned).unwrap(),
            r#"{"pos":0,"end":1,"code":2304,"category":1,"message":"m"}"#
        );
    }

    #[test]
    fn version_is_checked_first() {
        let err = BuildInfo::parse(r#"{"version":"0.0.0-other","fileNames":"not a list"}"#).unwrap_err();
        assert!(matches!(err, BuildInfoError::VersionMismatch { .. }));

        let text = format!(r#"{{"version":"{BUILD_INFO_VERSION}","errors":true}}"#);
        let info = BuildInfo::parse(&text).unwrap();
        assert!(info.errors);
        assert!(!info.is_incremental());

        assert!(matches!(BuildInfo::parse("{"), Err(BuildInfoError::Parse { .. })));
    }
}
