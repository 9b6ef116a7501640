//! Build info to snapshot.

use super::{
    BuildInfo, BuildInfoDiagnostic, BuildInfoDiagnosticFile, EmitSignatureEntry, FileIdListId,
    PendingEmitEntry, SemanticDiagnosticsEntry,
};
use crate::diagnostics_cache::{CachedDiagnostics, PersistedDiagnostic, PersistedFile};
use crate::emit_kind::FileEmitKind;
use crate::error::BuildInfoError;
use crate::signature::EmitSignature;
use crate::snapshot::Snapshot;
use std::collections::BTreeSet;
use std::sync::Arc;
use strata_common::path::{get_normalized_absolute_path, to_path};
use strata_common::{FileId, FilePath};
use strata_config::{get_build_info_directory, options_from_build_info};
use strata_diagnostics::Category;

impl BuildInfo {
    /// Rebuilds the snapshot this build info was written from.
    ///
    /// `build_info_file` may be relative to `current_directory`. The result
    /// stands in for the previous generation when diffing a new program.
    pub fn to_snapshot(
        &self,
        build_info_file: &str,
        current_directory: &str,
        use_case_sensitive_file_names: bool,
    ) -> Result<Snapshot, BuildInfoError> {
        let directory =
            get_build_info_directory(&get_normalized_absolute_path(build_info_file, current_directory));
        let decoder = Decoder::new(self, &directory, use_case_sensitive_file_names)?;
        let options = options_from_build_info(&self.options, &directory)?;
        let mut snapshot = Snapshot::empty(options);
        snapshot.has_errors = Some(self.errors);
        snapshot.check_pending = self.check_pending;

        let composite = snapshot.options.composite;
        for (index, entry) in self.file_infos.iter().enumerate() {
            let path = decoder.path_at(index)?;
            let info = entry.0.clone();
            if composite && !info.signature.is_empty() {
                snapshot
                    .emit_signatures
                    .insert(path.clone(), EmitSignature::Current(info.signature.clone()));
            }
            snapshot.file_infos.insert(path, info);
        }

        for entry in &self.emit_signatures {
            match entry {
                EmitSignatureEntry::NotEmitted(id) => {
                    snapshot.emit_signatures.remove(&decoder.path(*id)?);
                }
                EmitSignatureEntry::Signature(id, hash) => {
                    snapshot
                        .emit_signatures
                        .insert(decoder.path(*id)?, EmitSignature::Current(hash.clone()));
                }
                EmitSignatureEntry::DifferentOptions(id, hashes) => {
                    let path = decoder.path(*id)?;
                    let hash = match hashes.as_slice() {
                        [] => snapshot
                            .file_infos
                            .get(&path)
                            .map(|info| info.signature.clone())
                            .unwrap_or_default(),
                        [hash] => hash.clone(),
                        _ => {
                            return Err(BuildInfoError::Decode {
                                reason: format!("emit signature of file {} has {} hashes", id.as_raw(), hashes.len()),
                            })
                        }
                    };
                    snapshot
                        .emit_signatures
                        .insert(path, EmitSignature::DifferentOptions(hash));
                }
            }
        }

        if let Some(graph) = snapshot.referenced_map.as_mut() {
            for &(id, list) in &self.referenced_map {
                graph.set(decoder.path(id)?, decoder.list(list)?.clone());
            }
        }

        for &id in &self.change_file_set {
            snapshot.changed_files_set.insert(decoder.path(id)?);
        }

        for path in snapshot.file_infos.keys() {
            if !snapshot.changed_files_set.contains(path) {
                snapshot
                    .semantic_diagnostics_per_file
                    .insert(path.clone(), Arc::new(CachedDiagnostics::empty()));
            }
        }
        for entry in &self.semantic_diagnostics_per_file {
            match entry {
                SemanticDiagnosticsEntry::Pending(id) => {
                    snapshot.semantic_diagnostics_per_file.remove(&decoder.path(*id)?);
                }
                SemanticDiagnosticsEntry::Diagnostics(id, diagnostics) => {
                    let diagnostics = decoder.diagnostics(diagnostics)?;
                    snapshot
                        .semantic_diagnostics_per_file
                        .insert(decoder.path(*id)?, Arc::new(CachedDiagnostics::persisted(diagnostics)));
                }
            }
        }

        for entry in &self.emit_diagnostics_per_file {
            let diagnostics = decoder.diagnostics(&entry.1)?;
            snapshot
                .emit_diagnostics_per_file
                .insert(decoder.path(entry.0)?, Arc::new(CachedDiagnostics::persisted(diagnostics)));
        }

        let full = FileEmitKind::from_options(&snapshot.options);
        for entry in &self.affected_files_pending_emit {
            let (id, kind) = match *entry {
                PendingEmitEntry::Full(id) | PendingEmitEntry::Kind(id, 0) => (id, full),
                PendingEmitEntry::Dts([id]) => (id, FileEmitKind::DTS),
                PendingEmitEntry::Kind(id, bits) => {
                    let kind = FileEmitKind::from_bits(bits).ok_or_else(|| BuildInfoError::Decode {
                        reason: format!("unknown emit kind {bits} for file {}", id.as_raw()),
                    })?;
                    (id, kind)
                }
            };
            snapshot.affected_files_pending_emit.insert(decoder.path(id)?, kind);
        }

        snapshot.latest_changed_dts_file = self
            .latest_changed_dts_file
            .as_deref()
            .map(|file| get_normalized_absolute_path(file, &directory));

        Ok(snapshot)
    }
}

/// Resolves ids against the decoded `fileNames` and `fileIdsList`.
struct Decoder {
    paths: Vec<FilePath>,
    lists: Vec<BTreeSet<FilePath>>,
}

impl Decoder {
    fn new(build_info: &BuildInfo, directory: &str, case_sensitive: bool) -> Result<Self, BuildInfoError> {
        let paths: Vec<FilePath> = build_info
            .file_names
            .iter()
            .map(|name| to_path(name, directory, case_sensitive))
            .collect();
        let mut decoder = Decoder {
            paths,
            lists: Vec::with_capacity(build_info.file_ids_list.len()),
        };
        for ids in &build_info.file_ids_list {
            let list = ids
                .iter()
                .map(|&id| decoder.path(id))
                .collect::<Result<BTreeSet<_>, _>>()?;
            decoder.lists.push(list);
        }
        Ok(decoder)
    }

    fn path_at(&self, index: usize) -> Result<FilePath, BuildInfoError> {
        self.paths
            .get(index)
            .cloned()
            .ok_or_else(|| BuildInfoError::InvalidFileId {
                id: u32::try_from(index + 1).unwrap_or(u32::MAX),
                len: self.paths.len(),
            })
    }

    fn path(&self, id: FileId) -> Result<FilePath, BuildInfoError> {
        self.path_at(id.index())
    }

    fn list(&self, id: FileIdListId) -> Result<&BTreeSet<FilePath>, BuildInfoError> {
        self.lists
            .get(id.index())
            .ok_or_else(|| BuildInfoError::InvalidFileIdListId {
                id: id.as_raw(),
                len: self.lists.len(),
            })
    }

    fn diagnostics(&self, diagnostics: &[BuildInfoDiagnostic]) -> Result<Vec<PersistedDiagnostic>, BuildInfoError> {
        diagnostics.iter().map(|diag| self.diagnostic(diag)).collect()
    }

    fn diagnostic(&self, diag: &BuildInfoDiagnostic) -> Result<PersistedDiagnostic, BuildInfoError> {
        let file = match diag.file {
            None => PersistedFile::Owner,
            Some(BuildInfoDiagnosticFile::Global(false)) => PersistedFile::Global,
            Some(BuildInfoDiagnosticFile::Global(true)) => {
                return Err(BuildInfoError::Decode {
                    reason: "diagnostic file must be an id or false".to_string(),
                })
            }
            Some(BuildInfoDiagnosticFile::File(id)) => PersistedFile::Other(self.path(id)?),
        };
        let category = Category::from_u8(diag.category).ok_or_else(|| BuildInfoError::Decode {
            reason: format!("unknown diagnostic category {}", diag.category),
        })?;
        Ok(PersistedDiagnostic {
            file,
            pos: diag.pos,
            end: diag.end,
            code: diag.code,
            category,
            message: diag.message.clone(),
            message_chain: self.diagnostics(&diag.message_chain)?,
            related_information: self.diagnostics(&diag.related_information)?,
            reports_unnecessary: diag.reports_unnecessary,
            reports_deprecated: diag.reports_deprecated,
            skipped_on_no_emit: diag.skipped_on_no_emit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::{BuildInfoFileInfo, DiagnosticsOfFile, BUILD_INFO_VERSION};
    use super::*;
    use crate::file_info::FileInfo;
    use strata_program::ResolutionMode;

    fn id(raw: u32) -> FileId {
        FileId::from_raw(raw).unwrap()
    }

    fn build_info() -> BuildInfo {
        let mut options = serde_json::Map::new();
        options.insert("composite".into(), true.into());
        options.insert("module".into(), 1.into());
        BuildInfo {
            version: BUILD_INFO_VERSION.to_string(),
            errors: true,
            check_pending: true,
            file_names: vec!["./src/a.ts".into(), "./src/b.ts".into(), "./lib.d.ts".into()],
            file_infos: vec![
                BuildInfoFileInfo(FileInfo::new("va".into(), false, ResolutionMode::None)),
                BuildInfoFileInfo(FileInfo {
                    signature: "sb".into(),
                    ..FileInfo::new("vb".into(), false, ResolutionMode::None)
                }),
            ],
            file_ids_list: vec![vec![id(1), id(3)]],
            options,
            referenced_map: vec![(id(2), FileIdListId::from_raw(1).unwrap())],
            semantic_diagnostics_per_file: vec![SemanticDiagnosticsEntry::Pending(id(2))],
            emit_diagnostics_per_file: vec![DiagnosticsOfFile(
                id(1),
                vec![BuildInfoDiagnostic {
                    file: Some(BuildInfoDiagnosticFile::File(id(2))),
                    pos: 0,
                    end: 1,
                    code: 4025,
                    category: 1,
                    message: "m".into(),
                    message_chain: Vec::new(),
                    related_information: Vec::new(),
                    reports_unnecessary: false,
                    reports_deprecated: false,
                    skipped_on_no_emit: false,
                }],
            )],
            change_file_set: Vec::new(),
            affected_files_pending_emit: vec![PendingEmitEntry::Full(id(1)), PendingEmitEntry::Dts([id(2)])],
            latest_changed_dts_file: Some("./out/b.d.ts".into()),
            emit_signatures: vec![
                EmitSignatureEntry::NotEmitted(id(1)),
                EmitSignatureEntry::DifferentOptions(id(2), Vec::new()),
            ],
        }
    }

    #[test]
    fn decodes_relative_to_build_info_directory() {
        let snapshot = build_info().to_snapshot("proj/app.tsbuildinfo", "/w", true).unwrap();
        let a = FilePath::from_canonical("/w/proj/src/a.ts");
        let b = FilePath::from_canonical("/w/proj/src/b.ts");
        let lib = FilePath::from_canonical("/w/proj/lib.d.ts");

        assert_eq!(snapshot.has_errors(), Some(true));
        assert!(snapshot.check_pending());
        assert_eq!(snapshot.file_info(&b).unwrap().signature, "sb");
        assert_eq!(
            snapshot.referenced_map().unwrap().references(&b),
            Some(&BTreeSet::from([a.clone(), lib]))
        );
        assert!(snapshot.has_semantic_diagnostics(&a));
        assert!(!snapshot.has_semantic_diagnostics(&b));
        assert_eq!(snapshot.emit_diagnostics_of(&a).unwrap()[0].file, Some(b.clone()));
        assert_eq!(snapshot.affected_files_pending_emit()[&b], FileEmitKind::DTS);
        assert_eq!(
            snapshot.affected_files_pending_emit()[&a],
            FileEmitKind::from_options(snapshot.options())
        );
        assert_eq!(snapshot.latest_changed_dts_file(), Some("/w/proj/out/b.d.ts"));
        assert_eq!(snapshot.emit_signature(&a), None);
        assert_eq!(
            snapshot.emit_signature(&b),
            Some(&EmitSignature::DifferentOptions("sb".into()))
        );
    }

    #[test]
    fn flags_survive_the_json_text() {
        let text = serde_json::to_string(&build_info()).unwrap();
        assert!(text.contains("\"checkPending\":true"));
        let parsed = BuildInfo::parse(&text).unwrap();
        assert!(parsed.check_pending);
        assert!(parsed.errors);

        let cleared = BuildInfo {
            check_pending: false,
            ..build_info()
        };
        let text = serde_json::to_string(&cleared).unwrap();
        assert!(!text.contains("checkPending"));
        assert!(!BuildInfo::parse(&text).unwrap().check_pending);
    }

    #[test]
    fn out_of_range_ids_are_errors() {
        let mut info = build_info();
        info.change_file_set.push(id(9));
        assert!(matches!(
            info.to_snapshot("/w/app.tsbuildinfo", "/w", true),
            Err(BuildInfoError::InvalidFileId { id: 9, len: 3 })
        ));

        let mut info = build_info();
        info.referenced_map.push((id(1), FileIdListId::from_raw(4).unwrap()));
        assert!(matches!(
            info.to_snapshot("/w/app.tsbuildinfo", "/w", true),
            Err(BuildInfoError::InvalidFileIdListId { id: 4, len: 1 })
        ));
    }
}
