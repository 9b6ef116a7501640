//! Expanded, human-readable rendering of build info.
//!
//! Every id is replaced by the file name it stands for, and emit kinds are
//! spelled out. Used by tooling and tests to inspect what a build persisted.

use super::{
    BuildInfo, BuildInfoDiagnostic, BuildInfoDiagnosticFile, EmitSignatureEntry, FileIdListId,
    PendingEmitEntry, SemanticDiagnosticsEntry,
};
use crate::emit_kind::FileEmitKind;
use crate::error::BuildInfoError;
use serde_json::{json, Map, Value};
use strata_common::FileId;
use strata_diagnostics::Category;

/// Renders `build_info` with file ids expanded to names.
pub fn readable_build_info(build_info: &BuildInfo) -> Result<Value, BuildInfoError> {
    let names = Names(build_info);
    let mut out = Map::new();
    out.insert("version".into(), json!(build_info.version));
    if build_info.errors {
        out.insert("errors".into(), json!(true));
    }
    if build_info.check_pending {
        out.insert("checkPending".into(), json!(true));
    }
    if build_info.is_incremental() {
        out.insert("fileNames".into(), json!(build_info.file_names));
    }

    let file_infos = build_info
        .file_infos
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let info = &entry.0;
            let mut object = Map::new();
            object.insert(
                "fileName".into(),
                json!(build_info.file_names.get(index).cloned().unwrap_or_default()),
            );
            object.insert("version".into(), json!(info.version));
            object.insert("signature".into(), json!(info.signature));
            if info.affects_global_scope {
                object.insert("affectsGlobalScope".into(), json!(true));
            }
            let format: u8 = info.implied_node_format.into();
            if format != 0 {
                object.insert("impliedNodeFormat".into(), json!(format));
            }
            object.insert("original".into(), serde_json::to_value(entry)?);
            Ok(Value::Object(object))
        })
        .collect::<Result<Vec<_>, BuildInfoError>>()?;
    insert_non_empty(&mut out, "fileInfos", file_infos);

    let lists = build_info
        .file_ids_list
        .iter()
        .map(|ids| names.files(ids).map(Value::from))
        .collect::<Result<Vec<_>, _>>()?;
    insert_non_empty(&mut out, "fileIdsList", lists);

    if !build_info.options.is_empty() {
        out.insert("options".into(), Value::Object(build_info.options.clone()));
    }

    let mut referenced_map = Map::new();
    for &(id, list) in &build_info.referenced_map {
        referenced_map.insert(names.file(id)?, json!(names.list(list)?));
    }
    if !referenced_map.is_empty() {
        out.insert("referencedMap".into(), Value::Object(referenced_map));
    }

    let semantic = build_info
        .semantic_diagnostics_per_file
        .iter()
        .map(|entry| match entry {
            SemanticDiagnosticsEntry::Pending(id) => Ok(json!(names.file(*id)?)),
            SemanticDiagnosticsEntry::Diagnostics(id, diagnostics) => Ok(json!({
                "file": names.file(*id)?,
                "diagnostics": names.diagnostics(diagnostics)?,
            })),
        })
        .collect::<Result<Vec<_>, BuildInfoError>>()?;
    insert_non_empty(&mut out, "semanticDiagnosticsPerFile", semantic);

    let emit = build_info
        .emit_diagnostics_per_file
        .iter()
        .map(|entry| {
            Ok(json!({
                "file": names.file(entry.0)?,
                "diagnostics": names.diagnostics(&entry.1)?,
            }))
        })
        .collect::<Result<Vec<_>, BuildInfoError>>()?;
    insert_non_empty(&mut out, "emitDiagnosticsPerFile", emit);

    let changed = build_info
        .change_file_set
        .iter()
        .map(|&id| names.file(id).map(Value::from))
        .collect::<Result<Vec<_>, _>>()?;
    insert_non_empty(&mut out, "changeFileSet", changed);

    let pending = build_info
        .affected_files_pending_emit
        .iter()
        .map(|entry| {
            let (id, kind) = match *entry {
                PendingEmitEntry::Full(id) | PendingEmitEntry::Kind(id, 0) => (id, "Full".to_string()),
                PendingEmitEntry::Dts([id]) => (id, FileEmitKind::DTS.to_string()),
                PendingEmitEntry::Kind(id, bits) => (id, FileEmitKind::from_bits_retain(bits).to_string()),
            };
            Ok(json!({
                "file": names.file(id)?,
                "emitKind": kind,
                "original": serde_json::to_value(entry)?,
            }))
        })
        .collect::<Result<Vec<_>, BuildInfoError>>()?;
    insert_non_empty(&mut out, "affectedFilesPendingEmit", pending);

    if let Some(file) = &build_info.latest_changed_dts_file {
        out.insert("latestChangedDtsFile".into(), json!(file));
    }

    let signatures = build_info
        .emit_signatures
        .iter()
        .map(|entry| {
            let value = match entry {
                EmitSignatureEntry::NotEmitted(id) => json!({ "file": names.file(*id)?, "noEmitSignature": true }),
                EmitSignatureEntry::Signature(id, hash) => json!({ "file": names.file(*id)?, "signature": hash }),
                EmitSignatureEntry::DifferentOptions(id, hashes) => match hashes.first() {
                    None => json!({ "file": names.file(*id)?, "differsOnlyInDtsMap": true }),
                    Some(hash) => json!({
                        "file": names.file(*id)?,
                        "signature": hash,
                        "differsInOptions": true,
                    }),
                },
            };
            Ok(value)
        })
        .collect::<Result<Vec<_>, BuildInfoError>>()?;
    insert_non_empty(&mut out, "emitSignatures", signatures);

    Ok(Value::Object(out))
}

fn insert_non_empty(out: &mut Map<String, Value>, key: &str, values: Vec<Value>) {
    if !values.is_empty() {
        out.insert(key.to_string(), Value::Array(values));
    }
}

struct Names<'a>(&'a BuildInfo);

impl Names<'_> {
    fn file(&self, id: FileId) -> Result<String, BuildInfoError> {
        self.0
            .file_names
            .get(id.index())
            .cloned()
            .ok_or_else(|| BuildInfoError::InvalidFileId {
                id: id.as_raw(),
                len: self.0.file_names.len(),
            })
    }

    fn files(&self, ids: &[FileId]) -> Result<Vec<String>, BuildInfoError> {
        ids.iter().map(|&id| self.file(id)).collect()
    }

    fn list(&self, id: FileIdListId) -> Result<Vec<String>, BuildInfoError> {
        let ids = self
            .0
            .file_ids_list
            .get(id.index())
            .ok_or_else(|| BuildInfoError::InvalidFileIdListId {
                id: id.as_raw(),
                len: self.0.file_ids_list.len(),
            })?;
        self.files(ids)
    }

    fn diagnostics(&self, diagnostics: &[BuildInfoDiagnostic]) -> Result<Vec<Value>, BuildInfoError> {
        diagnostics.iter().map(|diag| self.diagnostic(diag)).collect()
    }

    fn diagnostic(&self, diag: &BuildInfoDiagnostic) -> Result<Value, BuildInfoError> {
        let mut object = Map::new();
        match diag.file {
            None => {}
            Some(BuildInfoDiagnosticFile::File(id)) => {
                object.insert("file".into(), json!(self.file(id)?));
            }
            Some(BuildInfoDiagnosticFile::Global(_)) => {
                object.insert("noFile".into(), json!(true));
            }
        }
        object.insert("pos".into(), json!(diag.pos));
        object.insert("end".into(), json!(diag.end));
        object.insert("code".into(), json!(diag.code));
        let category = Category::from_u8(diag.category).map_or("unknown", Category::name);
        object.insert("category".into(), json!(category));
        object.insert("message".into(), json!(diag.message));
        if !diag.message_chain.is_empty() {
            object.insert("messageChain".into(), json!(self.diagnostics(&diag.message_chain)?));
        }
        if !diag.related_information.is_empty() {
            object.insert(
                "relatedInformation".into(),
                json!(self.diagnostics(&diag.related_information)?),
            );
        }
        for (key, set) in [
            ("reportsUnnecessary", diag.reports_unnecessary),
            ("reportsDeprecated", diag.reports_deprecated),
            ("skippedOnNoEmit", diag.skipped_on_no_emit),
        ] {
            if set {
                object.insert(key.into(), json!(true));
            }
        }
        Ok(Value::Object(object))
    }
}
