//! Per-file diagnostics caches.
//!
//! Diagnostics loaded from build info stay in their persisted form until a
//! caller asks for them. The first request materializes them and the result
//! is memoized, so a file whose diagnostics are never read costs nothing
//! beyond decoding.

use std::sync::OnceLock;
use strata_common::FilePath;
use strata_diagnostics::{Category, Diagnostic};

/// Where a persisted diagnostic is located.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PersistedFile {
    /// The file whose cache entry holds the diagnostic.
    Owner,
    /// No file; the diagnostic is global.
    Global,
    /// Some other file.
    Other(FilePath),
}

/// A diagnostic with its location relative to the owning file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedDiagnostic {
    /// The file the diagnostic is reported in.
    pub file: PersistedFile,
    /// Start offset.
    pub pos: u32,
    /// End offset.
    pub end: u32,
    /// Diagnostic code.
    pub code: u32,
    /// Diagnostic category.
    pub category: Category,
    /// Message text.
    pub message: String,
    /// Elaboration messages.
    pub message_chain: Vec<PersistedDiagnostic>,
    /// Related locations.
    pub related_information: Vec<PersistedDiagnostic>,
    /// See [`Diagnostic::reports_unnecessary`].
    pub reports_unnecessary: bool,
    /// See [`Diagnostic::reports_deprecated`].
    pub reports_deprecated: bool,
    /// See [`Diagnostic::skipped_on_no_emit`].
    pub skipped_on_no_emit: bool,
}

impl PersistedDiagnostic {
    /// Records `diag` relative to `owner`.
    pub fn from_diagnostic(diag: &Diagnostic, owner: &FilePath) -> Self {
        let file = match &diag.file {
            None => PersistedFile::Global,
            Some(file) if file == owner => PersistedFile::Owner,
            Some(file) => PersistedFile::Other(file.clone()),
        };
        Self {
            file,
            pos: diag.pos,
            end: diag.end,
            code: diag.code,
            category: diag.category,
            message: diag.message.clone(),
            message_chain: diag
                .message_chain
                .iter()
                .map(|chain| Self::from_diagnostic(chain, owner))
                .collect(),
            related_information: diag
                .related_information
                .iter()
                .map(|related| Self::from_diagnostic(related, owner))
                .collect(),
            reports_unnecessary: diag.reports_unnecessary,
            reports_deprecated: diag.reports_deprecated,
            skipped_on_no_emit: diag.skipped_on_no_emit,
        }
    }

    /// Materializes the diagnostic for the cache entry of `owner`.
    pub fn to_diagnostic(&self, owner: &FilePath) -> Diagnostic {
        let file = match &self.file {
            PersistedFile::Owner => Some(owner.clone()),
            PersistedFile::Global => None,
            PersistedFile::Other(file) => Some(file.clone()),
        };
        Diagnostic {
            file,
            pos: self.pos,
            end: self.end,
            code: self.code,
            category: self.category,
            message: self.message.clone(),
            message_chain: self.message_chain.iter().map(|d| d.to_diagnostic(owner)).collect(),
            related_information: self
                .related_information
                .iter()
                .map(|d| d.to_diagnostic(owner))
                .collect(),
            reports_unnecessary: self.reports_unnecessary,
            reports_deprecated: self.reports_deprecated,
            skipped_on_no_emit: self.skipped_on_no_emit,
        }
    }
}

/// Cached diagnostics of one file, either live or still in persisted form.
#[derive(Debug, Default)]
pub struct CachedDiagnostics {
    resolved: OnceLock<Vec<Diagnostic>>,
    persisted: Option<Vec<PersistedDiagnostic>>,
}

impl CachedDiagnostics {
    /// Diagnostics computed in this process.
    pub fn resolved(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            resolved: OnceLock::from(diagnostics),
            persisted: None,
        }
    }

    /// Diagnostics decoded from build info, materialized on first read.
    pub fn persisted(diagnostics: Vec<PersistedDiagnostic>) -> Self {
        Self {
            resolved: OnceLock::new(),
            persisted: Some(diagnostics),
        }
    }

    /// A file known to have no diagnostics.
    pub fn empty() -> Self {
        Self::resolved(Vec::new())
    }

    /// Returns `true` if there are no diagnostics.
    pub fn is_empty(&self) -> bool {
        match (self.resolved.get(), &self.persisted) {
            (Some(resolved), _) => resolved.is_empty(),
            (None, Some(persisted)) => persisted.is_empty(),
            (None, None) => true,
        }
    }

    /// Number of top-level diagnostics.
    pub fn len(&self) -> usize {
        match (self.resolved.get(), &self.persisted) {
            (Some(resolved), _) => resolved.len(),
            (None, Some(persisted)) => persisted.len(),
            (None, None) => 0,
        }
    }

    /// The diagnostics, materialized against `owner` if still persisted.
    pub fn diagnostics(&self, owner: &FilePath) -> &[Diagnostic] {
        self.resolved.get_or_init(|| {
            self.persisted
                .iter()
                .flatten()
                .map(|diag| diag.to_diagnostic(owner))
                .collect()
        })
    }

    /// The diagnostics in persisted form.
    pub fn to_persisted(&self, owner: &FilePath) -> Vec<PersistedDiagnostic> {
        if let Some(persisted) = &self.persisted {
            return persisted.clone();
        }
        self.diagnostics(owner)
            .iter()
            .map(|diag| PersistedDiagnostic::from_diagnostic(diag, owner))
            .collect()
    }

    /// Returns `true` if the diagnostics have not been materialized yet.
    pub fn is_deferred(&self) -> bool {
        self.resolved.get().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_diagnostics::messages;

    #[test]
    fn persisted_form_is_relative_to_owner() {
        let owner = FilePath::from_canonical("/p/a.ts");
        let other = FilePath::from_canonical("/p/b.ts");
        let diag = Diagnostic::at(&owner, 1, 4, &messages::CANNOT_FIND_NAME, &["z"])
            .with_related(Diagnostic::at(&other, 0, 1, &messages::DECLARED_HERE, &["z"]));
        let persisted = PersistedDiagnostic::from_diagnostic(&diag, &owner);
        assert_eq!(persisted.file, PersistedFile::Owner);
        assert_eq!(persisted.related_information[0].file, PersistedFile::Other(other));
        assert_eq!(persisted.to_diagnostic(&owner), diag);

        let global = Diagnostic::global(&messages::FILE_NOT_FOUND, &["x.ts"]);
        let persisted = PersistedDiagnostic::from_diagnostic(&global, &owner);
        assert_eq!(persisted.file, PersistedFile::Global);
        assert_eq!(persisted.to_diagnostic(&owner), global);
    }

    #[test]
    fn persisted_diagnostics_materialize_once() {
        let owner = FilePath::from_canonical("/p/a.ts");
        let diag = Diagnostic::at(&owner, 0, 1, &messages::CANNOT_FIND_NAME, &["q"]);
        let cached = CachedDiagnostics::persisted(vec![PersistedDiagnostic::from_diagnostic(&diag, &owner)]);
        assert!(cached.is_deferred());
        assert_eq!(cached.len(), 1);
        assert_eq!(cached.diagnostics(&owner), &[diag.clone()]);
        assert!(!cached.is_deferred());
        assert_eq!(cached.to_persisted(&owner)[0].to_diagnostic(&owner), diag);
    }

    #[test]
    fn empty_cache() {
        let owner = FilePath::from_canonical("/p/a.ts");
        let cached = CachedDiagnostics::empty();
        assert!(cached.is_empty());
        assert!(cached.diagnostics(&owner).is_empty());
        assert!(CachedDiagnostics::persisted(Vec::new()).is_empty());
    }
}
