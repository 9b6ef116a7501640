//! The Strata incremental engine.
//!
//! A [`Snapshot`] records, per file, a content hash (the version) and a hash
//! of the file's declaration output (the shape signature), together with the
//! reference graph, cached diagnostics, and the outputs each file still owes.
//! Diffing a new program against the previous snapshot yields the set of
//! changed files; the affected-file worklist then walks the reverse
//! reference graph, stopping wherever a file's shape did not change, so an
//! edit that leaves a file's public surface alone never re-checks its
//! importers.
//!
//! [`IncrementalProgram`] wraps a program and its snapshot behind the usual
//! diagnostics and emit calls. Between processes, state persists in a
//! build-info file ([`BuildInfo`]) written after the last output.

#![warn(missing_docs)]

mod affected;
pub mod build_info;
pub mod diagnostics_cache;
mod emit;
pub mod emit_kind;
pub mod error;
pub mod file_info;
pub mod program;
pub mod reference_graph;
pub mod signature;
pub mod snapshot;

pub use build_info::{readable_build_info, BuildInfo, BUILD_INFO_VERSION};
pub use diagnostics_cache::{CachedDiagnostics, PersistedDiagnostic, PersistedFile};
pub use emit_kind::{pending_emit_kind, FileEmitKind};
pub use error::BuildInfoError;
pub use file_info::FileInfo;
pub use program::{read_build_info, read_build_info_program, IncrementalProgram};
pub use reference_graph::ReferenceGraph;
pub use signature::EmitSignature;
pub use snapshot::Snapshot;
