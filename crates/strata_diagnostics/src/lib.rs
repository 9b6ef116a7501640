//! Diagnostic records, message catalogue, rendering, and signature folding.
//!
//! This crate provides the [`Diagnostic`] record shared by the frontend and
//! the incremental engine, the [`messages`] catalogue of known diagnostic
//! codes, [`DiagnosticRenderer`] implementations for terminal output, and the
//! canonical text folding used when hashing declaration diagnostics into
//! shape signatures.

#![warn(missing_docs)]

pub mod category;
pub mod diagnostic;
pub mod messages;
pub mod renderer;
pub mod signature;

pub use category::Category;
pub use diagnostic::Diagnostic;
pub use messages::DiagnosticMessage;
pub use renderer::{DiagnosticRenderer, SourceLookup, TerminalRenderer};
pub use signature::write_diagnostic_for_signature;
