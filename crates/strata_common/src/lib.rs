//! Shared foundational types used across the Strata incremental compiler.
//!
//! This crate provides canonical file paths and path arithmetic, content hashing
//! for file versions and shape signatures, the interned 1-based file identifiers
//! used by the build-info encoder, and common result types.

#![warn(missing_docs)]

pub mod file_id;
pub mod hash;
pub mod path;
pub mod result;

pub use file_id::{FileId, FileIdInterner};
pub use hash::{compute_hash, ContentHash};
pub use path::FilePath;
pub use result::{InternalError, StrataResult};
