//! Error types for reading and decoding build info.

/// Errors raised while loading or decoding a build-info file.
///
/// Loading build info to seed an incremental build is fail-safe: callers
/// treat any of these as "no previous state" and rebuild from scratch. The
/// variants exist so the reason can be logged and surfaced by tooling.
#[derive(Debug, thiserror::Error)]
pub enum BuildInfoError {
    /// The build-info file could not be read.
    #[error("cannot read build info {path}: {source}")]
    Io {
        /// The build-info file.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid build-info JSON.
    #[error("malformed build info: {reason}")]
    Parse {
        /// Description of the parse failure.
        reason: String,
    },

    /// The file was written by a different toolchain version.
    #[error("build info version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The running toolchain's version.
        expected: String,
        /// The version recorded in the file.
        actual: String,
    },

    /// A field parsed but holds a value that cannot be decoded.
    #[error("invalid build info: {reason}")]
    Decode {
        /// Description of the invalid value.
        reason: String,
    },

    /// A file id points past the end of `fileNames`.
    #[error("file id {id} out of range ({len} file names)")]
    InvalidFileId {
        /// The offending 1-based id.
        id: u32,
        /// Number of entries in `fileNames`.
        len: usize,
    },

    /// A file-id-list id points past the end of `fileIdsList`.
    #[error("file id list {id} out of range ({len} lists)")]
    InvalidFileIdListId {
        /// The offending 1-based id.
        id: u32,
        /// Number of entries in `fileIdsList`.
        len: usize,
    },
}

impl From<serde_json::Error> for BuildInfoError {
    fn from(e: serde_json::Error) -> Self {
        BuildInfoError::Parse {
            reason: e.to_string(),
        }
    }
}

impl From<strata_config::ConfigError> for BuildInfoError {
    fn from(e: strata_config::ConfigError) -> Self {
        BuildInfoError::Decode {
            reason: e.to_string(),
        }
    }
}
