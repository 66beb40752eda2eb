//! Error types for diff and apply.

use std::path::PathBuf;

use kiln_common::ContentHash;
use kiln_diagnostics::DiagnosticCode;

use crate::codes;

/// Errors raised while making or applying a patch.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// The old blob does not match the one the patch was made against.
    #[error("patch does not apply to this input: expected {expected_len} bytes with checksum {expected}, got {actual_len} bytes with checksum {actual}")]
    SourceMismatch {
        /// Length recorded in the patch.
        expected_len: u64,
        /// Checksum recorded in the patch.
        expected: ContentHash,
        /// Length of the given input.
        actual_len: u64,
        /// Checksum of the given input.
        actual: ContentHash,
    },

    /// The patch is malformed or its operations are out of bounds.
    #[error("corrupt patch: {reason}")]
    Corrupt {
        /// What was wrong with it.
        reason: String,
    },

    /// The reconstructed blob does not match the recorded checksum.
    #[error("patched output does not match: expected checksum {expected}, got {actual}")]
    ResultMismatch {
        /// Checksum recorded in the patch.
        expected: ContentHash,
        /// Checksum of the reconstructed output.
        actual: ContentHash,
    },

    /// An I/O error while reading or writing a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl PatchError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        PatchError::Corrupt {
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PatchError::Io {
            path: path.into(),
            source,
        }
    }

    /// The diagnostic code reported for this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            PatchError::SourceMismatch { .. } => codes::SOURCE_MISMATCH,
            PatchError::Corrupt { .. } => codes::CORRUPT_PATCH,
            PatchError::ResultMismatch { .. } => codes::RESULT_MISMATCH,
            PatchError::Io { .. } => codes::PATCH_IO,
        }
    }
}
