//! Errors that prevent a batch from starting.

use std::path::PathBuf;

use kiln_spells::EngineError;

/// Errors raised while setting up a toaster run. Problems with individual
/// files never surface here; they are recorded in the report.
#[derive(Debug, thiserror::Error)]
pub enum ToastError {
    /// A file name pattern is not a valid regular expression.
    #[error("invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern as given.
        pattern: String,
        /// The regex compiler's complaint.
        source: regex::Error,
    },

    /// The spell pipeline or block filter cannot be built.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// No spell was requested.
    #[error("no spells given")]
    NoSpells,

    /// An input path could not be read.
    #[error("cannot read input {path}: {source}")]
    Input {
        /// The input path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The worker pool could not be created.
    #[error("cannot start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
