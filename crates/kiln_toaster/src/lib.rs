//! Batch driver that applies a spell pipeline to many asset files.
//!
//! The [`Toaster`] discovers input files, filters them by name, and hands
//! each file to a worker of a bounded thread pool. A worker owns everything
//! about its file: it loads the graph, runs the pipeline, and writes the
//! result (or a patch against the input) atomically. Finished files are
//! sent as [`FileOutcome`]s to a single collector that builds the
//! [`ToastReport`].

#![warn(missing_docs)]

pub mod cancel;
pub mod discover;
pub mod error;
pub mod options;
pub mod output;
pub mod process;
pub mod report;
pub mod toaster;

pub use cancel::CancelToken;
pub use discover::{discover, FileFilter, SourceFile};
pub use error::ToastError;
pub use options::ToastOptions;
pub use output::OutputPlan;
pub use report::{FileOutcome, FileStatus, ToastReport};
pub use toaster::Toaster;
