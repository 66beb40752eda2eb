//! Binary patches between two versions of a file.
//!
//! [`diff`] encodes the difference between an old and a new blob as a
//! compact patch, and [`apply`] reproduces the new blob from the old one and
//! the patch. Patches carry checksums of both sides, so applying a patch to
//! the wrong input, or a damaged patch, is reported instead of producing a
//! corrupt file. The file-level helpers write their outputs atomically.

#![warn(missing_docs)]

pub mod apply;
pub mod atomic;
pub mod codes;
pub mod diff;
pub mod error;
pub mod format;
pub mod tree;

pub use apply::apply;
pub use atomic::write_atomic;
pub use diff::{diff, diff_ops, BLOCK_SIZE};
pub use error::PatchError;
pub use format::{Op, PatchHeader, PATCH_FORMAT_VERSION, PATCH_MAGIC};
pub use tree::{apply_file, diff_file, diff_tree, patch_path_for, TreeSummary};
