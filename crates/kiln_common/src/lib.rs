//! Shared foundational types used across the Kiln asset toolkit.
//!
//! This crate provides content hashing for patch and output verification and
//! the internal-error result type used for conditions that indicate a bug.

#![warn(missing_docs)]

pub mod hash;
pub mod result;

pub use hash::ContentHash;
pub use result::{InternalError, KilnResult};
