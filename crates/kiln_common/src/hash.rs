//! Content checksums for patches and written outputs.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::xxh3_128;

/// XXH3-128 checksum of a byte blob, stored little-endian.
///
/// A patch records the checksum of the blob it was made against and of the
/// blob it produces; `apply` refuses to run against anything else.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Checksums `data`.
    pub fn of(data: &[u8]) -> Self {
        Self(xxh3_128(data).to_le_bytes())
    }

    /// Returns `true` if `data` has this checksum.
    pub fn matches(&self, data: &[u8]) -> bool {
        *self == Self::of(data)
    }

    /// The first eight hex digits, for log lines.
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({}..)", self.short())
    }
}
