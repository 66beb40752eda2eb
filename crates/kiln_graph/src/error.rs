//! Errors produced while loading or mutating a block graph.

use crate::ids::BlockId;

/// The byte stream does not follow the container format.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// The stream ended before a field could be read.
    #[error("unexpected end of input at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEof {
        /// Offset of the truncated field.
        offset: usize,
        /// Bytes the field required.
        needed: usize,
    },

    /// The first four bytes are not `KILN`.
    #[error("bad magic {found:?}, expected \"KILN\"")]
    BadMagic {
        /// The bytes found instead.
        found: [u8; 4],
    },

    /// The header carries a version this build cannot read.
    #[error("unsupported container version {0}")]
    UnsupportedVersion(u32),

    /// A count field claims more elements than the remaining bytes can hold.
    #[error("{what} count {count} at offset {offset} exceeds the remaining input")]
    CountTooLarge {
        /// What was being counted.
        what: &'static str,
        /// The count that was read.
        count: u64,
        /// Offset of the count field.
        offset: usize,
    },

    /// A field holds a value outside its domain.
    #[error("invalid {what} value {value} at offset {offset}")]
    InvalidValue {
        /// The field name.
        what: &'static str,
        /// The offending value.
        value: i64,
        /// Offset of the field.
        offset: usize,
    },

    /// A string field is not valid UTF-8.
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 {
        /// Offset of the string bytes.
        offset: usize,
    },

    /// A record body failed to decode.
    #[error("block {block}: {source}")]
    InBlock {
        /// Index of the record.
        block: u32,
        /// The underlying failure, with offsets relative to the record body.
        source: Box<ParseError>,
    },

    /// Bytes remain after the last record.
    #[error("{0} trailing bytes after the last record")]
    TrailingBytes(usize),

    /// A payload did not consume its whole record body.
    #[error("{0} unread bytes at the end of the payload")]
    PayloadTrailing(usize),
}

/// A problem with the edges between blocks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// A block lists itself as an owned child.
    #[error("block {0} owns itself")]
    SelfOwnership(BlockId),

    /// Owning edges form a cycle.
    #[error("owning cycle through blocks {}", format_ids(.blocks))]
    OwnershipCycle {
        /// The blocks on the cycle, in edge order.
        blocks: Vec<BlockId>,
    },

    /// A link names a block index that does not exist.
    #[error("block {block} links to index {target}, but the file has {count} blocks")]
    OutOfRange {
        /// The linking block.
        block: BlockId,
        /// The target that was read.
        target: i32,
        /// Number of blocks in the file.
        count: u32,
    },

    /// A block references itself.
    #[error("block {0} references itself")]
    SelfReference(BlockId),

    /// A header root is neither null nor a valid block index.
    #[error("root {0} is not a valid block index")]
    InvalidRoot(i32),
}

impl StructuralError {
    /// Returns `true` if the file cannot be processed at all.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StructuralError::SelfOwnership(_) | StructuralError::OwnershipCycle { .. }
        )
    }
}

fn format_ids(ids: &[BlockId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors returned by graph loading and mutation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// The stream is malformed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The edges violate a fatal structural rule.
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    /// The block does not exist or has been deleted.
    #[error("unknown or deleted block {0}")]
    UnknownBlock(BlockId),
}
