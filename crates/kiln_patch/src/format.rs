//! The patch container.
//!
//! ```text
//! magic        "KPAT"
//! header_len   u32 (little-endian)
//! header       bincode PatchHeader
//! ops          zlib-compressed bincode Vec<Op>
//! ```

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use kiln_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::PatchError;

/// Magic bytes identifying a Kiln patch.
pub const PATCH_MAGIC: [u8; 4] = *b"KPAT";

/// Current patch format version.
pub const PATCH_FORMAT_VERSION: u32 = 1;

/// Upper bound on the decompressed op stream relative to the output size.
/// Op framing never costs more than this many bytes per output byte plus a
/// constant, so anything larger is not a patch this crate wrote.
const MAX_OPS_OVERHEAD: u64 = 16;

/// Hard ceiling on the decompressed op stream, whatever the header claims.
const MAX_OPS_BYTES: u64 = 1 << 30;

/// Describes the two blobs a patch connects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchHeader {
    /// Patch format version.
    pub format_version: u32,
    /// Length of the old blob.
    pub old_len: u64,
    /// Length of the new blob.
    pub new_len: u64,
    /// Checksum of the old blob.
    pub old_checksum: ContentHash,
    /// Checksum of the new blob.
    pub new_checksum: ContentHash,
}

impl PatchHeader {
    /// Builds the header for a patch from `old` to `new`.
    pub fn describe(old: &[u8], new: &[u8]) -> Self {
        Self {
            format_version: PATCH_FORMAT_VERSION,
            old_len: old.len() as u64,
            new_len: new.len() as u64,
            old_checksum: ContentHash::of(old),
            new_checksum: ContentHash::of(new),
        }
    }
}

/// One step of reconstructing the new blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Copy `len` bytes of the old blob starting at `offset`.
    Copy {
        /// Start in the old blob.
        offset: u64,
        /// Number of bytes.
        len: u64,
    },
    /// Append literal bytes.
    Insert(Vec<u8>),
}

impl Op {
    /// Number of output bytes this op produces.
    pub fn output_len(&self) -> u64 {
        match self {
            Op::Copy { len, .. } => *len,
            Op::Insert(bytes) => bytes.len() as u64,
        }
    }
}

/// Serializes a header and op stream into a patch.
pub fn encode(header: &PatchHeader, ops: &[Op]) -> Result<Vec<u8>, PatchError> {
    let config = bincode::config::standard();
    let header_bytes = bincode::serde::encode_to_vec(header, config)
        .map_err(|e| PatchError::corrupt(format!("cannot encode header: {e}")))?;
    let op_bytes = bincode::serde::encode_to_vec(ops, config)
        .map_err(|e| PatchError::corrupt(format!("cannot encode ops: {e}")))?;

    let mut out = Vec::with_capacity(8 + header_bytes.len() + op_bytes.len() / 2);
    out.extend_from_slice(&PATCH_MAGIC);
    out.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&header_bytes);

    let mut encoder = ZlibEncoder::new(out, Compression::default());
    encoder
        .write_all(&op_bytes)
        .map_err(|e| PatchError::corrupt(format!("cannot compress ops: {e}")))?;
    encoder
        .finish()
        .map_err(|e| PatchError::corrupt(format!("cannot compress ops: {e}")))
}

/// Reads only the header of a patch.
pub fn decode_header(patch: &[u8]) -> Result<(PatchHeader, &[u8]), PatchError> {
    if patch.len() < 8 {
        return Err(PatchError::corrupt(format!(
            "{} bytes is too short for a patch",
            patch.len()
        )));
    }
    if patch[0..4] != PATCH_MAGIC {
        return Err(PatchError::corrupt("bad magic"));
    }
    let header_len = u32::from_le_bytes([patch[4], patch[5], patch[6], patch[7]]) as usize;
    let body = &patch[8..];
    if header_len > body.len() {
        return Err(PatchError::corrupt(format!(
            "header length {header_len} exceeds patch size"
        )));
    }
    let (header, _): (PatchHeader, usize) =
        bincode::serde::decode_from_slice(&body[..header_len], bincode::config::standard())
            .map_err(|e| PatchError::corrupt(format!("bad header: {e}")))?;
    if header.format_version != PATCH_FORMAT_VERSION {
        return Err(PatchError::corrupt(format!(
            "unsupported patch format version {}",
            header.format_version
        )));
    }
    Ok((header, &body[header_len..]))
}

/// Parses a patch into its header and op stream.
pub fn decode(patch: &[u8]) -> Result<(PatchHeader, Vec<Op>), PatchError> {
    let (header, compressed) = decode_header(patch)?;
    let ops = decode_ops(&header, compressed)?;
    Ok((header, ops))
}

/// Inflates and parses the op stream that follows a header.
pub fn decode_ops(header: &PatchHeader, compressed: &[u8]) -> Result<Vec<Op>, PatchError> {
    let limit = ops_limit(header.new_len);
    let mut op_bytes = Vec::new();
    ZlibDecoder::new(compressed)
        .take(limit.saturating_add(1))
        .read_to_end(&mut op_bytes)
        .map_err(|e| PatchError::corrupt(format!("bad op stream: {e}")))?;
    if op_bytes.len() as u64 > limit {
        return Err(PatchError::corrupt("op stream is larger than the output"));
    }

    let (ops, read): (Vec<Op>, usize) =
        bincode::serde::decode_from_slice(&op_bytes, bincode::config::standard())
            .map_err(|e| PatchError::corrupt(format!("bad op stream: {e}")))?;
    if read != op_bytes.len() {
        return Err(PatchError::corrupt("trailing bytes after op stream"));
    }
    Ok(ops)
}

/// Most bytes the op stream of a patch with a `new_len` output may inflate to.
fn ops_limit(new_len: u64) -> u64 {
    new_len
        .saturating_mul(MAX_OPS_OVERHEAD)
        .saturating_add(1 << 16)
        .min(MAX_OPS_BYTES)
}
