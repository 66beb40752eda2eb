//! Applying patches.

use kiln_common::ContentHash;

use crate::error::PatchError;
use crate::format::{decode_header, decode_ops, Op};

/// The recorded output length is untrusted until the result checksum passes.
const PREALLOC_LIMIT: usize = 64 << 20;

/// Reconstructs the new blob from `old` and a patch made by [`crate::diff`].
///
/// Fails with [`PatchError::SourceMismatch`] if `old` is not the blob the
/// patch was made against, [`PatchError::Corrupt`] if the patch cannot be
/// decoded or copies from outside `old`, and [`PatchError::ResultMismatch`]
/// if the output does not hash to the recorded checksum.
pub fn apply(old: &[u8], patch: &[u8]) -> Result<Vec<u8>, PatchError> {
    let (header, compressed) = decode_header(patch)?;

    let actual = ContentHash::of(old);
    if header.old_len != old.len() as u64 || header.old_checksum != actual {
        return Err(PatchError::SourceMismatch {
            expected_len: header.old_len,
            expected: header.old_checksum,
            actual_len: old.len() as u64,
            actual,
        });
    }

    let ops = decode_ops(&header, compressed)?;

    let new_len = usize::try_from(header.new_len)
        .map_err(|_| PatchError::corrupt(format!("output length {} is too large", header.new_len)))?;
    let mut out = Vec::with_capacity(new_len.min(PREALLOC_LIMIT));
    for (n, op) in ops.iter().enumerate() {
        if out.len() as u64 + op.output_len() > header.new_len {
            return Err(PatchError::corrupt(format!(
                "op {n} writes past the recorded output length {}",
                header.new_len
            )));
        }
        match op {
            Op::Copy { offset, len } => {
                let range = offset
                    .checked_add(*len)
                    .filter(|&end| end <= old.len() as u64)
                    .map(|end| *offset as usize..end as usize)
                    .ok_or_else(|| {
                        PatchError::corrupt(format!(
                            "op {n} copies {len} bytes at {offset}, past the {} byte input",
                            old.len()
                        ))
                    })?;
                out.extend_from_slice(&old[range]);
            }
            Op::Insert(bytes) => out.extend_from_slice(bytes),
        }
    }

    let produced = ContentHash::of(&out);
    if out.len() != new_len || produced != header.new_checksum {
        return Err(PatchError::ResultMismatch {
            expected: header.new_checksum,
            actual: produced,
        });
    }
    log::debug!(
        "applied {} op(s): {} -> {}",
        ops.len(),
        header.old_checksum.short(),
        produced.short()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;
    use crate::format::{encode, PatchHeader};

    #[test]
    fn applies_its_own_diff() {
        let old = b"the quick brown fox jumps over the lazy dog, twice over".repeat(4);
        let mut new = old.clone();
        new[10] = b'X';
        new.extend_from_slice(b" and once more");
        let patch = diff(&old, &new).unwrap();
        assert_eq!(apply(&old, &patch).unwrap(), new);
    }

    #[test]
    fn wrong_source_is_rejected() {
        let patch = diff(b"version one", b"version two").unwrap();
        let err = apply(b"version 1", &patch).unwrap_err();
        assert!(matches!(err, PatchError::SourceMismatch { .. }));
    }

    #[test]
    fn source_is_checked_before_the_op_stream() {
        let old = b"version one";
        let mut header = PatchHeader::describe(old, b"version two");
        header.new_len = u64::MAX;
        let mut patch = encode(&header, &[]).unwrap();
        let (_, ops) = decode_header(&patch).unwrap();
        let ops_at = patch.len() - ops.len();
        patch.truncate(ops_at);
        patch.extend_from_slice(b"not zlib at all");

        let err = apply(b"version 1", &patch).unwrap_err();
        assert!(matches!(err, PatchError::SourceMismatch { .. }), "{err}");
        let err = apply(old, &patch).unwrap_err();
        assert!(matches!(err, PatchError::Corrupt { .. }), "{err}");
    }

    #[test]
    fn out_of_bounds_copy_is_corrupt() {
        let old = b"0123456789";
        let new = b"0123456789";
        let header = PatchHeader::describe(old, new);
        let patch = encode(&header, &[Op::Copy { offset: 5, len: 10 }]).unwrap();
        let err = apply(old, &patch).unwrap_err();
        assert!(matches!(err, PatchError::Corrupt { .. }), "{err}");

        let overflow = encode(
            &PatchHeader::describe(old, b""),
            &[Op::Copy {
                offset: u64::MAX,
                len: 0,
            }],
        )
        .unwrap();
        assert!(matches!(apply(old, &overflow), Err(PatchError::Corrupt { .. })));
    }

    #[test]
    fn wrong_result_is_detected() {
        let old = b"abcdef";
        let header = PatchHeader::describe(old, b"abcxyz");
        let patch = encode(&header, &[Op::Copy { offset: 0, len: 6 }]).unwrap();
        let err = apply(old, &patch).unwrap_err();
        assert!(matches!(err, PatchError::ResultMismatch { .. }));
    }

    #[test]
    fn short_result_is_detected() {
        let old = b"abcdef";
        let header = PatchHeader::describe(old, b"abcdef");
        let patch = encode(&header, &[Op::Copy { offset: 0, len: 3 }]).unwrap();
        assert!(matches!(
            apply(old, &patch),
            Err(PatchError::ResultMismatch { .. })
        ));
    }

    #[test]
    fn overlong_ops_are_corrupt() {
        let old = b"abc";
        let header = PatchHeader::describe(old, b"abc");
        let patch = encode(&header, &[Op::Insert(b"abcdef".to_vec())]).unwrap();
        assert!(matches!(apply(old, &patch), Err(PatchError::Corrupt { .. })));
    }
}
