//! Computing patches.
//!
//! The old blob is indexed by a rolling checksum of each aligned
//! [`BLOCK_SIZE`]-byte block. A window of the same size slides over the new
//! blob; wherever its checksum hits the index and the bytes really match,
//! the match is extended forwards as far as it goes and emitted as a copy.
//! Bytes between matches become literal inserts.

use std::collections::HashMap;

use crate::error::PatchError;
use crate::format::{encode, Op, PatchHeader};

/// Size of the blocks the old blob is indexed by.
pub const BLOCK_SIZE: usize = 32;

/// Candidates kept per checksum; repetitive inputs would otherwise make
/// every lookup scan the whole blob.
const MAX_CANDIDATES: usize = 8;

/// Weak rolling checksum over a fixed window.
struct Rolling {
    a: u32,
    b: u32,
    window: u32,
}

impl Rolling {
    fn new(window: &[u8]) -> Self {
        let len = window.len() as u32;
        let mut a = 0u32;
        let mut b = 0u32;
        for (i, &byte) in window.iter().enumerate() {
            a = a.wrapping_add(byte as u32);
            b = b.wrapping_add((len - i as u32).wrapping_mul(byte as u32));
        }
        Self { a, b, window: len }
    }

    fn roll(&mut self, out: u8, input: u8) {
        self.a = self.a.wrapping_sub(out as u32).wrapping_add(input as u32);
        self.b = self
            .b
            .wrapping_sub(self.window.wrapping_mul(out as u32))
            .wrapping_add(self.a);
    }

    fn digest(&self) -> u32 {
        (self.a & 0xffff) | (self.b << 16)
    }
}

fn index_blocks(old: &[u8]) -> HashMap<u32, Vec<usize>> {
    let mut index: HashMap<u32, Vec<usize>> = HashMap::new();
    for (n, block) in old.chunks_exact(BLOCK_SIZE).enumerate() {
        let slot = index.entry(Rolling::new(block).digest()).or_default();
        if slot.len() < MAX_CANDIDATES {
            slot.push(n * BLOCK_SIZE);
        }
    }
    index
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Appends an op, merging it into the previous one where they are contiguous.
fn push_op(ops: &mut Vec<Op>, op: Op) {
    match (ops.last_mut(), op) {
        (Some(Op::Copy { offset, len }), Op::Copy { offset: next, len: more })
            if *offset + *len == next =>
        {
            *len += more;
        }
        (Some(Op::Insert(bytes)), Op::Insert(more)) => bytes.extend_from_slice(&more),
        (_, op) => ops.push(op),
    }
}

/// Computes the op stream that turns `old` into `new`.
pub fn diff_ops(old: &[u8], new: &[u8]) -> Vec<Op> {
    if old == new {
        return if new.is_empty() {
            Vec::new()
        } else {
            vec![Op::Copy {
                offset: 0,
                len: new.len() as u64,
            }]
        };
    }

    let mut ops = Vec::new();
    if old.len() < BLOCK_SIZE || new.len() < BLOCK_SIZE {
        if !new.is_empty() {
            ops.push(Op::Insert(new.to_vec()));
        }
        return ops;
    }

    let index = index_blocks(old);
    let mut literal_start = 0;
    let mut pos = 0;
    let mut rolling = Rolling::new(&new[..BLOCK_SIZE]);

    while pos + BLOCK_SIZE <= new.len() {
        let window = &new[pos..pos + BLOCK_SIZE];
        let best = index
            .get(&rolling.digest())
            .into_iter()
            .flatten()
            .filter(|&&offset| &old[offset..offset + BLOCK_SIZE] == window)
            .map(|&offset| (offset, common_prefix(&old[offset..], &new[pos..])))
            .max_by_key(|&(offset, len)| (len, std::cmp::Reverse(offset)));

        if let Some((offset, len)) = best {
            if literal_start < pos {
                push_op(&mut ops, Op::Insert(new[literal_start..pos].to_vec()));
            }
            push_op(
                &mut ops,
                Op::Copy {
                    offset: offset as u64,
                    len: len as u64,
                },
            );
            pos += len;
            literal_start = pos;
            if pos + BLOCK_SIZE <= new.len() {
                rolling = Rolling::new(&new[pos..pos + BLOCK_SIZE]);
            }
        } else {
            if pos + BLOCK_SIZE < new.len() {
                rolling.roll(new[pos], new[pos + BLOCK_SIZE]);
            }
            pos += 1;
        }
    }

    if literal_start < new.len() {
        push_op(&mut ops, Op::Insert(new[literal_start..].to_vec()));
    }
    ops
}

/// Computes a patch that turns `old` into `new`.
pub fn diff(old: &[u8], new: &[u8]) -> Result<Vec<u8>, PatchError> {
    let ops = diff_ops(old, new);
    let copied: u64 = ops
        .iter()
        .filter(|op| matches!(op, Op::Copy { .. }))
        .map(Op::output_len)
        .sum();
    log::debug!(
        "diff: {} -> {} bytes, {} ops, {copied} bytes copied",
        old.len(),
        new.len(),
        ops.len()
    );
    encode(&PatchHeader::describe(old, new), &ops)
}
