//! Reading and writing the `KILN` block container.
//!
//! ```text
//! header:  magic "KILN" | version u32 | block_count u32 | root_count u32 | roots i32*
//! record:  tag u16 | body_len u32 | body
//! body:    link_count u32 | (edge_kind u8, target i32)* | payload     (known tags)
//!          raw bytes                                                  (unknown tags)
//! ```
//!
//! All integers are little-endian and a target of `-1` is a null link.

use crate::arena::Arena;
use crate::block::{Block, BlockKind, EdgeKind, Link, Opaque, Payload};
use crate::codes;
use crate::error::{GraphError, ParseError, StructuralError};
use crate::graph::Graph;
use crate::ids::BlockId;
use crate::payload::{decode_payload, encode_payload};
use crate::wire::{ByteReader, ByteWriter};
use kiln_common::{InternalError, KilnResult};
use kiln_diagnostics::{Diagnostic, Location};
use std::collections::HashMap;

/// File magic.
pub const MAGIC: [u8; 4] = *b"KILN";
/// The only container version this build reads and writes.
pub const FORMAT_VERSION: u32 = 1;

const EDGE_OWNING: u8 = 0;
const EDGE_REFERENCING: u8 = 1;
const NULL_TARGET: i32 = -1;

/// A successfully loaded graph together with the recoverable problems found
/// while loading it.
#[derive(Debug)]
pub struct LoadedGraph {
    /// The graph.
    pub graph: Graph,
    /// Structural diagnostics: nulled links and dropped roots.
    pub diagnostics: Vec<Diagnostic>,
}

struct RawRecord<'a> {
    kind: BlockKind,
    tag: u16,
    links: Vec<(u8, i32)>,
    payload: &'a [u8],
}

/// Decodes a container.
///
/// Out-of-range and self-referencing links are nulled and reported; a
/// self-owning link or an owning cycle fails the whole file.
pub fn load(bytes: &[u8]) -> Result<LoadedGraph, GraphError> {
    let mut r = ByteReader::new(bytes);
    let magic: [u8; 4] = r.take(4)?.try_into().map_err(|_| ParseError::UnexpectedEof {
        offset: 0,
        needed: 4,
    })?;
    if magic != MAGIC {
        return Err(ParseError::BadMagic { found: magic }.into());
    }
    let version = r.u32()?;
    if version != FORMAT_VERSION {
        return Err(ParseError::UnsupportedVersion(version).into());
    }
    let block_count = r.count("block", 6)?;
    let root_count = r.count("root", 4)?;
    let raw_roots = (0..root_count).map(|_| r.i32()).collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::with_capacity(block_count);
    for index in 0..block_count {
        let tag = r.u16()?;
        let len = r.u32()? as usize;
        let body = r.take(len)?;
        records.push(read_record(tag, body).map_err(|e| ParseError::InBlock {
            block: index as u32,
            source: Box::new(e),
        })?);
    }
    if r.remaining() > 0 {
        return Err(ParseError::TrailingBytes(r.remaining()).into());
    }

    let mut diagnostics = Vec::new();
    let mut blocks = Arena::with_capacity(block_count);
    for (index, record) in records.into_iter().enumerate() {
        let id = BlockId::from_raw(index as u32);
        let mut links = Vec::with_capacity(record.links.len());
        for (edge, target) in record.links {
            let kind = if edge == EDGE_OWNING {
                EdgeKind::Owning
            } else {
                EdgeKind::Referencing
            };
            links.push(Link {
                kind,
                target: resolve_target(id, kind, target, block_count, &mut diagnostics)?,
            });
        }
        let (payload, raw) = match record.kind {
            BlockKind::Opaque => (
                Payload::Opaque(Opaque {
                    tag: record.tag,
                    bytes: record.payload.to_vec(),
                }),
                None,
            ),
            kind => {
                let payload = decode_payload(kind, record.payload).map_err(|e| ParseError::InBlock {
                    block: index as u32,
                    source: Box::new(e),
                })?;
                (payload, Some(record.payload.to_vec()))
            }
        };
        blocks.alloc(Block::new(payload, links, raw));
    }

    let mut roots = Vec::with_capacity(raw_roots.len());
    for raw in raw_roots {
        if raw == NULL_TARGET {
            continue;
        }
        if raw < 0 || raw as usize >= block_count {
            let err = StructuralError::InvalidRoot(raw);
            log::warn!("{err}");
            diagnostics.push(Diagnostic::warning(codes::INVALID_ROOT, err.to_string(), Location::NONE));
            continue;
        }
        let id = BlockId::from_raw(raw as u32);
        if !roots.contains(&id) {
            roots.push(id);
        }
    }

    check_acyclic(&blocks)?;
    log::debug!(
        "loaded {block_count} blocks, {} roots, {} diagnostics",
        roots.len(),
        diagnostics.len()
    );
    Ok(LoadedGraph {
        graph: Graph::from_parts(blocks, roots),
        diagnostics,
    })
}

fn read_record(tag: u16, body: &[u8]) -> Result<RawRecord<'_>, ParseError> {
    let kind = BlockKind::from_tag(tag);
    if kind == BlockKind::Opaque {
        return Ok(RawRecord {
            kind,
            tag,
            links: Vec::new(),
            payload: body,
        });
    }
    let mut r = ByteReader::new(body);
    let n = r.count("link", 5)?;
    let mut links = Vec::with_capacity(n);
    for _ in 0..n {
        let offset = r.offset();
        let edge = r.u8()?;
        if edge != EDGE_OWNING && edge != EDGE_REFERENCING {
            return Err(ParseError::InvalidValue {
                what: "edge kind",
                value: i64::from(edge),
                offset,
            });
        }
        links.push((edge, r.i32()?));
    }
    Ok(RawRecord {
        kind,
        tag,
        links,
        payload: r.rest(),
    })
}

fn resolve_target(
    id: BlockId,
    kind: EdgeKind,
    target: i32,
    count: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<BlockId>, GraphError> {
    if target == NULL_TARGET {
        return Ok(None);
    }
    let location = Location::block(id.as_raw());
    if target < 0 || target as usize >= count {
        let err = StructuralError::OutOfRange {
            block: id,
            target,
            count: count as u32,
        };
        log::warn!("{err}");
        diagnostics.push(Diagnostic::warning(codes::LINK_OUT_OF_RANGE, err.to_string(), location));
        return Ok(None);
    }
    let target = BlockId::from_raw(target as u32);
    if target == id {
        if kind == EdgeKind::Owning {
            return Err(StructuralError::SelfOwnership(id).into());
        }
        let err = StructuralError::SelfReference(id);
        log::warn!("{err}");
        diagnostics.push(Diagnostic::warning(codes::SELF_REFERENCE, err.to_string(), location));
        return Ok(None);
    }
    Ok(Some(target))
}

/// Rejects owning cycles with a three-color depth-first search.
fn check_acyclic(blocks: &Arena<Block>) -> Result<(), StructuralError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Grey,
        Black,
    }
    let owned = |id: BlockId| -> Vec<BlockId> {
        blocks[id]
            .links
            .iter()
            .filter(|l| l.kind == EdgeKind::Owning)
            .filter_map(|l| l.target)
            .collect()
    };
    let mut color = vec![Color::White; blocks.len()];
    for (start, _) in blocks.iter() {
        if color[start.index()] != Color::White {
            continue;
        }
        let mut stack: Vec<(BlockId, Vec<BlockId>, usize)> = vec![(start, owned(start), 0)];
        color[start.index()] = Color::Grey;
        while let Some((id, children, next)) = stack.last_mut() {
            if let Some(&child) = children.get(*next) {
                *next += 1;
                match color[child.index()] {
                    Color::White => {
                        color[child.index()] = Color::Grey;
                        let grandchildren = owned(child);
                        stack.push((child, grandchildren, 0));
                    }
                    Color::Grey => {
                        let from = stack.iter().position(|(b, _, _)| *b == child).unwrap_or(0);
                        let mut cycle: Vec<BlockId> = stack[from..].iter().map(|(b, _, _)| *b).collect();
                        cycle.push(child);
                        return Err(StructuralError::OwnershipCycle { blocks: cycle });
                    }
                    Color::Black => {}
                }
            } else {
                color[id.index()] = Color::Black;
                stack.pop();
            }
        }
    }
    Ok(())
}

/// Encodes a graph.
///
/// Blocks are written in [`Graph::write_order`]. Untouched blocks reuse
/// their original payload bytes; the link table is always rebuilt because
/// indices may have moved.
pub fn serialize(graph: &Graph) -> KilnResult<Vec<u8>> {
    let order = graph.write_order()?;
    let position: HashMap<BlockId, i32> = order
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i as i32))
        .collect();
    let index_of = |target: Option<BlockId>| -> i32 {
        target
            .and_then(|t| position.get(&t).copied())
            .unwrap_or(NULL_TARGET)
    };

    let mut w = ByteWriter::new();
    w.raw(&MAGIC);
    w.u32(FORMAT_VERSION);
    w.count(order.len());
    w.count(graph.roots().len());
    for &root in graph.roots() {
        w.i32(index_of(Some(root)));
    }

    for &id in &order {
        let block = graph
            .block(id)
            .ok_or_else(|| InternalError::new(format!("write order names dead block {id}")))?;
        let (tag, body) = match block.payload() {
            Payload::Opaque(opaque) => (opaque.tag, opaque.bytes.clone()),
            payload => {
                let tag = payload
                    .kind()
                    .tag()
                    .ok_or_else(|| InternalError::new(format!("block {id} has no tag")))?;
                let mut body = ByteWriter::new();
                body.count(block.links().len());
                for link in block.links() {
                    body.u8(match link.kind {
                        EdgeKind::Owning => EDGE_OWNING,
                        EdgeKind::Referencing => EDGE_REFERENCING,
                    });
                    body.i32(index_of(link.target));
                }
                match &block.raw {
                    Some(raw) => body.raw(raw),
                    None => body.raw(&encode_payload(payload)),
                }
                (tag, body.into_inner())
            }
        };
        w.u16(tag);
        w.count(body.len());
        w.raw(&body);
    }
    Ok(w.into_inner())
}
