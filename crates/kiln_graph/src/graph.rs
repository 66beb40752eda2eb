//! The in-memory block graph and its mutation operations.

use crate::arena::Arena;
use crate::block::{Block, BlockKind, EdgeKind, Link, Payload};
use crate::error::{GraphError, StructuralError};
use crate::ids::BlockId;
use kiln_common::{InternalError, KilnResult};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::OnceLock;

/// Which outgoing edges [`Graph::children`] follows.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EdgeFilter {
    /// Only owning edges.
    Owning,
    /// Only referencing edges.
    Referencing,
    /// Every edge.
    Any,
}

impl EdgeFilter {
    /// Returns `true` if an edge of `kind` passes this filter.
    pub fn accepts(self, kind: EdgeKind) -> bool {
        match self {
            EdgeFilter::Owning => kind == EdgeKind::Owning,
            EdgeFilter::Referencing => kind == EdgeKind::Referencing,
            EdgeFilter::Any => true,
        }
    }
}

type ParentIndex = Vec<Vec<(BlockId, EdgeKind)>>;

/// A loaded asset file: blocks, their edges, and the root list.
///
/// Deleted blocks stay in the arena as tombstones so that IDs remain stable;
/// every accessor treats them as absent.
#[derive(Debug, Default)]
pub struct Graph {
    blocks: Arena<Block>,
    roots: Vec<BlockId>,
    parents: OnceLock<ParentIndex>,
}

impl Clone for Graph {
    fn clone(&self) -> Self {
        Self {
            blocks: self.blocks.clone(),
            roots: self.roots.clone(),
            parents: OnceLock::new(),
        }
    }
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(blocks: Arena<Block>, roots: Vec<BlockId>) -> Self {
        Self {
            blocks,
            roots,
            parents: OnceLock::new(),
        }
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.blocks.iter().filter(|(_, b)| b.live).count()
    }

    /// Returns `true` if the graph has no live blocks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Root blocks in header order.
    pub fn roots(&self) -> &[BlockId] {
        &self.roots
    }

    /// Appends a root. Adding an existing root is a no-op.
    pub fn add_root(&mut self, id: BlockId) -> Result<(), GraphError> {
        self.live_block(id)?;
        if !self.roots.contains(&id) {
            self.roots.push(id);
        }
        Ok(())
    }

    /// Removes `id` from the root list without deleting it.
    pub fn remove_root(&mut self, id: BlockId) -> bool {
        let before = self.roots.len();
        self.roots.retain(|&r| r != id);
        before != self.roots.len()
    }

    /// Returns `true` if `id` names a block that has not been deleted.
    pub fn is_live(&self, id: BlockId) -> bool {
        self.blocks.get(id).is_some_and(|b| b.live)
    }

    /// Returns a live block.
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id).filter(|b| b.live)
    }

    /// Returns the kind of a live block.
    pub fn kind(&self, id: BlockId) -> Option<BlockKind> {
        self.block(id).map(Block::kind)
    }

    /// Returns the payload of a live block.
    pub fn payload(&self, id: BlockId) -> Option<&Payload> {
        self.block(id).map(Block::payload)
    }

    /// Iterates live blocks in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter().filter(|(_, b)| b.live)
    }

    /// Targets of `id`'s outgoing edges that pass `filter`, in link order.
    /// Null links are skipped.
    pub fn children(&self, id: BlockId, filter: EdgeFilter) -> Vec<BlockId> {
        self.block(id)
            .map(|b| {
                b.links
                    .iter()
                    .filter(|l| filter.accepts(l.kind))
                    .filter_map(|l| l.target)
                    .filter(|&t| self.is_live(t))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Blocks with an edge of any kind to `id`, ascending and deduplicated.
    pub fn parents(&self, id: BlockId) -> Vec<BlockId> {
        let mut out: Vec<BlockId> = self.parent_edges(id).into_iter().map(|(p, _)| p).collect();
        out.dedup();
        out
    }

    /// Incoming edges of `id` as `(source, kind)`, ascending by source.
    pub fn parent_edges(&self, id: BlockId) -> Vec<(BlockId, EdgeKind)> {
        self.parent_index()
            .get(id.index())
            .map(|edges| {
                edges
                    .iter()
                    .copied()
                    .filter(|(p, _)| self.is_live(*p))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Blocks owning `id`, ascending.
    pub fn owners(&self, id: BlockId) -> Vec<BlockId> {
        let mut out: Vec<BlockId> = self
            .parent_edges(id)
            .into_iter()
            .filter(|(_, k)| *k == EdgeKind::Owning)
            .map(|(p, _)| p)
            .collect();
        out.dedup();
        out
    }

    fn parent_index(&self) -> &ParentIndex {
        self.parents.get_or_init(|| {
            let mut index: ParentIndex = vec![Vec::new(); self.blocks.len()];
            for (id, block) in self.iter() {
                for link in &block.links {
                    if let Some(t) = link.target {
                        index[t.index()].push((id, link.kind));
                    }
                }
            }
            index
        })
    }

    fn invalidate(&mut self) {
        self.parents = OnceLock::new();
    }

    fn live_block(&self, id: BlockId) -> Result<&Block, GraphError> {
        self.block(id).ok_or(GraphError::UnknownBlock(id))
    }

    fn live_block_mut(&mut self, id: BlockId) -> Result<&mut Block, GraphError> {
        self.blocks
            .get_mut(id)
            .filter(|b| b.live)
            .ok_or(GraphError::UnknownBlock(id))
    }

    /// Swaps the payload of `id` and returns the previous one. The block is
    /// re-encoded on the next [`serialize`](crate::serialize).
    pub fn replace(&mut self, id: BlockId, payload: Payload) -> Result<Payload, GraphError> {
        let block = self.live_block_mut(id)?;
        block.raw = None;
        Ok(std::mem::replace(&mut block.payload, payload))
    }

    /// Mutable access to a payload; marks the block dirty.
    pub fn payload_mut(&mut self, id: BlockId) -> Option<&mut Payload> {
        let block = self.live_block_mut(id).ok()?;
        block.raw = None;
        Some(&mut block.payload)
    }

    /// Outgoing links of a live block, including null links.
    pub fn links(&self, id: BlockId) -> &[Link] {
        self.block(id).map(Block::links).unwrap_or(&[])
    }

    /// Adds a new block. Link targets must be live.
    pub fn add_block(&mut self, payload: Payload, links: Vec<Link>) -> Result<BlockId, GraphError> {
        for target in links.iter().filter_map(|l| l.target) {
            self.live_block(target)?;
        }
        let id = self.blocks.alloc(Block::new(payload, links, None));
        self.invalidate();
        Ok(id)
    }

    /// Appends a link to `from`. Owning links that would close a cycle are
    /// rejected.
    pub fn add_link(&mut self, from: BlockId, link: Link) -> Result<(), GraphError> {
        self.live_block(from)?;
        if let Some(target) = link.target {
            self.live_block(target)?;
            if link.kind == EdgeKind::Owning {
                if target == from {
                    return Err(StructuralError::SelfOwnership(from).into());
                }
                if let Some(mut path) = self.owning_path(target, from) {
                    path.insert(0, from);
                    return Err(StructuralError::OwnershipCycle { blocks: path }.into());
                }
            }
        }
        self.live_block_mut(from)?.links.push(link);
        self.invalidate();
        Ok(())
    }

    /// Removes the link at `index` from `from` and returns it.
    pub fn remove_link(&mut self, from: BlockId, index: usize) -> Result<Link, GraphError> {
        let block = self.live_block_mut(from)?;
        if index >= block.links.len() {
            return Err(GraphError::UnknownBlock(from));
        }
        let link = block.links.remove(index);
        self.invalidate();
        Ok(link)
    }

    /// Owning path from `start` to `goal`, if `goal` is reachable.
    fn owning_path(&self, start: BlockId, goal: BlockId) -> Option<Vec<BlockId>> {
        let mut stack = vec![(start, vec![start])];
        let mut seen = HashSet::new();
        while let Some((id, path)) = stack.pop() {
            if id == goal {
                return Some(path);
            }
            if !seen.insert(id) {
                continue;
            }
            for child in self.children(id, EdgeFilter::Owning) {
                let mut next = path.clone();
                next.push(child);
                stack.push((child, next));
            }
        }
        None
    }

    /// Deletes `id` and every block that loses its last owner as a result.
    ///
    /// Incoming links to deleted blocks become null and deleted blocks leave
    /// the root list. Blocks that are still roots are never cascaded into.
    /// Returns the deleted blocks in deletion order.
    pub fn delete(&mut self, id: BlockId) -> Result<Vec<BlockId>, GraphError> {
        self.live_block(id)?;
        let incoming = self.parent_index().clone();
        let mut deleted = Vec::new();
        let mut queue = vec![id];
        while let Some(current) = queue.pop() {
            if !self.is_live(current) {
                continue;
            }
            let owned: Vec<BlockId> = self.children(current, EdgeFilter::Owning);
            let block = &mut self.blocks[current];
            block.live = false;
            block.links.clear();
            self.roots.retain(|&r| r != current);
            for &(source, _) in &incoming[current.index()] {
                if let Some(src) = self.blocks.get_mut(source) {
                    for link in src.links.iter_mut().filter(|l| l.target == Some(current)) {
                        link.target = None;
                    }
                }
            }
            deleted.push(current);
            for child in owned {
                let still_owned = incoming[child.index()].iter().any(|&(src, kind)| {
                    kind == EdgeKind::Owning
                        && self.is_live(src)
                        && self.blocks[src]
                            .links
                            .iter()
                            .any(|l| l.kind == EdgeKind::Owning && l.target == Some(child))
                });
                if !still_owned && !self.roots.contains(&child) {
                    queue.push(child);
                }
            }
        }
        self.invalidate();
        log::debug!("deleted {} block(s) starting at {id}", deleted.len());
        Ok(deleted)
    }

    /// Live blocks in write order: owners before owned children, ties broken
    /// by ascending ID. A graph whose ID order already satisfies this comes
    /// back in ID order.
    pub fn write_order(&self) -> KilnResult<Vec<BlockId>> {
        let mut in_degree = vec![0usize; self.blocks.len()];
        for (_, block) in self.iter() {
            for t in block.links.iter().filter(|l| l.kind == EdgeKind::Owning).filter_map(|l| l.target) {
                if self.is_live(t) {
                    in_degree[t.index()] += 1;
                }
            }
        }
        let mut ready: BinaryHeap<Reverse<BlockId>> = self
            .iter()
            .filter(|(id, _)| in_degree[id.index()] == 0)
            .map(|(id, _)| Reverse(id))
            .collect();
        let mut order = Vec::with_capacity(self.blocks.len());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            for link in self.blocks[id].links.iter().filter(|l| l.kind == EdgeKind::Owning) {
                if let Some(t) = link.target.filter(|&t| self.is_live(t)) {
                    in_degree[t.index()] -= 1;
                    if in_degree[t.index()] == 0 {
                        ready.push(Reverse(t));
                    }
                }
            }
        }
        if order.len() != self.len() {
            return Err(InternalError::new(format!(
                "owning edges are cyclic: ordered {} of {} blocks",
                order.len(),
                self.len()
            )));
        }
        Ok(order)
    }

    /// Human-readable path from a root down to `id` along first owners,
    /// e.g. `Node:Scene[0]/Geometry[3]`.
    pub fn path(&self, id: BlockId) -> String {
        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);
        while let Some(c) = current {
            if !seen.insert(c) {
                break;
            }
            let Some(block) = self.block(c) else { break };
            segments.push(match block.payload.name().filter(|n| !n.is_empty()) {
                Some(name) => format!("{}:{}[{}]", block.kind(), name, c.as_raw()),
                None => format!("{}[{}]", block.kind(), c.as_raw()),
            });
            current = self.owners(c).first().copied();
        }
        segments.reverse();
        segments.join("/")
    }
}
