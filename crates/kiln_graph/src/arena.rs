//! Block storage indexed by [`BlockId`].
//!
//! A loaded file's blocks are allocated in file order, so a block's ID is its
//! index in the file. Blocks added later get the next free index. Slots are
//! never reused or removed; the graph marks deleted blocks instead.

use std::ops::{Index, IndexMut};

use crate::ids::BlockId;

/// Dense storage addressed by [`BlockId`].
#[derive(Debug, Clone)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Arena<T> {
    /// An empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty arena sized for a file with `blocks` blocks.
    pub fn with_capacity(blocks: usize) -> Self {
        Self {
            items: Vec::with_capacity(blocks),
        }
    }

    /// The ID the next [`alloc`](Self::alloc) will return.
    pub fn next_id(&self) -> BlockId {
        BlockId::from_raw(self.items.len() as u32)
    }

    /// Stores `item` in the next slot.
    pub fn alloc(&mut self, item: T) -> BlockId {
        let id = self.next_id();
        self.items.push(item);
        id
    }

    /// The item at `id`, or `None` past the end.
    pub fn get(&self, id: BlockId) -> Option<&T> {
        self.items.get(id.index())
    }

    /// Mutable access to the item at `id`.
    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut T> {
        self.items.get_mut(id.index())
    }

    /// Number of slots, including any the graph considers deleted.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing was ever allocated.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Slots in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (BlockId::from_raw(i as u32), item))
    }
}

impl<T> Index<BlockId> for Arena<T> {
    type Output = T;

    fn index(&self, id: BlockId) -> &T {
        &self.items[id.index()]
    }
}

impl<T> IndexMut<BlockId> for Arena<T> {
    fn index_mut(&mut self, id: BlockId) -> &mut T {
        &mut self.items[id.index()]
    }
}
