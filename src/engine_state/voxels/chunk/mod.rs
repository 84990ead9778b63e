//! # Chunk Module
//!
//! This module provides the `Chunk` struct: every tuple whose blocks fall in
//! one grid column, for one block category, together with the time-to-live
//! counter that keeps the column resident after it leaves the visible set.
//!
//! ## Storage
//!
//! Tuples are kept in a vector sorted by their composite key (texture, then
//! face mask). Because textures sort first, all tuples of one texture are
//! contiguous, so locating a block from its position and texture costs one
//! partition search plus at most 64 binary searches over position-sorted
//! members.
//!
//! ## Face Culling Cascade
//!
//! Placing or removing a block only changes the neighbor bits of the six
//! blocks directly adjacent to it. `add_block` and `remove_block` therefore
//! refresh the block itself and those six neighbors, and nothing beyond.
//! Neighbors that live in another column are handed back to the caller in
//! `Cascade::foreign` so the owning chunk set can refresh them.
//!
//! ## Lifecycle
//!
//! `Unloaded -> Resident(unbuffered) -> Resident(buffered) -> Evicting -> Cached`,
//! with `Cached -> Resident(unbuffered)` on reload. The transitions are driven
//! by the visibility scheduler through `ChunkSet`.

use crate::engine_state::rendering::{RenderBackend, TemplateHandle};

use super::adjacency::AdjacencyIndex;
use super::block::{texture::TextureName, Block, BlockKind, BlockPos, FaceMask};
use super::tuple::{Tuple, TupleKey};

pub mod chunk_grid;

use chunk_grid::{chunk_func, ChunkId};

/// Observable residency state of a chunk id within one category.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkState {
    /// No block was ever placed in this column
    Unloaded,
    /// In memory; `buffered` once every tuple template is uploaded
    Resident {
        /// Whether all templates are on the GPU
        buffered: bool,
    },
    /// Paged out to a cache file
    Cached,
}

/// Blocks touched by an add or remove cascade.
#[derive(Debug, Default)]
pub struct Cascade {
    /// Whether the chunk was modified at all
    pub applied: bool,
    /// Neighbor positions whose mask changed but which belong to another
    /// chunk column
    pub foreign: Vec<BlockPos>,
}

/// All blocks of one category inside one grid column.
#[derive(Debug)]
pub struct Chunk {
    id: ChunkId,
    kind: BlockKind,
    tuples: Vec<Tuple>,
    time_to_live: u32,
    released: Vec<TemplateHandle>,
}

impl Chunk {
    /// Creates an empty chunk that stays alive for `time_to_live` ticks.
    pub fn new(id: ChunkId, kind: BlockKind, time_to_live: u32) -> Self {
        Chunk {
            id,
            kind,
            tuples: Vec::new(),
            time_to_live,
            released: Vec::new(),
        }
    }

    /// The chunk's grid id.
    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// Category of every block in this chunk.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Remaining ticks before the chunk may be evicted.
    pub fn time_to_live(&self) -> u32 {
        self.time_to_live
    }

    /// A chunk is alive while its time-to-live is positive.
    pub fn is_alive(&self) -> bool {
        self.time_to_live > 0
    }

    /// Resets the time-to-live.
    pub fn refresh(&mut self, time_to_live: u32) {
        self.time_to_live = time_to_live;
    }

    /// Decrements the time-to-live, saturating at zero.
    ///
    /// # Returns
    /// The remaining time-to-live.
    pub fn decay(&mut self) -> u32 {
        self.time_to_live = self.time_to_live.saturating_sub(1);
        self.time_to_live
    }

    /// The tuples, in key order.
    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    /// Number of blocks in the chunk.
    pub fn len(&self) -> usize {
        self.tuples.iter().map(Tuple::len).sum()
    }

    /// Whether the chunk holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Every block, grouped by tuple.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.tuples.iter().flat_map(|tuple| tuple.members().iter())
    }

    fn search_tuple(&self, key: TupleKey) -> Result<usize, usize> {
        self.tuples.binary_search_by(|tuple| tuple.key().cmp(&key))
    }

    /// The tuple for `key`, found by binary search.
    pub fn get_tuple(&self, key: TupleKey) -> Option<&Tuple> {
        self.search_tuple(key).ok().map(|slot| &self.tuples[slot])
    }

    /// Index of the tuple holding the block at `position` with `texture`.
    fn locate(&self, position: BlockPos, texture: TextureName) -> Option<usize> {
        let start = self.tuples.partition_point(|tuple| tuple.key().texture < texture);
        self.tuples[start..]
            .iter()
            .take_while(|tuple| tuple.key().texture == texture)
            .position(|tuple| tuple.contains(position))
            .map(|offset| start + offset)
    }

    /// The block at `position`, binary searching the members of each tuple
    /// in turn. Prefer [`Chunk::find_block`] when an index is at hand.
    pub fn get_block(&self, position: BlockPos) -> Option<&Block> {
        self.tuples.iter().find_map(|tuple| tuple.get(position))
    }

    /// The block at `position`, using the texture recorded in `index` to
    /// binary search only the tuples of that texture. Falls back to
    /// [`Chunk::get_block`] for blocks placed without updating the index.
    pub fn find_block(&self, position: BlockPos, index: &AdjacencyIndex) -> Option<&Block> {
        match index.get(position) {
            Some(entry) => self.locate(position, entry.texture).and_then(|slot| self.tuples[slot].get(position)),
            None => self.get_block(position),
        }
    }

    /// Inserts a block into the tuple matching its current key, creating the
    /// tuple if needed.
    fn insert(&mut self, block: Block) -> bool {
        let key = TupleKey::of(&block);
        let slot = match self.search_tuple(key) {
            Ok(slot) => slot,
            Err(slot) => {
                self.tuples.insert(slot, Tuple::new(key, self.kind));
                slot
            }
        };
        self.tuples[slot].insert(block)
    }

    /// Removes the block at `position` from tuple `slot`, dropping the tuple
    /// if it empties.
    fn take(&mut self, slot: usize, position: BlockPos) -> Option<Block> {
        let block = self.tuples[slot].remove(position)?;
        if self.tuples[slot].is_empty() {
            let mut emptied = self.tuples.remove(slot);
            self.released.extend(emptied.unbuffer());
        }
        Some(block)
    }

    /// Moves the block at `position` from the tuple keyed by `old_mask` to the
    /// tuple keyed by `new_mask`, creating the target and dropping an emptied
    /// source.
    ///
    /// # Returns
    /// `false` if no such block exists.
    pub fn transfer(&mut self, position: BlockPos, texture: TextureName, old_mask: FaceMask, new_mask: FaceMask) -> bool {
        if old_mask == new_mask {
            return self.get_tuple(TupleKey::new(texture, old_mask))
                .is_some_and(|tuple| tuple.contains(position));
        }
        let Ok(slot) = self.search_tuple(TupleKey::new(texture, old_mask)) else {
            return false;
        };
        let Some(mut block) = self.take(slot, position) else {
            return false;
        };
        block.face_mask = new_mask;
        self.insert(block)
    }

    /// Recomputes the mask of the block at `position` from the index and
    /// transfers it if the mask changed.
    ///
    /// # Returns
    /// `true` if the block moved to another tuple.
    pub fn refresh_block(&mut self, position: BlockPos, index: &AdjacencyIndex) -> bool {
        let Some(entry) = index.get(position) else {
            return false;
        };
        let Some(slot) = self.locate(position, entry.texture) else {
            return false;
        };
        let old_mask = self.tuples[slot].key().mask;
        let new_mask = entry.face_mask();
        old_mask != new_mask && self.transfer(position, entry.texture, old_mask, new_mask)
    }

    /// Refreshes the six neighbors of `position` that are recorded in the
    /// index, collecting the ones owned by other chunks.
    fn cascade_neighbors(&mut self, position: BlockPos, neighbor_bits: u8, index: &AdjacencyIndex, cascade: &mut Cascade) {
        for (side, neighbor) in position.neighbors() {
            if neighbor_bits & side.bit() == 0 {
                continue;
            }
            if chunk_func(neighbor.to_point()) == self.id {
                self.refresh_block(neighbor, index);
            } else {
                cascade.foreign.push(neighbor);
            }
        }
    }

    /// Adds a block to the tuple matching its current key.
    ///
    /// With `update_index`, the block is recorded in the index and the face
    /// culling cascade runs: the block's own mask is recomputed, then each of
    /// its recorded neighbors.
    ///
    /// # Returns
    /// A [`Cascade`] whose `applied` flag is `false` if a block already
    /// occupies the position.
    pub fn add_block(&mut self, block: Block, update_index: bool, index: &mut AdjacencyIndex) -> Cascade {
        let mut cascade = Cascade::default();
        if self.get_block(block.position).is_some() || !self.insert(block) {
            return cascade;
        }
        cascade.applied = true;

        if update_index {
            let neighbor_bits = index.put(&block);
            self.refresh_block(block.position, index);
            self.cascade_neighbors(block.position, neighbor_bits, index, &mut cascade);
        }
        cascade
    }

    /// Removes the block at `block.position`.
    ///
    /// With `update_index`, the index entry is deleted and every former
    /// neighbor is refreshed.
    pub fn remove_block(&mut self, block: &Block, update_index: bool, index: &mut AdjacencyIndex) -> Cascade {
        let mut cascade = Cascade::default();
        let slot = self
            .locate(block.position, block.texture())
            .or_else(|| self.tuples.iter().position(|tuple| tuple.contains(block.position)));
        let Some(slot) = slot else {
            return cascade;
        };
        if self.take(slot, block.position).is_none() {
            return cascade;
        }
        cascade.applied = true;

        if update_index {
            if let Some(entry) = index.remove(block.position) {
                self.cascade_neighbors(block.position, entry.neighbors, index, &mut cascade);
            }
        }
        cascade
    }

    /// Whether every tuple template is uploaded.
    pub fn is_buffered(&self) -> bool {
        self.tuples.iter().all(Tuple::is_buffered)
    }

    /// Uploads every unbuffered tuple template. Render thread only.
    pub fn buffer(&mut self, backend: &mut dyn RenderBackend) {
        for tuple in &mut self.tuples {
            tuple.buffer(backend);
        }
    }

    /// Detaches every template handle, queuing it for release.
    pub fn unbuffer(&mut self) {
        let handles = self.tuples.iter_mut().filter_map(Tuple::unbuffer);
        self.released.extend(handles);
    }

    /// Hands over template handles waiting to be released.
    pub fn drain_released(&mut self) -> Vec<TemplateHandle> {
        std::mem::take(&mut self.released)
    }

    /// Draws every tuple, skipping members rejected by `predicate`.
    ///
    /// # Returns
    /// Number of draw calls issued.
    pub fn render_if(&self, backend: &mut dyn RenderBackend, predicate: &dyn Fn(&Block) -> bool) -> usize {
        self.tuples.iter().map(|tuple| tuple.render_if(backend, predicate)).sum()
    }

    /// Updates the winding of every tuple for the camera's in-fluid state.
    pub fn prepare(&mut self, backend: &mut dyn RenderBackend, camera_in_fluid: bool) {
        for tuple in &mut self.tuples {
            tuple.prepare(backend, camera_in_fluid);
        }
    }

    /// Advances the fluid animation of every tuple.
    pub fn animate(&mut self, backend: &mut dyn RenderBackend) {
        for tuple in &mut self.tuples {
            tuple.animate(backend);
        }
    }
}
