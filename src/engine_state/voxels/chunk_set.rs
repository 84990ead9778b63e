//! # Chunk Set
//!
//! The resident chunks of one block category, sorted by id, together with the
//! disk cache their evicted siblings live in.
//!
//! ## Residency
//!
//! Once a block has been placed in a column, that column is either resident
//! here or present as a cache file, never both and never neither. Edits that
//! target a cached column reload it first.
//!
//! ## Counting
//!
//! `total_size` is a running counter covering resident and paged blocks.
//! `get_total_list` and `scan_total_size` walk every grid cell and read cache
//! files; they exist for debugging and tests and must stay off per-tick paths.

use std::path::Path;

use crate::engine_state::rendering::{RenderBackend, TemplateHandle};
use crate::engine_state::streaming::disk_cache::DiskCache;
use crate::error::CodecResult;

use super::adjacency::AdjacencyIndex;
use super::block::{Block, BlockKind, BlockPos, FaceMask};
use super::chunk::chunk_grid::{chunk_func, ChunkId};
use super::chunk::{Cascade, Chunk, ChunkState};

/// Id-sorted resident chunks of one category.
#[derive(Debug)]
pub struct ChunkSet {
    kind: BlockKind,
    chunks: Vec<Chunk>,
    cache: DiskCache,
    total: usize,
    max_blocks: usize,
    time_to_live: u32,
    released: Vec<TemplateHandle>,
}

impl ChunkSet {
    /// Creates an empty set whose evicted chunks go to `cache_dir`.
    ///
    /// # Arguments
    /// * `kind` - Category of every block in the set
    /// * `cache_dir` - Directory for cache files
    /// * `max_blocks` - Capacity, resident and paged blocks combined
    /// * `time_to_live` - Ticks a chunk survives outside the visible set
    pub fn new(kind: BlockKind, cache_dir: &Path, max_blocks: usize, time_to_live: u32) -> CodecResult<Self> {
        Ok(ChunkSet {
            kind,
            chunks: Vec::new(),
            cache: DiskCache::new(cache_dir, kind)?,
            total: 0,
            max_blocks,
            time_to_live,
            released: Vec::new(),
        })
    }

    /// Category of the set.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Time-to-live given to fresh and refreshed chunks.
    pub fn time_to_live(&self) -> u32 {
        self.time_to_live
    }

    /// Configured capacity.
    pub fn max_blocks(&self) -> usize {
        self.max_blocks
    }

    /// The resident chunks, ascending by id.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The cache backing this set.
    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    fn search(&self, id: ChunkId) -> Result<usize, usize> {
        self.chunks.binary_search_by_key(&id, Chunk::id)
    }

    /// The resident chunk `id`, found by binary search.
    pub fn get_chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.search(id).ok().map(|slot| &self.chunks[slot])
    }

    /// Mutable access to the resident chunk `id`.
    pub fn get_chunk_mut(&mut self, id: ChunkId) -> Option<&mut Chunk> {
        match self.search(id) {
            Ok(slot) => Some(&mut self.chunks[slot]),
            Err(_) => None,
        }
    }

    /// The resident block at `position`, if any.
    pub fn get_block(&self, position: BlockPos) -> Option<&Block> {
        self.get_chunk(chunk_func(position.to_point()))?.get_block(position)
    }

    /// The resident block at `position`, located through `index`.
    pub fn find_block(&self, position: BlockPos, index: &AdjacencyIndex) -> Option<&Block> {
        self.get_chunk(chunk_func(position.to_point()))?.find_block(position, index)
    }

    /// Residency state of `id`.
    pub fn state_of(&self, id: ChunkId) -> ChunkState {
        if let Some(chunk) = self.get_chunk(id) {
            ChunkState::Resident {
                buffered: chunk.is_buffered(),
            }
        } else if self.cache.is_cached(id) {
            ChunkState::Cached
        } else {
            ChunkState::Unloaded
        }
    }

    /// Running count of blocks, resident and paged.
    pub fn total_size(&self) -> usize {
        self.total
    }

    /// Whether the set is at capacity.
    pub fn max_reached(&self) -> bool {
        self.total >= self.max_blocks
    }

    /// Finds or creates the resident chunk for `id`, reloading it from the
    /// cache first when it is paged out.
    fn chunk_for_edit(&mut self, id: ChunkId, index: &mut AdjacencyIndex) -> Option<usize> {
        if self.cache.is_cached(id) {
            if let Err(error) = self.load_chunk(id, index) {
                log::error!("Could not reload {} chunk {}: {}", self.kind, id, error);
                return None;
            }
        }
        let slot = match self.search(id) {
            Ok(slot) => slot,
            Err(slot) => {
                log::debug!("Creating {} chunk {}", self.kind, id);
                self.chunks.insert(slot, Chunk::new(id, self.kind, self.time_to_live));
                slot
            }
        };
        Some(slot)
    }

    /// Refreshes blocks in other chunks whose neighbors changed. Blocks in
    /// cached chunks are left alone; their masks are rebuilt on reload.
    fn refresh_foreign(&mut self, cascade: Cascade, index: &AdjacencyIndex) {
        for position in cascade.foreign {
            if let Some(chunk) = self.get_chunk_mut(chunk_func(position.to_point())) {
                chunk.refresh_block(position, index);
            }
        }
    }

    /// Adds a block to the chunk owning its position.
    ///
    /// # Returns
    /// `false`, with nothing changed, when the set is at capacity, the
    /// position is occupied or the owning chunk could not be reloaded.
    pub fn add_block(&mut self, block: Block, update_index: bool, index: &mut AdjacencyIndex) -> bool {
        if block.kind != self.kind {
            log::error!("{} block offered to the {} chunk set", block.kind, self.kind);
            return false;
        }
        if self.max_reached() {
            log::warn!("Capacity of {} {} blocks reached", self.max_blocks, self.kind);
            return false;
        }
        if update_index && index.contains(block.position) {
            return false;
        }

        let id = chunk_func(block.position.to_point());
        let Some(slot) = self.chunk_for_edit(id, index) else {
            return false;
        };
        let cascade = self.chunks[slot].add_block(block, update_index, index);
        if !cascade.applied {
            return false;
        }
        self.total += 1;
        self.refresh_foreign(cascade, &*index);
        true
    }

    /// Removes the block at `block.position`. Emptied chunks stay resident
    /// until the scheduler evicts them.
    ///
    /// # Returns
    /// `false` when no such block exists.
    pub fn remove_block(&mut self, block: &Block, update_index: bool, index: &mut AdjacencyIndex) -> bool {
        let id = chunk_func(block.position.to_point());
        if self.search(id).is_err() && !self.cache.is_cached(id) {
            return false;
        }
        let Some(slot) = self.chunk_for_edit(id, index) else {
            return false;
        };
        let cascade = self.chunks[slot].remove_block(block, update_index, index);
        if !cascade.applied {
            return false;
        }
        self.total -= 1;
        self.refresh_foreign(cascade, &*index);
        true
    }

    /// Brings a cached chunk back into residency. Face masks are rebuilt from
    /// the index, which keeps the entries of paged blocks.
    ///
    /// # Returns
    /// `true` if a chunk was loaded, `false` if `id` was already resident or
    /// not cached.
    pub fn load_chunk(&mut self, id: ChunkId, index: &mut AdjacencyIndex) -> CodecResult<bool> {
        if self.search(id).is_ok() || !self.cache.is_cached(id) {
            return Ok(false);
        }
        let blocks = self.cache.read(id)?;
        let mut chunk = Chunk::new(id, self.kind, self.time_to_live);
        for mut block in blocks {
            block.face_mask = index.face_mask(block.position).unwrap_or(FaceMask::ALL);
            chunk.add_block(block, false, index);
        }
        self.cache.discard(id)?;

        log::info!("Loaded {} chunk {} with {} blocks", self.kind, id, chunk.len());
        if let Err(slot) = self.search(id) {
            self.chunks.insert(slot, chunk);
        }
        Ok(true)
    }

    /// Unbuffers chunk `id`, writes it to its cache file and drops it. On a
    /// write failure the chunk stays resident.
    ///
    /// # Returns
    /// `true` if the chunk was evicted, `false` if it was not resident.
    pub fn evict_chunk(&mut self, id: ChunkId) -> CodecResult<bool> {
        let Ok(slot) = self.search(id) else {
            return Ok(false);
        };
        let blocks: Vec<Block> = self.chunks[slot].blocks().copied().collect();
        self.cache.write(id, &blocks)?;

        let mut chunk = self.chunks.remove(slot);
        chunk.unbuffer();
        self.released.extend(chunk.drain_released());
        log::info!("Evicted {} chunk {} with {} blocks", self.kind, id, blocks.len());
        Ok(true)
    }

    /// The blocks of chunk `id`, resident or cached. Cache files are read, not
    /// consumed.
    pub fn blocks_of(&self, id: ChunkId) -> CodecResult<Vec<Block>> {
        if let Some(chunk) = self.get_chunk(id) {
            Ok(chunk.blocks().copied().collect())
        } else if self.cache.is_cached(id) {
            self.cache.read(id)
        } else {
            Ok(Vec::new())
        }
    }

    /// Every block of the set, resident or paged, by scanning the whole grid.
    pub fn get_total_list(&self) -> CodecResult<Vec<Block>> {
        let mut blocks = Vec::with_capacity(self.total);
        for id in ChunkId::all() {
            blocks.extend(self.blocks_of(id)?);
        }
        Ok(blocks)
    }

    /// Counts blocks by scanning the whole grid, reading cache headers for
    /// paged chunks.
    pub fn scan_total_size(&self) -> CodecResult<usize> {
        let mut total = 0;
        for id in ChunkId::all() {
            if let Some(chunk) = self.get_chunk(id) {
                total += chunk.len();
            } else if self.cache.is_cached(id) {
                total += self.cache.read_count(id)?;
            }
        }
        Ok(total)
    }

    /// Uploads the templates of every chunk not fully buffered.
    ///
    /// # Returns
    /// Number of chunks that needed buffering.
    pub fn buffer_pending(&mut self, backend: &mut dyn RenderBackend) -> usize {
        let mut buffered = 0;
        for chunk in self.chunks.iter_mut().filter(|chunk| !chunk.is_buffered()) {
            chunk.buffer(backend);
            buffered += 1;
        }
        buffered
    }

    /// Hands over every template handle waiting to be released.
    pub fn drain_released(&mut self) -> Vec<TemplateHandle> {
        let mut handles = std::mem::take(&mut self.released);
        for chunk in &mut self.chunks {
            handles.extend(chunk.drain_released());
        }
        handles
    }

    /// Draws every resident chunk.
    pub fn render_if(&self, backend: &mut dyn RenderBackend, predicate: &dyn Fn(&Block) -> bool) -> usize {
        self.chunks.iter().map(|chunk| chunk.render_if(backend, predicate)).sum()
    }

    /// Updates tuple winding for the camera's in-fluid state.
    pub fn prepare(&mut self, backend: &mut dyn RenderBackend, camera_in_fluid: bool) {
        for chunk in &mut self.chunks {
            chunk.prepare(backend, camera_in_fluid);
        }
    }

    /// Advances fluid animation in every resident chunk.
    pub fn animate(&mut self, backend: &mut dyn RenderBackend) {
        for chunk in &mut self.chunks {
            chunk.animate(backend);
        }
    }

    /// Drops every chunk and cache file. Template handles are queued for
    /// release.
    pub fn clear(&mut self) {
        for mut chunk in self.chunks.drain(..) {
            chunk.unbuffer();
            self.released.extend(chunk.drain_released());
        }
        self.cache.clear();
        self.total = 0;
    }
}
