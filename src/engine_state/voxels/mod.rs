//! # Voxel World Core
//!
//! Block storage of a paged voxel world.
//!
//! ## Architecture
//!
//! Storage is layered from the single block up:
//!
//! * **Block**: a grid-aligned cube with texture, color and category
//! * **Adjacency**: per-category index of occupied positions and neighbor bits
//! * **Tuple**: blocks sharing a texture and face mask, drawn with one template
//! * **Chunk**: the tuples of one grid column, the unit of paging
//! * **Chunk set**: every chunk of one category, resident or paged to disk
//! * **Generation**: terrain producers feeding blocks into a level
//! * **Tasks**: bulk level operations run on worker threads
//!
//! ## Data Flow
//!
//! 1. A block is offered to the chunk set of its category
//! 2. The set finds the owning chunk, reloading it from disk if needed
//! 3. The chunk files the block under the tuple matching its face mask and
//!    moves every neighbor whose mask changed
//! 4. Neighbors in other chunks are refreshed by the set
//! 5. The touched chunks are re-buffered by the render thread
//!
//! ## Thread Safety
//!
//! Chunk sets are plain data, mutated from the update thread only. Worker
//! tasks reach them through the level lock.

pub mod adjacency;
pub mod block;
pub mod chunk;
pub mod chunk_set;
pub mod generation;
pub mod tasks;
pub mod tuple;
