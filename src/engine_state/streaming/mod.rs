//! # Streaming
//!
//! Everything that moves chunks between memory and disk:
//!
//! * `codec` - the binary block record, chunk cache and level file formats
//! * `disk_cache` - per-category cache files for evicted chunks
//! * `visibility` - the distance-ranked scheduler deciding what to load,
//!   keep alive and evict each tick

pub mod codec;
pub mod disk_cache;
pub mod visibility;

pub use codec::LevelData;
pub use disk_cache::DiskCache;
pub use visibility::{ChunkAction, TickAction, VisibilityScheduler};
