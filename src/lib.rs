#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Paged Voxel World
//!
//! The world core of a block-based 3D game: storage of cube blocks in a
//! fixed grid of column chunks, face culling from neighbor occupancy,
//! distance-driven paging of chunks to disk, and whole-level persistence.
//!
//! ## Key Modules
//!
//! * `core` - shared-state containers and coordination flags
//! * `config` - the JSON configuration
//! * `error` - error types of the codec and of bulk level operations
//! * `engine_state` - the level, its storage layers, paging, rendering seam
//!   and worker tasks
//!
//! ## Architecture
//!
//! * The update thread edits blocks and runs one scheduler tick per frame
//! * The render thread buffers templates and draws instances through a
//!   `RenderBackend` supplied by the application
//! * Worker threads save, load and generate whole levels
//!
//! ## Usage
//!
//! ```rust
//! use cgmath::Point3;
//! use paged_voxel_world::{Block, BlockKind, BlockPos, Level, WorldConfig};
//!
//! let dir = std::env::temp_dir().join(format!("paged-voxel-world-doc-{}", std::process::id()));
//! let mut level = Level::new(WorldConfig::default().with_cache_dir(dir)).unwrap();
//!
//! level.add_block(Block::solid(Point3::new(0.0, 0.0, 0.0), "stone"), true);
//! level.add_block(Block::solid(Point3::new(0.0, 2.0, 0.0), "stone"), true);
//!
//! let mask = level.face_mask_at(BlockKind::Solid, BlockPos::new(0, 0, 0)).unwrap();
//! assert_eq!(mask.count(), 5);
//! assert_eq!(level.total_size(), 2);
//! ```

pub mod config;
pub mod core;
pub mod engine_state;
pub mod error;

pub use config::WorldConfig;
pub use engine_state::camera_state::CameraFrame;
pub use engine_state::level::Level;
pub use engine_state::rendering::{RecordingBackend, RenderBackend, RendererCommand};
pub use engine_state::streaming::{ChunkAction, TickAction};
pub use engine_state::voxels::block::{Block, BlockKind, BlockPos, FaceMask};
pub use engine_state::voxels::chunk::chunk_grid::ChunkId;
pub use engine_state::voxels::generation::{PerlinTerrain, TerrainGenerator};
pub use engine_state::EngineState;
pub use error::{CodecError, ConfigError, LevelError};

/// Installs the `env_logger` logger writing to stdout, filtered by
/// `RUST_LOG`. Calling it twice is harmless.
pub fn init_logger() {
    let mut log_builder = env_logger::Builder::new();
    let installed = log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init()
        .is_ok();

    if installed {
        log::info!("Logger initialized");
    }
}
