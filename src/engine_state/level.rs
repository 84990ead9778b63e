//! # Level
//!
//! The world container. A level owns, for each block category, the chunk set
//! and its adjacency index, plus the visibility scheduler, the viewer's camera
//! frame, the configuration and the working flag of bulk operations.
//!
//! ## Threads
//!
//! * Update thread: `add_block`, `remove_block`, `determine_visible`,
//!   `chunk_operations`.
//! * Render thread: `buffer_pending`, `render`, `animate_fluids`,
//!   `release_pending`. GPU templates are only created and destroyed here.
//! * Workers: `save_level`, `load_level`, `new_level` and `generate`, run as
//!   tasks while the level is shared behind an `MtResource`.
//!
//! Bulk operations refuse to start while another one holds the working flag,
//! and they poll the level's cancel token inside their loops.

use std::path::Path;

use cgmath::Point3;

use crate::config::WorldConfig;
use crate::core::{CancelToken, ProgressFlag, ProgressGuard};
use crate::error::{LevelError, LevelResult};

use super::camera_state::CameraFrame;
use super::rendering::RenderBackend;
use super::streaming::codec::{self, LevelData};
use super::streaming::visibility::{TickAction, VisibilityScheduler};
use super::voxels::adjacency::AdjacencyIndex;
use super::voxels::block::{Block, BlockKind, BlockPos, FaceMask, BLOCK_SPAN};
use super::voxels::chunk::chunk_grid::{ChunkId, WORLD_HALF_EXTENT};
use super::voxels::chunk::ChunkState;
use super::voxels::chunk_set::ChunkSet;
use super::voxels::generation::TerrainGenerator;

/// Extension level files must carry.
pub const LEVEL_EXTENSION: &str = "dat";

/// A paged voxel world.
#[derive(Debug)]
pub struct Level {
    config: WorldConfig,
    camera: CameraFrame,
    solid: ChunkSet,
    solid_index: AdjacencyIndex,
    fluid: ChunkSet,
    fluid_index: AdjacencyIndex,
    scheduler: VisibilityScheduler,
    progress: ProgressFlag,
    cancel: CancelToken,
}

impl Level {
    /// Creates an empty level. The cache directory is created and purged.
    pub fn new(config: WorldConfig) -> LevelResult<Self> {
        let config = config.clamped();
        let solid = ChunkSet::new(
            BlockKind::Solid,
            &config.cache_dir,
            config.max_solid_blocks,
            config.time_to_live,
        )?;
        let fluid = ChunkSet::new(
            BlockKind::Fluid,
            &config.cache_dir,
            config.max_fluid_blocks,
            config.time_to_live,
        )?;
        log::info!("Created level with cache directory {:?}", config.cache_dir);

        Ok(Level {
            scheduler: VisibilityScheduler::new(config.vision_radius),
            config,
            camera: CameraFrame::default(),
            solid,
            solid_index: AdjacencyIndex::new(),
            fluid,
            fluid_index: AdjacencyIndex::new(),
            progress: ProgressFlag::new(),
            cancel: CancelToken::new(),
        })
    }

    /// The configuration the level was created with, after clamping.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The viewer's current frame.
    pub fn camera(&self) -> &CameraFrame {
        &self.camera
    }

    /// Replaces the viewer's frame.
    pub fn set_camera(&mut self, camera: CameraFrame) {
        self.camera = camera;
    }

    /// A handle on the working flag, usable without locking the level.
    pub fn progress(&self) -> ProgressFlag {
        self.progress.clone()
    }

    /// A handle on the cancel token, usable without locking the level.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn layer(&self, kind: BlockKind) -> (&ChunkSet, &AdjacencyIndex) {
        match kind {
            BlockKind::Solid => (&self.solid, &self.solid_index),
            BlockKind::Fluid => (&self.fluid, &self.fluid_index),
        }
    }

    fn layer_mut(&mut self, kind: BlockKind) -> (&mut ChunkSet, &mut AdjacencyIndex) {
        match kind {
            BlockKind::Solid => (&mut self.solid, &mut self.solid_index),
            BlockKind::Fluid => (&mut self.fluid, &mut self.fluid_index),
        }
    }

    /// The chunk set of one category.
    pub fn chunk_set(&self, kind: BlockKind) -> &ChunkSet {
        self.layer(kind).0
    }

    /// The adjacency index of one category.
    pub fn adjacency(&self, kind: BlockKind) -> &AdjacencyIndex {
        self.layer(kind).1
    }

    /// Places a block in its category.
    ///
    /// # Returns
    /// `false`, with nothing changed, at capacity or when the position is
    /// already occupied.
    pub fn add_block(&mut self, block: Block, update_index: bool) -> bool {
        let (set, index) = self.layer_mut(block.kind);
        set.add_block(block, update_index, index)
    }

    /// Removes the block at `block.position` from its category.
    pub fn remove_block(&mut self, block: &Block, update_index: bool) -> bool {
        let (set, index) = self.layer_mut(block.kind);
        set.remove_block(block, update_index, index)
    }

    /// Feeds the viewer position to the scheduler.
    ///
    /// # Returns
    /// `true` if the scheduler rebuilt its queues.
    pub fn determine_visible(&mut self, viewer: Point3<f32>) -> bool {
        self.scheduler.determine_visible(viewer)
    }

    /// Runs one scheduler tick: at most one visible and one invisible chunk
    /// per category.
    pub fn chunk_operations(&mut self) -> Vec<TickAction> {
        self.scheduler.chunk_operations([
            (&mut self.solid, &mut self.solid_index),
            (&mut self.fluid, &mut self.fluid_index),
        ])
    }

    /// Uploads templates of chunks that were created, edited or reloaded.
    ///
    /// # Returns
    /// Number of chunks buffered.
    pub fn buffer_pending(&mut self, backend: &mut dyn RenderBackend) -> usize {
        self.solid.buffer_pending(backend) + self.fluid.buffer_pending(backend)
    }

    /// Releases templates dropped by the update thread.
    ///
    /// # Returns
    /// Number of templates released.
    pub fn release_pending(&mut self, backend: &mut dyn RenderBackend) -> usize {
        let mut handles = self.solid.drain_released();
        handles.extend(self.fluid.drain_released());
        for handle in &handles {
            backend.release_template(*handle);
        }
        handles.len()
    }

    /// Draws every resident block accepted by `predicate`, solids first.
    /// Winding is flipped first if the camera entered or left a fluid.
    ///
    /// # Returns
    /// Number of draw calls issued.
    pub fn render(&mut self, backend: &mut dyn RenderBackend, predicate: &dyn Fn(&Block) -> bool) -> usize {
        let in_fluid = self.camera_in_fluid();
        self.solid.prepare(backend, in_fluid);
        self.fluid.prepare(backend, in_fluid);
        self.solid.render_if(backend, predicate) + self.fluid.render_if(backend, predicate)
    }

    /// Advances the fluid wave animation.
    pub fn animate_fluids(&mut self, backend: &mut dyn RenderBackend) {
        self.fluid.animate(backend);
    }

    /// Running count of blocks of both categories, resident and paged.
    pub fn total_size(&self) -> usize {
        self.solid.total_size() + self.fluid.total_size()
    }

    /// Whether a category is at capacity.
    pub fn max_reached(&self, kind: BlockKind) -> bool {
        self.chunk_set(kind).max_reached()
    }

    /// Drawable faces of the block recorded at `position`, resident or paged.
    pub fn face_mask_at(&self, kind: BlockKind, position: BlockPos) -> Option<FaceMask> {
        self.adjacency(kind).face_mask(position)
    }

    /// The resident block at `position`, solids first.
    pub fn block_at(&self, position: BlockPos) -> Option<&Block> {
        self.solid
            .find_block(position, &self.solid_index)
            .or_else(|| self.fluid.find_block(position, &self.fluid_index))
    }

    /// Whether `point` lies inside a solid block.
    pub fn collides(&self, point: Point3<f32>) -> bool {
        self.solid_index.contains(BlockPos::quantize(point))
    }

    /// Whether the camera is inside a fluid block.
    pub fn camera_in_fluid(&self) -> bool {
        self.fluid_index.contains(BlockPos::quantize(self.camera.position))
    }

    /// Residency state of chunk `id` in one category.
    pub fn chunk_state(&self, kind: BlockKind, id: ChunkId) -> ChunkState {
        self.chunk_set(kind).state_of(id)
    }

    /// Every block of the level plus the camera, read from memory and cache
    /// files. Scans the whole grid.
    pub fn snapshot(&self) -> LevelResult<LevelData> {
        Ok(LevelData {
            camera: self.camera,
            solid: self.solid.get_total_list()?,
            fluid: self.fluid.get_total_list()?,
        })
    }

    fn begin(&self, operation: &str) -> LevelResult<ProgressGuard> {
        match self.progress.try_begin() {
            Some(guard) => Ok(guard),
            None => {
                log::warn!("Refusing to {}: another level operation is in progress", operation);
                Err(LevelError::Busy)
            }
        }
    }

    fn check_cancelled(&self) -> LevelResult<()> {
        if self.cancel.is_cancelled() {
            Err(LevelError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn check_extension(path: &Path) -> LevelResult<()> {
        if path.extension().and_then(|ext| ext.to_str()) == Some(LEVEL_EXTENSION) {
            Ok(())
        } else {
            Err(LevelError::InvalidExtension(path.to_path_buf()))
        }
    }

    fn clear_world(&mut self) {
        self.solid.clear();
        self.fluid.clear();
        self.solid_index.clear();
        self.fluid_index.clear();
        self.scheduler.reset();
    }

    /// Empties the level and its cache directory. Released templates are
    /// handed back through `release_pending`.
    pub fn new_level(&mut self) -> LevelResult<()> {
        let _guard = self.begin("reset the level")?;
        self.clear_world();
        self.camera = CameraFrame::default();
        log::info!("Started a new level");
        Ok(())
    }

    /// Writes the whole level, including paged chunks, to a `.dat` file.
    ///
    /// # Returns
    /// Number of blocks written.
    pub fn save_level(&self, path: &Path) -> LevelResult<usize> {
        let guard = self.begin("save the level")?;
        self.save_level_guarded(&guard, path)
    }

    /// `save_level` for a caller already holding the working flag.
    pub(crate) fn save_level_guarded(&self, _guard: &ProgressGuard, path: &Path) -> LevelResult<usize> {
        Self::check_extension(path)?;
        self.check_cancelled()?;

        let data = self.snapshot()?;
        self.check_cancelled()?;
        codec::save_level_file(path, &data).map_err(|error| {
            log::error!("Could not save level to {:?}: {}", path, error);
            error
        })?;

        log::info!("Saved {} blocks to {:?}", data.len(), path);
        Ok(data.len())
    }

    /// Replaces the level with the contents of a `.dat` file.
    ///
    /// The file is parsed completely before anything is touched: on any
    /// error the current level is left exactly as it was.
    ///
    /// # Returns
    /// Number of blocks placed.
    pub fn load_level(&mut self, path: &Path) -> LevelResult<usize> {
        let guard = self.begin("load a level")?;
        self.load_level_guarded(&guard, path)
    }

    /// `load_level` for a caller already holding the working flag.
    pub(crate) fn load_level_guarded(&mut self, _guard: &ProgressGuard, path: &Path) -> LevelResult<usize> {
        Self::check_extension(path)?;

        let data = codec::load_level_file(path).map_err(|error| {
            log::error!("Could not load level from {:?}: {}", path, error);
            error
        })?;
        for kind in [BlockKind::Solid, BlockKind::Fluid] {
            let max = self.chunk_set(kind).max_blocks();
            if data.blocks(kind).len() > max {
                return Err(LevelError::Capacity { kind, max });
            }
        }
        self.check_cancelled()?;

        let placed = self.install(data);
        log::info!("Loaded {} blocks from {:?}", placed, path);
        Ok(placed)
    }

    /// Swaps a fully parsed level in for the current one.
    fn install(&mut self, data: LevelData) -> usize {
        self.clear_world();
        self.camera = data.camera;
        let mut placed = 0;
        for block in data.solid.into_iter().chain(data.fluid) {
            if self.add_block(block, true) {
                placed += 1;
            } else {
                log::warn!("Skipping duplicate {} block at {}", block.kind, block.position);
            }
        }
        placed
    }

    /// Replaces the level with terrain from `generator`, covering every
    /// column within `radius` world units of the origin along x and z.
    ///
    /// Generation stops early, keeping what was placed, when both categories
    /// reach capacity or the cancel token is raised.
    ///
    /// # Returns
    /// Number of blocks placed.
    pub fn generate(&mut self, generator: &dyn TerrainGenerator, radius: i32) -> LevelResult<usize> {
        let guard = self.begin("generate a level")?;
        self.generate_guarded(&guard, generator, radius)
    }

    /// `generate` for a caller already holding the working flag.
    pub(crate) fn generate_guarded(
        &mut self,
        _guard: &ProgressGuard,
        generator: &dyn TerrainGenerator,
        radius: i32,
    ) -> LevelResult<usize> {
        self.clear_world();

        let radius = radius.clamp(0, WORLD_HALF_EXTENT - BLOCK_SPAN);
        let radius = radius - radius % BLOCK_SPAN;
        let mut placed = 0;
        'columns: for x in (-radius..=radius).step_by(BLOCK_SPAN as usize) {
            for z in (-radius..=radius).step_by(BLOCK_SPAN as usize) {
                self.check_cancelled()?;
                if self.max_reached(BlockKind::Solid) && self.max_reached(BlockKind::Fluid) {
                    log::warn!("Generation stopped at capacity after {} blocks", placed);
                    break 'columns;
                }
                for block in generator.column(x, z) {
                    if self.add_block(block, true) {
                        placed += 1;
                    }
                }
            }
        }

        log::info!("Generated {} blocks within {} units of the origin", placed, radius);
        Ok(placed)
    }
}
