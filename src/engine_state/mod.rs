//! # Engine State Module
//!
//! Drives a paged voxel world from an application loop.
//!
//! ## Key Components
//!
//! * `EngineState` - owns the shared level and the worker pool
//! * `level` - the world container and its per-block, paging and bulk operations
//! * `camera_state` - the viewer's frame
//! * `rendering` - the backend seam, instance data and renderer commands
//! * `streaming` - the level file codec, chunk cache files and the scheduler
//! * `task_management` - worker threads for bulk operations
//! * `voxels` - blocks, adjacency, tuples, chunks and chunk sets
//!
//! ## Loop
//!
//! Each frame the application calls, in any order and from one thread:
//!
//! * `update` - feeds the camera to the scheduler and runs one paging tick
//! * `process_tasks` - collects finished bulk operations
//! * `render` - buffers pending chunks, releases dropped templates and draws
//!
//! While a bulk operation holds the level, `update` and `render` skip their
//! work for that frame instead of blocking. Publishing a bulk operation never
//! locks the level: a request made while another one runs is refused and
//! reported by the next `process_tasks`.

use std::path::PathBuf;
use std::sync::Arc;

use web_time::{Duration, Instant};

use crate::config::WorldConfig;
use crate::core::{CancelToken, MtResource, ProgressFlag};
use crate::error::{LevelError, LevelResult};

use camera_state::CameraFrame;
use level::Level;
use rendering::{RenderBackend, RendererCommand};
use streaming::TickAction;
use task_management::task::Task;
use task_management::TaskManager;
use voxels::block::Block;
use voxels::generation::TerrainGenerator;
use voxels::tasks::{
    generate_level_task::GenerateLevelTask, load_level_task::LoadLevelTask,
    save_level_task::SaveLevelTask,
};

pub mod camera_state;
pub mod level;
pub mod rendering;
pub mod streaming;
pub mod task_management;
pub mod voxels;

/// Ticks slower than this are reported.
const SLOW_TICK: Duration = Duration::from_millis(8);

/// The state container of a running world.
///
/// # Examples
///
/// ```no_run
/// use paged_voxel_world::{EngineState, WorldConfig, CameraFrame};
/// use paged_voxel_world::engine_state::rendering::RecordingBackend;
///
/// let mut engine = EngineState::new(WorldConfig::default()).unwrap();
/// let mut backend = RecordingBackend::new();
/// engine.load("world.dat");
///
/// loop {
///     engine.update(CameraFrame::default());
///     for command in engine.process_tasks() {
///         println!("{:?}", command);
///     }
///     engine.render(&mut backend, &|_| true);
/// }
/// ```
pub struct EngineState {
    /// The level, shared with worker tasks
    pub level: MtResource<Level>,
    /// Worker pool running bulk operations
    pub task_manager: TaskManager,
    progress: ProgressFlag,
    cancel: CancelToken,
    /// Bulk operations refused at publish time, reported by `process_tasks`
    refused: Vec<RendererCommand>,
}

impl EngineState {
    /// Creates an empty level and starts `config.worker_threads` workers.
    pub fn new(config: WorldConfig) -> LevelResult<Self> {
        let workers = config.worker_threads;
        let level = Level::new(config)?;
        let progress = level.progress();
        let cancel = level.cancel_token();

        Ok(EngineState {
            level: MtResource::new(level),
            task_manager: TaskManager::new(workers),
            progress,
            cancel,
            refused: Vec::new(),
        })
    }

    /// Whether a bulk operation is running.
    pub fn is_busy(&self) -> bool {
        self.progress.is_working()
    }

    fn publish_bulk(&mut self, operation: &'static str, task: Box<dyn Task + Send>) {
        if self.progress.is_working() {
            log::warn!("Refusing {}: another level operation is in progress", operation);
            self.refused.push(RendererCommand::OperationFailed {
                operation,
                error: LevelError::Busy,
            });
            return;
        }
        self.task_manager.publish_task(task);
    }

    /// Schedules a save of the whole level to `path`.
    pub fn save(&mut self, path: impl Into<PathBuf>) {
        let task = SaveLevelTask::new(self.level.clone(), self.progress.clone(), path);
        self.publish_bulk("save", Box::new(task));
    }

    /// Schedules a load of the level file at `path`.
    pub fn load(&mut self, path: impl Into<PathBuf>) {
        let task = LoadLevelTask::new(self.level.clone(), self.progress.clone(), path);
        self.publish_bulk("load", Box::new(task));
    }

    /// Schedules terrain generation within `radius` world units of the origin.
    pub fn generate(&mut self, generator: Arc<dyn TerrainGenerator>, radius: i32) {
        let task = GenerateLevelTask::new(self.level.clone(), self.progress.clone(), generator, radius);
        self.publish_bulk("generation", Box::new(task));
    }

    /// Moves the viewer and runs one paging tick.
    ///
    /// # Returns
    /// The paging decisions taken, or `None` if a bulk operation holds the
    /// level.
    pub fn update(&mut self, camera: CameraFrame) -> Option<Vec<TickAction>> {
        let mut level = self.level.try_get_mut()?;
        let start = Instant::now();
        level.set_camera(camera);
        level.determine_visible(camera.position);
        let actions = level.chunk_operations();

        let elapsed = start.elapsed();
        if elapsed > SLOW_TICK {
            log::warn!("Paging tick took {:?} for {} actions", elapsed, actions.len());
        }
        Some(actions)
    }

    /// Collects finished bulk operations and hands queued ones to workers.
    pub fn process_tasks(&mut self) -> Vec<RendererCommand> {
        let mut commands = std::mem::take(&mut self.refused);
        commands.extend(self.task_manager.process_completed_tasks());
        self.task_manager.process_queued_tasks();
        commands
    }

    /// Buffers pending chunks, releases dropped templates and draws every
    /// block accepted by `predicate`.
    ///
    /// # Returns
    /// Draw calls issued, or `None` if a bulk operation holds the level.
    pub fn render(&mut self, backend: &mut dyn RenderBackend, predicate: &dyn Fn(&Block) -> bool) -> Option<usize> {
        let mut level = self.level.try_get_mut()?;
        level.release_pending(backend);
        level.buffer_pending(backend);
        level.animate_fluids(backend);
        Some(level.render(backend, predicate))
    }

    /// Asks running bulk operations to stop at their next check.
    pub fn shutdown(&self) {
        log::info!("Cancelling level operations");
        self.cancel.cancel();
    }
}

impl Drop for EngineState {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
