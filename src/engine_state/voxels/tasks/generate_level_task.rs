//! # Generate Level Task
//!
//! Replaces the level with generated terrain on a worker thread.

use std::sync::Arc;

use crate::{
    core::{MtResource, ProgressFlag},
    engine_state::{
        level::Level,
        rendering::RendererCommand,
        task_management::task::{Task, TaskResult},
        voxels::generation::TerrainGenerator,
    },
};

use super::LevelTaskResult;

/// A task that clears the level and fills it from a terrain generator.
///
/// Generation holds the level's write lock until it finishes, stops at
/// capacity, or notices the cancel token.
pub struct GenerateLevelTask {
    level: MtResource<Level>,
    progress: ProgressFlag,
    generator: Arc<dyn TerrainGenerator>,
    /// Half width of the generated square, in world units
    radius: i32,
}

impl GenerateLevelTask {
    /// Creates a generation task covering `radius` world units around the
    /// origin.
    pub fn new(
        level: MtResource<Level>,
        progress: ProgressFlag,
        generator: Arc<dyn TerrainGenerator>,
        radius: i32,
    ) -> Self {
        GenerateLevelTask {
            level,
            progress,
            generator,
            radius,
        }
    }
}

impl Task for GenerateLevelTask {
    fn process(&self) -> Box<dyn TaskResult + Send> {
        let Some(guard) = self.progress.try_begin() else {
            return Box::new(LevelTaskResult::busy("generation"));
        };

        let outcome = self
            .level
            .get_mut()
            .generate_guarded(&guard, self.generator.as_ref(), self.radius)
            .map(|blocks| RendererCommand::LevelReplaced { blocks });
        Box::new(LevelTaskResult::new("generation", outcome))
    }
}
