//! # Load Level Task
//!
//! Replaces the level with the contents of a `.dat` file on a worker thread.

use std::path::PathBuf;

use crate::{
    core::{MtResource, ProgressFlag},
    engine_state::{
        level::Level,
        rendering::RendererCommand,
        task_management::task::{Task, TaskResult},
    },
};

use super::LevelTaskResult;

/// A task that loads a level file. On failure the level is left untouched.
pub struct LoadLevelTask {
    level: MtResource<Level>,
    progress: ProgressFlag,
    path: PathBuf,
}

impl LoadLevelTask {
    /// Creates a load task for the file at `path`. `progress` must be the
    /// level's working flag.
    pub fn new(level: MtResource<Level>, progress: ProgressFlag, path: impl Into<PathBuf>) -> Self {
        LoadLevelTask {
            level,
            progress,
            path: path.into(),
        }
    }
}

impl Task for LoadLevelTask {
    fn process(&self) -> Box<dyn TaskResult + Send> {
        let Some(guard) = self.progress.try_begin() else {
            return Box::new(LevelTaskResult::busy("load"));
        };

        let outcome = self
            .level
            .get_mut()
            .load_level_guarded(&guard, &self.path)
            .map(|blocks| RendererCommand::LevelReplaced { blocks });
        Box::new(LevelTaskResult::new("load", outcome))
    }
}
