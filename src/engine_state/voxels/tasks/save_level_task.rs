//! # Save Level Task
//!
//! Writes the level to a `.dat` file on a worker thread.

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

/// A task that saves the whole level, paged chunks included.
pub struct SaveLevelTask {
    /// The level to save
    level: MtResource<Level>,
    /// Working flag of the level, taken before the lock
    progress: ProgressFlag,
    /// Destination file
    path: PathBuf,
}

impl SaveLevelTask {
    /// Creates a save task. `progress` must be the level's working flag.
    pub fn new(level: MtResource<Level>, progress: ProgressFlag, path: impl Into<PathBuf>) -> Self {
        SaveLevelTask {
            level,
            progress,
            path: path.into(),
        }
    }
}

impl Task for SaveLevelTask {
    fn process(&self) -> Box<dyn TaskResult + Send> {
        let Some(guard) = self.progress.try_begin() else {
            return Box::new(LevelTaskResult::busy("save"));
        };

        let outcome = self
            .level
            .get()
            .save_level_guarded(&guard, &self.path)
            .map(|blocks| RendererCommand::LevelSaved {
                path: self.path.clone(),
                blocks,
            });
        Box::new(LevelTaskResult::new("save", outcome))
    }
}
