//! # Level Tasks
//!
//! Bulk level operations run on worker threads: saving, loading and terrain
//! generation. Each task shares the level through an `MtResource` and takes
//! the level's working flag before locking it, so a second bulk operation is
//! refused instead of queued behind the first.

pub mod generate_level_task;
pub mod load_level_task;
pub mod save_level_task;

use crate::engine_state::rendering::RendererCommand;
use crate::engine_state::task_management::task::{Task, TaskResult};
use crate::error::{LevelError, LevelResult};

/// Outcome of a bulk level operation, shared by every level task.
#[derive(Debug)]
pub struct LevelTaskResult {
    operation: &'static str,
    outcome: LevelResult<RendererCommand>,
}

impl LevelTaskResult {
    /// Wraps the outcome of `operation`.
    pub fn new(operation: &'static str, outcome: LevelResult<RendererCommand>) -> Self {
        LevelTaskResult { operation, outcome }
    }

    /// A result for an operation refused because another one is running.
    pub fn busy(operation: &'static str) -> Self {
        Self::new(operation, Err(LevelError::Busy))
    }
}

impl TaskResult for LevelTaskResult {
    fn handle_result(self: Box<Self>) -> (Vec<Box<dyn Task + Send>>, Vec<RendererCommand>) {
        let command = match self.outcome {
            Ok(command) => command,
            Err(error) => {
                log::error!("Level {} failed: {}", self.operation, error);
                RendererCommand::OperationFailed {
                    operation: self.operation,
                    error,
                }
            }
        };
        (Vec::new(), vec![command])
    }
}

#[cfg(test)]
mod tests {
    use super::save_level_task::SaveLevelTask;
    use super::*;
    use crate::config::WorldConfig;
    use crate::core::MtResource;
    use crate::engine_state::level::Level;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn tasks_refuse_without_waiting_for_the_level() {
        let dir = std::env::temp_dir().join(format!("paged-voxel-world-task-busy-{}", std::process::id()));
        let level = MtResource::new(Level::new(WorldConfig::default().with_cache_dir(dir)).unwrap());
        let progress = level.get().progress();
        let task = SaveLevelTask::new(level.clone(), progress.clone(), "busy.dat");

        // Another operation owns the flag and the level.
        let _held = progress.try_begin().unwrap();
        let _write = level.get_mut();

        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let _ = sender.send(task.process());
        });
        let result = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        let (follow_ups, commands) = result.handle_result();

        assert!(follow_ups.is_empty());
        assert!(matches!(
            commands.as_slice(),
            [RendererCommand::OperationFailed {
                operation: "save",
                error: LevelError::Busy
            }]
        ));
    }
}
