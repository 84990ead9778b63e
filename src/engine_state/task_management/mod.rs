//! # Task Management System
//!
//! A small worker pool executing bulk level operations (save, load,
//! generation) off the update thread.
//!
//! ## Architecture Overview
//!
//! - `TaskManager`: central coordinator for task distribution and workers
//! - `Task`: a unit of work executed on a worker
//! - `TaskResult`: the result of a completed task, which can spawn more tasks
//! - `TaskChannel`: communication channel between the update thread and one
//!   worker
//!
//! Each worker is an OS thread with a dedicated channel. Channels accept at
//! most `MAX_TASKS_IN_FLIGHT` tasks; anything beyond that waits in a FIFO
//! queue on the manager.
//!
//! ## Task Lifecycle
//! 1. Tasks are created and published via `TaskManager::publish_task()`
//! 2. The manager hands tasks to available workers round-robin
//! 3. Workers process tasks and send results back
//! 4. Results are handled on the update thread in `process_completed_tasks()`
//! 5. Results can spawn new tasks or issue renderer commands
//!
//! ## Example Usage
//! ```rust
//! use paged_voxel_world::engine_state::task_management::TaskManager;
//!
//! let mut task_manager = TaskManager::new(2);
//! assert_eq!(task_manager.num_workers(), 2);
//!
//! // In the update loop:
//! let commands = task_manager.process_completed_tasks();
//! task_manager.process_queued_tasks();
//! assert!(commands.is_empty());
//! ```

pub mod task;

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::info;
use task::{Task, TaskResult};

use super::rendering::RendererCommand;

/// A communication channel between the update thread and a worker thread.
///
/// # Fields
/// - `task_sender`: sends tasks to the worker
/// - `result_receiver`: receives task results from the worker
/// - `num_tasks_in_flight`: number of tasks currently being processed
/// - `_worker`: handle to the worker thread
#[derive(Debug)]
pub struct TaskChannel {
    task_sender: Sender<Box<dyn Task + Send>>,
    result_receiver: Receiver<Box<dyn TaskResult + Send>>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// Workers exit when the manager is dropped and their channel disconnects.
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task + Send>>,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// Set to 1 so tasks are processed in order within each channel.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl TaskManager {
    /// Creates a new `TaskManager` with `num_workers` worker threads.
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);
        info!(
            "Starting {} task workers, available parallelism: {:?}",
            num_workers,
            thread::available_parallelism()
        );

        for _ in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task + Send>>();
            let (result_tx, result_rx) = channel::<Box<dyn TaskResult + Send>>();

            let worker = thread::spawn(move || {
                while let Ok(task) = task_rx.recv() {
                    let result = task.process();
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            });

            channels.push(TaskChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                _worker: worker,
            });
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
        }
    }

    /// Number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.channels.len()
    }

    /// Tasks waiting for a free worker.
    pub fn num_queued(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Tasks handed to workers whose results were not handled yet.
    pub fn num_in_flight(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.num_tasks_in_flight)
            .sum()
    }

    /// Whether no task is queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.num_in_flight() == 0
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the worker accepted the task
    /// - `Err(task)` if the worker disconnected, handing the task back
    fn try_send_task(
        &mut self,
        task: Box<dyn Task + Send>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task + Send>> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => Err(task.0),
        }
    }

    /// Finds a worker channel that can accept a new task, round-robin from
    /// the last used channel.
    fn find_available_channel(&self) -> Option<usize> {
        if self.channels.is_empty() {
            return None;
        }

        if self
            .channels
            .iter()
            .all(|channel| channel.num_tasks_in_flight >= MAX_TASKS_IN_FLIGHT)
        {
            return None;
        }

        let start_channel = self.current_channel;
        let mut current = start_channel;

        loop {
            if self.channels[current].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT {
                return Some(current);
            }
            current = (current + 1) % self.channels.len();
            if current == start_channel {
                return None;
            }
        }
    }

    /// Publishes a new task for execution.
    ///
    /// # Returns
    /// - `true` if the task went straight to a worker
    /// - `false` if it was queued because every worker is busy
    pub fn publish_task(&mut self, task: Box<dyn Task + Send>) -> bool {
        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    log::warn!("Task worker {} disconnected", channel_idx);
                    self.queued_tasks.push_back(task);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Hands queued tasks to workers, oldest first, until the queue is empty
    /// or every worker is busy.
    pub fn process_queued_tasks(&mut self) {
        if self.queued_tasks.is_empty() {
            return;
        }

        let Some(mut channel_idx) = self.find_available_channel() else {
            return;
        };
        while let Some(task) = self.queued_tasks.pop_front() {
            match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    match self.find_available_channel() {
                        Some(next_idx) => channel_idx = next_idx,
                        None => break,
                    }
                }
                Err(task) => {
                    self.queued_tasks.push_front(task);
                    break;
                }
            }
        }
    }

    /// Handles every completed task result. Must be called on the update
    /// thread.
    ///
    /// # Returns
    /// Renderer commands issued by the results, in the order received.
    pub fn process_completed_tasks(&mut self) -> Vec<RendererCommand> {
        let mut tasks_to_queue = Vec::new();
        let mut commands = Vec::new();
        for channel in &mut self.channels {
            while let Ok(result) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight -= 1;
                let (new_tasks, renderer_commands) = result.handle_result();
                commands.extend(renderer_commands);
                tasks_to_queue.extend(new_tasks);
            }
        }

        for task in tasks_to_queue {
            self.publish_task(task);
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    struct EchoTask(usize);

    struct EchoResult(usize);

    impl Task for EchoTask {
        fn process(&self) -> Box<dyn TaskResult + Send> {
            Box::new(EchoResult(self.0))
        }
    }

    impl TaskResult for EchoResult {
        fn handle_result(self: Box<Self>) -> (Vec<Box<dyn Task + Send>>, Vec<RendererCommand>) {
            let command = RendererCommand::LevelSaved {
                path: PathBuf::from("echo.dat"),
                blocks: self.0,
            };
            let follow_up: Vec<Box<dyn Task + Send>> = if self.0 > 0 {
                vec![Box::new(EchoTask(self.0 - 1))]
            } else {
                Vec::new()
            };
            (follow_up, vec![command])
        }
    }

    fn drain(manager: &mut TaskManager) -> Vec<RendererCommand> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut commands = Vec::new();
        while !manager.is_idle() && Instant::now() < deadline {
            commands.extend(manager.process_completed_tasks());
            manager.process_queued_tasks();
            thread::sleep(Duration::from_millis(1));
        }
        commands
    }

    #[test]
    fn tasks_beyond_worker_count_are_queued() {
        let mut manager = TaskManager::new(1);
        assert!(manager.publish_task(Box::new(EchoTask(0))));
        assert!(!manager.publish_task(Box::new(EchoTask(0))));
        assert_eq!(manager.num_queued(), 1);
        assert_eq!(manager.num_in_flight(), 1);

        assert_eq!(drain(&mut manager).len(), 2);
        assert!(manager.is_idle());
    }

    #[test]
    fn results_can_spawn_follow_up_tasks() {
        let mut manager = TaskManager::new(2);
        manager.publish_task(Box::new(EchoTask(3)));
        let blocks: Vec<usize> = drain(&mut manager)
            .into_iter()
            .filter_map(|command| match command {
                RendererCommand::LevelSaved { blocks, .. } => Some(blocks),
                _ => None,
            })
            .collect();
        assert_eq!(blocks, vec![3, 2, 1, 0]);
    }

    #[test]
    fn a_pool_without_workers_only_queues() {
        let mut manager = TaskManager::new(0);
        assert!(!manager.publish_task(Box::new(EchoTask(0))));
        manager.process_queued_tasks();
        assert_eq!(manager.num_queued(), 1);
    }
}
