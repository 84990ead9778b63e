//! # Task System Core Traits
//!
//! This module defines the building blocks of the task system, which runs
//! bulk level operations on worker threads.
//!
//! ## Core Components
//! - `Task`: a unit of work executed on a worker
//! - `TaskResult`: the outcome of a task, handled on the update thread
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` is called on the update thread
//! 5. The result can spawn new tasks or issue renderer commands
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred between threads
//! - `TaskResult` must be `Send` to be transferred back
//! - Shared state goes through `MtResource`

use crate::engine_state::rendering::RendererCommand;

/// A unit of work that can be executed on a worker thread.
///
/// Tasks own everything they need: parameters by value and shared state
/// through `MtResource` handles.
pub trait Task: Send {
    /// Processes the task and returns a result.
    ///
    /// Runs on a worker thread. Errors are not propagated out of the worker;
    /// they are carried inside the returned result.
    fn process(&self) -> Box<dyn TaskResult + Send>;
}

/// The result of processing a `Task`.
///
/// Handled on the update thread, so `handle_result()` should stay cheap.
pub trait TaskResult: Send {
    /// Turns the result into follow-up work.
    ///
    /// # Returns
    /// 1. New tasks to schedule (can be empty)
    /// 2. Commands for the render loop (can be empty)
    fn handle_result(self: Box<Self>) -> (Vec<Box<dyn Task + Send>>, Vec<RendererCommand>);
}
