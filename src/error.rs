//! Error types for the task scheduling core.

use crate::scheduler::tasks::TaskId;
use crate::store::StoreError;

/// Top-level error type for the task scheduling core and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum TaskminderError {
    /// A required field was missing when building a task.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The priority queue holds no tasks.
    #[error("task queue is empty")]
    EmptyQueue,

    /// The task is not currently present in the queue.
    #[error("task not found in queue: {0}")]
    NotFound(TaskId),

    /// A reminder was requested after the scheduler shut down.
    #[error("scheduling rejected: {0}")]
    RejectedScheduling(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Persistence error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No tokio runtime available to drive reminder timers.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TaskminderError>;
