//! Task persistence.
//!
//! The scheduling core never touches storage itself. Callers (see
//! [`crate::service::TaskService`]) save, update and delete tasks through a
//! [`TaskRepository`] around each core operation, and seed the scheduler from
//! [`TaskRepository::load_all`] at startup.

pub mod memory;
pub(crate) mod schema;
pub mod sqlite;

pub use memory::MemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use crate::scheduler::tasks::{TaskId, TaskRecord, TaskRef};

/// Storage backend for task records.
///
/// Implementations must preserve task identity and timestamps: a record
/// returned by [`load_all`](Self::load_all) or [`get_by_id`](Self::get_by_id)
/// carries the same [`TaskId`] and creation time it was saved with.
pub trait TaskRepository: Send + Sync {
    /// Every stored task, oldest first.
    fn load_all(&self) -> Result<Vec<TaskRef>, StoreError>;

    /// Insert a new task. Fails with [`StoreError::AlreadyExists`] if the id is taken.
    fn save(&self, task: &TaskRecord) -> Result<(), StoreError>;

    /// Overwrite an existing task. Fails with [`StoreError::NotFound`] if absent.
    fn update(&self, task: &TaskRecord) -> Result<(), StoreError>;

    /// Delete a task. Fails with [`StoreError::NotFound`] if absent.
    fn delete(&self, id: TaskId) -> Result<(), StoreError>;

    /// Fetch one task. Fails with [`StoreError::NotFound`] if absent.
    fn get_by_id(&self, id: TaskId) -> Result<TaskRef, StoreError>;
}

/// Errors from task storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("task not found: {0}")]
    NotFound(String),

    #[error("task already exists: {0}")]
    AlreadyExists(String),

    #[error("lock poisoned: {0}")]
    Lock(String),

    #[error("corrupt task row: {0}")]
    Corrupt(String),
}
