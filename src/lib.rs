//! Taskminder: a priority task queue with one-shot reminders.
//!
//! Tasks are kept in a priority-ordered queue (`HIGH` before `MEDIUM` before
//! `LOW`, older before newer) and each may carry a reminder that fires once
//! at its reminder time.
//!
//! # Architecture
//!
//! - **Scheduling core** ([`scheduler`]): [`TaskRecord`], the [`TaskQueue`],
//!   the reminder registry and the [`ReminderScheduler`] that ties them
//!   together on a tokio runtime
//! - **Notification**: reminders are handed to a [`ReminderNotifier`]
//! - **Persistence** ([`store`]): SQLite or in-memory [`TaskRepository`]
//! - **Service** ([`service`]): keeps the store in step with the core

pub mod config;
pub mod error;
pub mod scheduler;
pub mod service;
pub mod store;

pub use config::{SchedulerConfig, TaskminderConfig};
pub use error::{Result, TaskminderError};
pub use scheduler::{
    ChannelNotifier, LogNotifier, ReminderArming, ReminderNotifier, ReminderScheduler,
    ShutdownReport, TaskId, TaskPriority, TaskQueue, TaskRecord, TaskRef, TaskStatus,
};
pub use service::{TaskEdit, TaskService};
pub use store::{MemoryTaskStore, SqliteTaskStore, StoreError, TaskRepository};
