//! Task scheduling core.
//!
//! A priority-ordered [`TaskQueue`] and a [`ReminderRegistry`] of one-shot
//! reminder timers, orchestrated by [`ReminderScheduler`]. Reminders are
//! delivered through a [`ReminderNotifier`].

pub mod notifier;
pub mod queue;
pub mod registry;
pub mod runner;
pub mod tasks;

pub use notifier::{ChannelNotifier, LogNotifier, ReminderNotifier};
pub use queue::TaskQueue;
pub use registry::{ReminderHandle, ReminderRegistry};
pub use runner::{ReminderArming, ReminderScheduler, ShutdownReport};
pub use tasks::{TaskBuilder, TaskId, TaskPriority, TaskRecord, TaskRef, TaskSnapshot, TaskStatus};
