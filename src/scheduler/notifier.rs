//! Reminder notification sinks.
//!
//! The scheduler calls [`ReminderNotifier::on_reminder`] synchronously from
//! the timer task that fired, on whatever runtime worker thread that task
//! happens to run. Implementations must return quickly: hand the task off
//! to another executor (see [`ChannelNotifier`]) rather than doing slow work
//! inline.

use crate::scheduler::tasks::TaskRef;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Receives reminder firings for tasks that are not yet completed.
pub trait ReminderNotifier: Send + Sync {
    fn on_reminder(&self, task: &TaskRef);
}

impl<F> ReminderNotifier for F
where
    F: Fn(&TaskRef) + Send + Sync,
{
    fn on_reminder(&self, task: &TaskRef) {
        self(task);
    }
}

/// Forwards fired tasks into an unbounded channel.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<TaskRef>,
}

impl ChannelNotifier {
    /// Create a notifier sending into `tx`.
    pub fn new(tx: mpsc::UnboundedSender<TaskRef>) -> Self {
        Self { tx }
    }

    /// Create a notifier together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TaskRef>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReminderNotifier for ChannelNotifier {
    fn on_reminder(&self, task: &TaskRef) {
        if self.tx.send(TaskRef::clone(task)).is_err() {
            debug!(task_id = %task.id(), "reminder channel closed, dropping notification");
        }
    }
}

/// Emits each reminder as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl ReminderNotifier for LogNotifier {
    fn on_reminder(&self, task: &TaskRef) {
        info!(
            task_id = %task.id(),
            title = %task.title(),
            due = %task.due_time(),
            "task reminder"
        );
    }
}
