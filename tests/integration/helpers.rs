//! Shared helpers for integration tests.

use chrono::{TimeDelta, Utc};
use std::time::Duration;
use taskminder::{
    ChannelNotifier, ReminderScheduler, SchedulerConfig, TaskPriority, TaskRecord, TaskRef,
};
use tokio::sync::mpsc;

/// Build a scheduler whose reminders land in the returned receiver.
pub(crate) fn channel_scheduler() -> (ReminderScheduler, mpsc::UnboundedReceiver<TaskRef>) {
    let (notifier, rx) = ChannelNotifier::channel();
    let scheduler =
        ReminderScheduler::new(notifier, SchedulerConfig::default()).expect("create scheduler");
    (scheduler, rx)
}

/// A task due and reminded relative to now.
pub(crate) fn task_in(priority: TaskPriority, due_in: TimeDelta, remind_in: TimeDelta) -> TaskRef {
    let now = Utc::now();
    TaskRecord::new("task", "integration", now + due_in, now + remind_in, priority).into_ref()
}

/// Tasks created in order with strictly increasing creation times.
pub(crate) fn tasks_in_creation_order(priorities: &[TaskPriority]) -> Vec<TaskRef> {
    priorities
        .iter()
        .map(|&p| {
            std::thread::sleep(Duration::from_millis(2));
            task_in(p, TimeDelta::hours(1), TimeDelta::hours(1))
        })
        .collect()
}

/// Drain every reminder already delivered to the receiver.
pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<TaskRef>) -> Vec<TaskRef> {
    let mut fired = Vec::new();
    while let Ok(task) = rx.try_recv() {
        fired.push(task);
    }
    fired
}
