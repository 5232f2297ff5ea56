//! Reminder scheduler.
//!
//! [`ReminderScheduler`] owns the [`TaskQueue`] and the [`ReminderRegistry`]
//! behind a single mutex. Caller operations and timer callbacks both go
//! through that lock, so a queue removal can never interleave with a
//! registry update or with the status check a firing timer performs.
//!
//! Each armed reminder is a tokio task that sleeps until the reminder time
//! and then calls back into the scheduler. The lock is never held across an
//! `.await` or while the notifier runs.

use crate::config::SchedulerConfig;
use crate::error::{Result, TaskminderError};
use crate::scheduler::notifier::ReminderNotifier;
use crate::scheduler::queue::TaskQueue;
use crate::scheduler::registry::ReminderRegistry;
use crate::scheduler::tasks::{TaskId, TaskPriority, TaskRef, TaskStatus};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// What happened to a task's reminder when it was (re)scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderArming {
    /// A one-shot timer will fire at this instant.
    Armed(DateTime<Utc>),
    /// The reminder time was not in the future, so no timer was armed. The
    /// task will never be reminded (nor marked overdue) unless it is
    /// rescheduled.
    Skipped,
}

impl ReminderArming {
    pub fn is_armed(self) -> bool {
        matches!(self, Self::Armed(_))
    }
}

/// Outcome of [`ReminderScheduler::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownReport {
    /// Pending reminders cancelled before they fired.
    pub cancelled_reminders: usize,
    /// `true` when in-flight callbacks outlived the grace period.
    pub forced: bool,
}

struct SchedulerState {
    queue: TaskQueue,
    reminders: ReminderRegistry,
    accepting: bool,
}

struct Shared {
    state: Mutex<SchedulerState>,
    notifier: Arc<dyn ReminderNotifier>,
    runtime: Handle,
    timers: TaskTracker,
    root: CancellationToken,
    config: SchedulerConfig,
}

/// Priority queue of tasks plus one-shot reminder timers.
pub struct ReminderScheduler {
    shared: Arc<Shared>,
}

impl ReminderScheduler {
    /// Create a scheduler that reports reminders to `notifier`.
    ///
    /// Timers run on the tokio runtime that is current when this is called.
    ///
    /// # Errors
    ///
    /// Returns [`TaskminderError::Runtime`] when called outside a tokio
    /// runtime.
    pub fn new(notifier: impl ReminderNotifier + 'static, config: SchedulerConfig) -> Result<Self> {
        Self::with_shared_notifier(Arc::new(notifier), config)
    }

    /// Like [`new`](Self::new), for a notifier that is already shared.
    pub fn with_shared_notifier(
        notifier: Arc<dyn ReminderNotifier>,
        config: SchedulerConfig,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            TaskminderError::Runtime(format!("reminder scheduler needs a tokio runtime: {e}"))
        })?;
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SchedulerState {
                    queue: TaskQueue::new(),
                    reminders: ReminderRegistry::new(),
                    accepting: true,
                }),
                notifier,
                runtime,
                timers: TaskTracker::new(),
                root: CancellationToken::new(),
                config,
            }),
        })
    }

    /// Queue a task and arm its reminder if the reminder time is still ahead.
    ///
    /// # Errors
    ///
    /// Returns [`TaskminderError::RejectedScheduling`] after [`shutdown`](Self::shutdown).
    pub fn schedule_task(&self, task: TaskRef) -> Result<ReminderArming> {
        let mut state = self.shared.lock_state();
        ensure_accepting(&state)?;
        state.queue.insert(TaskRef::clone(&task));
        Ok(self.shared.arm(&mut state, &task))
    }

    /// Seed the scheduler from persisted tasks, skipping completed ones.
    ///
    /// Returns how many tasks were queued.
    pub fn schedule_all(&self, tasks: impl IntoIterator<Item = TaskRef>) -> Result<usize> {
        let mut state = self.shared.lock_state();
        ensure_accepting(&state)?;
        let mut queued = 0;
        for task in tasks {
            if task.status().is_terminal() {
                continue;
            }
            state.queue.insert(TaskRef::clone(&task));
            self.shared.arm(&mut state, &task);
            queued += 1;
        }
        info!(queued, "seeded scheduler");
        Ok(queued)
    }

    /// Cancel the task's pending reminder. Returns `false` if none was armed.
    ///
    /// A timer that has already started firing is not stopped; its callback
    /// re-checks the task status instead.
    pub fn cancel_reminder(&self, task: &TaskRef) -> bool {
        let cancelled = self.shared.lock_state().reminders.cancel(task.id());
        if cancelled {
            debug!(task_id = %task.id(), "reminder cancelled");
        }
        cancelled
    }

    /// Move the task's reminder to `reminder_time`.
    ///
    /// The queue position is unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`TaskminderError::RejectedScheduling`] after shutdown; the
    /// task is left untouched in that case.
    pub fn reschedule_task(
        &self,
        task: &TaskRef,
        reminder_time: DateTime<Utc>,
    ) -> Result<ReminderArming> {
        let mut state = self.shared.lock_state();
        ensure_accepting(&state)?;
        state.reminders.cancel(task.id());
        task.set_reminder_time(reminder_time);
        Ok(self.shared.arm(&mut state, task))
    }

    /// Mark the task completed, cancel its reminder, and drop it from the
    /// queue. Safe to call repeatedly or on a task with no reminder.
    pub fn complete_task(&self, task: &TaskRef) {
        let mut state = self.shared.lock_state();
        if task.status() != TaskStatus::Completed {
            task.set_status(TaskStatus::Completed);
        }
        state.reminders.cancel(task.id());
        let removed = state.queue.remove(task.id());
        debug!(task_id = %task.id(), removed, "task completed");
    }

    /// Cancel the task's reminder and drop it from the queue without
    /// changing its status. Returns `true` if it was queued.
    pub fn remove_task(&self, task: &TaskRef) -> bool {
        let mut state = self.shared.lock_state();
        state.reminders.cancel(task.id());
        state.queue.remove(task.id())
    }

    /// Re-seat a queued task after its fields were edited.
    ///
    /// # Errors
    ///
    /// Returns [`TaskminderError::NotFound`] if the task is not queued.
    pub fn refresh_task(&self, task: &TaskRef) -> Result<()> {
        self.shared.lock_state().queue.replace(task)
    }

    /// Change a queued task's priority.
    ///
    /// # Errors
    ///
    /// Returns [`TaskminderError::NotFound`] if the task is not queued.
    pub fn update_priority(&self, task: &TaskRef, priority: TaskPriority) -> Result<()> {
        self.shared.lock_state().queue.update_priority(task, priority)
    }

    /// The highest-priority queued task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskminderError::EmptyQueue`] when nothing is queued.
    pub fn get_next_pending_task(&self) -> Result<TaskRef> {
        self.shared.lock_state().queue.peek_highest()
    }

    /// Look up a queued task by id.
    pub fn find(&self, id: TaskId) -> Option<TaskRef> {
        self.shared.lock_state().queue.get(id)
    }

    /// Queued tasks in priority order.
    pub fn pending_tasks(&self) -> Vec<TaskRef> {
        self.shared.lock_state().queue.sorted()
    }

    pub fn pending_count(&self) -> usize {
        self.shared.lock_state().queue.len()
    }

    /// Returns `true` if a reminder timer is armed and has not fired yet.
    pub fn has_reminder(&self, id: TaskId) -> bool {
        self.shared.lock_state().reminders.contains(id)
    }

    pub fn is_shut_down(&self) -> bool {
        !self.shared.lock_state().accepting
    }

    /// Stop accepting reminders, cancel pending ones, and wait for callbacks
    /// already running.
    ///
    /// Waits at most the configured grace period; anything still running
    /// after that is cancelled at its next await point. Calling this again
    /// is harmless.
    pub async fn shutdown(&self) -> ShutdownReport {
        let cancelled_reminders = {
            let mut state = self.shared.lock_state();
            state.accepting = false;
            state.reminders.cancel_all()
        };
        self.shared.timers.close();

        let grace = self.shared.config.shutdown_grace();
        let forced = tokio::time::timeout(grace, self.shared.timers.wait())
            .await
            .is_err();
        if forced {
            warn!(
                grace_secs = grace.as_secs(),
                in_flight = self.shared.timers.len(),
                "reminder callbacks outlived shutdown grace period, cancelling"
            );
            self.shared.root.cancel();
        }

        info!(cancelled_reminders, forced, "reminder scheduler shut down");
        ShutdownReport {
            cancelled_reminders,
            forced,
        }
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.shared.root.cancel();
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Arm a one-shot timer for `task` if its reminder time is in the future.
    fn arm(self: &Arc<Self>, state: &mut SchedulerState, task: &TaskRef) -> ReminderArming {
        let id = task.id();
        let fire_at = task.reminder_time();
        let remaining = fire_at - Utc::now();
        if remaining <= TimeDelta::zero() {
            // A reminder time already passed is never delivered.
            state.reminders.cancel(id);
            debug!(task_id = %id, %fire_at, "reminder time not in the future, no timer armed");
            return ReminderArming::Skipped;
        }
        let delay = remaining.to_std().unwrap_or_default();

        let token = self.root.child_token();
        let generation = state.reminders.register(id, fire_at, token.clone());

        let shared = Arc::clone(self);
        let task = TaskRef::clone(task);
        self.timers.spawn_on(
            async move {
                tokio::select! {
                    () = token.cancelled() => {}
                    () = tokio::time::sleep(delay) => shared.fire(&task, generation),
                }
            },
            &self.runtime,
        );

        debug!(task_id = %id, %fire_at, generation, "reminder armed");
        ReminderArming::Armed(fire_at)
    }

    /// Timer callback: notify unless completed, then evaluate overdue status.
    fn fire(&self, task: &TaskRef, generation: u64) {
        if !self.lock_state().reminders.take_if_current(task.id(), generation) {
            debug!(task_id = %task.id(), "stale reminder ignored");
            return;
        }

        if task.status() == TaskStatus::Completed {
            debug!(task_id = %task.id(), "task already completed, reminder suppressed");
            return;
        }

        self.notifier.on_reminder(task);

        // Serialise the status write against complete_task.
        let _state = self.lock_state();
        if task.mark_overdue_if_due(Utc::now()) {
            info!(task_id = %task.id(), due = %task.due_time(), "task is overdue");
        }
    }
}

fn ensure_accepting(state: &SchedulerState) -> Result<()> {
    if state.accepting {
        Ok(())
    } else {
        Err(TaskminderError::RejectedScheduling(
            "scheduler has been shut down".to_owned(),
        ))
    }
}
