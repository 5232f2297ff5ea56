//! Task service: persistence sequenced around the scheduling core.
//!
//! The scheduler never calls the repository itself. [`TaskService`] is the
//! caller-side glue that keeps both in step: every mutation is applied to the
//! live [`TaskRef`] held by the scheduler and then written through to the
//! repository.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{Result, TaskminderError};
use crate::scheduler::{
    ReminderArming, ReminderScheduler, ShutdownReport, TaskId, TaskPriority, TaskRecord, TaskRef,
    TaskStatus,
};
use crate::store::{StoreError, TaskRepository};

/// Field changes for [`TaskService::edit_task`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_time: Option<DateTime<Utc>>,
    pub reminder_time: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_time.is_none()
            && self.reminder_time.is_none()
            && self.priority.is_none()
    }
}

pub struct TaskService<R: TaskRepository> {
    repo: R,
    scheduler: ReminderScheduler,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: R, scheduler: ReminderScheduler) -> Self {
        Self { repo, scheduler }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    /// Seed the scheduler with every stored task that is not completed.
    ///
    /// Returns how many tasks were queued.
    pub fn load(&self) -> Result<usize> {
        let tasks = self.repo.load_all()?;
        let total = tasks.len();
        let queued = self.scheduler.schedule_all(tasks)?;
        info!(total, queued, "loaded tasks from store");
        Ok(queued)
    }

    /// Persist a new task and schedule its reminder.
    ///
    /// Nothing is written if the scheduler has shut down.
    pub fn add_task(&self, task: TaskRecord) -> Result<(TaskRef, ReminderArming)> {
        let task = task.into_ref();
        let arming = self.scheduler.schedule_task(TaskRef::clone(&task))?;
        if let Err(e) = self.repo.save(&task) {
            self.scheduler.remove_task(&task);
            return Err(e.into());
        }
        debug!(task_id = %task.id(), ?arming, "task added");
        Ok((task, arming))
    }

    /// Apply `edit` to a task, keep its queue position and reminder in step,
    /// and persist it.
    ///
    /// The change lands on the live queued instance when there is one, so
    /// the queue, the reminder timer and the store all see the same task.
    /// The reminder is moved first: if the scheduler has shut down the call
    /// fails before any field is touched.
    pub fn edit_task(&self, id: TaskId, edit: TaskEdit) -> Result<TaskRef> {
        let task = self.find(id)?;
        if edit.is_empty() {
            return Ok(task);
        }
        let queued = self.scheduler.find(id).is_some();

        if let Some(reminder_time) = edit.reminder_time {
            if queued {
                self.scheduler.reschedule_task(&task, reminder_time)?;
            } else {
                task.set_reminder_time(reminder_time);
            }
        }
        if let Some(priority) = edit.priority {
            if queued {
                self.scheduler.update_priority(&task, priority)?;
            } else {
                task.set_priority(priority);
            }
        }
        if let Some(title) = edit.title {
            task.set_title(title);
        }
        if let Some(description) = edit.description {
            task.set_description(description);
        }
        if let Some(due_time) = edit.due_time {
            task.set_due_time(due_time);
        }

        self.repo.update(&task).map_err(|e| not_found(id, e))?;
        debug!(task_id = %id, "task edited");
        Ok(task)
    }

    /// Move a task from `NOT_STARTED` to `IN_PROGRESS`.
    pub fn start_task(&self, id: TaskId) -> Result<TaskRef> {
        let task = self.find(id)?;
        let status = task.status();
        if status != TaskStatus::NotStarted {
            return Err(TaskminderError::InvalidArgument(format!(
                "task {id} is {status}, only {} tasks can be started",
                TaskStatus::NotStarted
            )));
        }
        task.set_status(TaskStatus::InProgress);
        self.repo.update(&task)?;
        debug!(task_id = %id, "task started");
        Ok(task)
    }

    /// Complete a task: cancel its reminder, drop it from the queue, persist.
    pub fn complete_task(&self, id: TaskId) -> Result<TaskRef> {
        let task = self.find(id)?;
        self.scheduler.complete_task(&task);
        self.repo.update(&task)?;
        info!(task_id = %id, title = %task.title(), "task completed");
        Ok(task)
    }

    /// Remove a task from the scheduler and the store.
    pub fn delete_task(&self, id: TaskId) -> Result<()> {
        if let Some(task) = self.scheduler.find(id) {
            self.scheduler.remove_task(&task);
        }
        self.repo.delete(id).map_err(|e| not_found(id, e))?;
        info!(task_id = %id, "task deleted");
        Ok(())
    }

    /// Look a task up in the scheduler's queue, then in the store.
    pub fn find(&self, id: TaskId) -> Result<TaskRef> {
        if let Some(task) = self.scheduler.find(id) {
            return Ok(task);
        }
        self.repo.get_by_id(id).map_err(|e| not_found(id, e))
    }

    /// Every stored task, with queued tasks replaced by their live instance.
    pub fn all_tasks(&self) -> Result<Vec<TaskRef>> {
        Ok(self
            .repo
            .load_all()?
            .into_iter()
            .map(|stored| self.scheduler.find(stored.id()).unwrap_or(stored))
            .collect())
    }

    /// Persist overdue transitions made by the reminder path, which never
    /// touches the store itself.
    ///
    /// Each overdue task is re-read from the store and the transition is
    /// re-applied to the stored row, so changes made through another handle
    /// on the same store (completed, started, edited or deleted tasks) are
    /// never overwritten. Returns how many rows were written.
    pub fn sync_pending(&self) -> Result<usize> {
        let now = Utc::now();
        let mut written = 0;
        for task in self.scheduler.pending_tasks() {
            if task.status() != TaskStatus::Overdue {
                continue;
            }
            let stored = match self.repo.get_by_id(task.id()) {
                Ok(stored) => stored,
                Err(StoreError::NotFound(_)) => {
                    debug!(task_id = %task.id(), "overdue task no longer stored, skipping");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if !stored.mark_overdue_if_due(now) {
                continue;
            }
            match self.repo.update(&stored) {
                Ok(()) => written += 1,
                Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        debug!(written, "synced overdue tasks");
        Ok(written)
    }

    /// Shut the scheduler down.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.scheduler.shutdown().await
    }
}

fn not_found(id: TaskId, e: StoreError) -> TaskminderError {
    match e {
        StoreError::NotFound(_) => TaskminderError::NotFound(id),
        other => other.into(),
    }
}
