//! Task definitions.
//!
//! Defines the [`TaskRecord`] entity shared between callers and the
//! scheduler, its [`TaskPriority`] and [`TaskStatus`] enums, and the plain
//! [`TaskSnapshot`] form used for persistence and display.

use crate::error::{Result, TaskminderError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Shared handle to a task. The scheduler and its callers hold clones of the
/// same `Arc`; identity is the task's [`TaskId`].
pub type TaskRef = Arc<TaskRecord>;

/// Opaque unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = TaskminderError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| TaskminderError::InvalidArgument(format!("bad task id '{s}': {e}")))
    }
}

/// Scheduling priority. `High` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    /// Numeric ordering key; lower ranks are served first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = TaskminderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            other => Err(TaskminderError::InvalidArgument(format!(
                "unknown priority: {other}"
            ))),
        }
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Overdue,
}

impl TaskStatus {
    /// `Completed` is absorbing; no further transitions happen from it.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Overdue => "OVERDUE",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskminderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOT_STARTED" => Ok(Self::NotStarted),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "OVERDUE" => Ok(Self::Overdue),
            other => Err(TaskminderError::InvalidArgument(format!(
                "unknown status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
struct TaskFields {
    title: String,
    description: String,
    due_time: DateTime<Utc>,
    reminder_time: DateTime<Utc>,
    priority: TaskPriority,
    status: TaskStatus,
    last_modified: DateTime<Utc>,
}

/// A tracked task.
///
/// `id` and `created_time` never change. Every other field sits behind an
/// internal lock: the scheduler may write `status` (and with it
/// `last_modified`) from a timer callback while callers hold the same
/// [`TaskRef`], so readers must treat those two fields as changing
/// asynchronously.
#[derive(Debug)]
pub struct TaskRecord {
    id: TaskId,
    created_time: DateTime<Utc>,
    fields: RwLock<TaskFields>,
}

impl TaskRecord {
    /// Create a task with status `NotStarted`, stamped with the current time.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        due_time: DateTime<Utc>,
        reminder_time: DateTime<Utc>,
        priority: TaskPriority,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            created_time: now,
            fields: RwLock::new(TaskFields {
                title: title.into(),
                description: description.into(),
                due_time,
                reminder_time,
                priority,
                status: TaskStatus::NotStarted,
                last_modified: now,
            }),
        }
    }

    /// Start building a task from optional parts.
    #[must_use]
    pub fn builder() -> TaskBuilder {
        TaskBuilder::default()
    }

    /// Rebuild a task from a persisted snapshot, keeping its identity and
    /// timestamps.
    #[must_use]
    pub fn from_snapshot(snapshot: TaskSnapshot) -> Self {
        Self {
            id: snapshot.id,
            created_time: snapshot.created_time,
            fields: RwLock::new(TaskFields {
                title: snapshot.title,
                description: snapshot.description,
                due_time: snapshot.due_time,
                reminder_time: snapshot.reminder_time,
                priority: snapshot.priority,
                status: snapshot.status,
                last_modified: snapshot.last_modified_time,
            }),
        }
    }

    /// Wrap into a shared [`TaskRef`].
    #[must_use]
    pub fn into_ref(self) -> TaskRef {
        Arc::new(self)
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn created_time(&self) -> DateTime<Utc> {
        self.created_time
    }

    pub fn title(&self) -> String {
        self.read().title.clone()
    }

    pub fn description(&self) -> String {
        self.read().description.clone()
    }

    pub fn due_time(&self) -> DateTime<Utc> {
        self.read().due_time
    }

    pub fn reminder_time(&self) -> DateTime<Utc> {
        self.read().reminder_time
    }

    pub fn priority(&self) -> TaskPriority {
        self.read().priority
    }

    pub fn status(&self) -> TaskStatus {
        self.read().status
    }

    pub fn last_modified_time(&self) -> DateTime<Utc> {
        self.read().last_modified
    }

    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.modify(|f| f.title = title);
    }

    pub fn set_description(&self, description: impl Into<String>) {
        let description = description.into();
        self.modify(|f| f.description = description);
    }

    pub fn set_due_time(&self, due_time: DateTime<Utc>) {
        self.modify(|f| f.due_time = due_time);
    }

    pub fn set_reminder_time(&self, reminder_time: DateTime<Utc>) {
        self.modify(|f| f.reminder_time = reminder_time);
    }

    /// Change the priority.
    ///
    /// A task already sitting in a [`TaskQueue`](super::queue::TaskQueue)
    /// keeps its old position until the queue is told via
    /// `update_priority` or `replace`.
    pub fn set_priority(&self, priority: TaskPriority) {
        self.modify(|f| f.priority = priority);
    }

    /// Change the status. `Completed` is terminal: moving a completed task
    /// to any other status is refused and returns `false`.
    pub fn set_status(&self, status: TaskStatus) -> bool {
        let mut fields = self.write();
        if fields.status.is_terminal() && fields.status != status {
            return false;
        }
        fields.status = status;
        fields.last_modified = Utc::now();
        true
    }

    /// Set `status` to `Overdue` when `now` is past the due time and the
    /// task has not been completed. Returns `true` if the status changed.
    pub(crate) fn mark_overdue_if_due(&self, now: DateTime<Utc>) -> bool {
        let mut fields = self.write();
        let eligible = matches!(fields.status, TaskStatus::NotStarted | TaskStatus::InProgress);
        if eligible && now > fields.due_time {
            fields.status = TaskStatus::Overdue;
            fields.last_modified = Utc::now();
            return true;
        }
        false
    }

    /// Copy every field into a plain [`TaskSnapshot`].
    #[must_use]
    pub fn snapshot(&self) -> TaskSnapshot {
        let fields = self.read();
        TaskSnapshot {
            id: self.id,
            title: fields.title.clone(),
            description: fields.description.clone(),
            due_time: fields.due_time,
            reminder_time: fields.reminder_time,
            priority: fields.priority,
            status: fields.status,
            created_time: self.created_time,
            last_modified_time: fields.last_modified,
        }
    }

    fn modify(&self, apply: impl FnOnce(&mut TaskFields)) {
        let mut fields = self.write();
        apply(&mut fields);
        fields.last_modified = Utc::now();
    }

    fn read(&self) -> RwLockReadGuard<'_, TaskFields> {
        self.fields.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TaskFields> {
        self.fields.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Display for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.read();
        write!(
            f,
            "[{}] {} (due {}, remind {}, {})",
            fields.priority,
            fields.title,
            fields.due_time.format("%Y-%m-%d %H:%M"),
            fields.reminder_time.format("%Y-%m-%d %H:%M"),
            fields.status,
        )
    }
}

/// Plain copy of a task's fields, used by stores and for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub due_time: DateTime<Utc>,
    pub reminder_time: DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub created_time: DateTime<Utc>,
    pub last_modified_time: DateTime<Utc>,
}

/// Builder that validates required task fields.
#[derive(Debug, Clone, Default)]
pub struct TaskBuilder {
    title: Option<String>,
    description: Option<String>,
    due_time: Option<DateTime<Utc>>,
    reminder_time: Option<DateTime<Utc>>,
    priority: Option<TaskPriority>,
}

impl TaskBuilder {
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn due_time(mut self, due_time: DateTime<Utc>) -> Self {
        self.due_time = Some(due_time);
        self
    }

    #[must_use]
    pub fn reminder_time(mut self, reminder_time: DateTime<Utc>) -> Self {
        self.reminder_time = Some(reminder_time);
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Build the task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskminderError::InvalidArgument`] naming the first missing
    /// field.
    pub fn build(self) -> Result<TaskRecord> {
        Ok(TaskRecord::new(
            required(self.title, "title")?,
            required(self.description, "description")?,
            required(self.due_time, "due time")?,
            required(self.reminder_time, "reminder time")?,
            required(self.priority, "priority")?,
        ))
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| TaskminderError::InvalidArgument(format!("{field} is required")))
}
