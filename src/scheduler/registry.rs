//! Reminder handle registry.
//!
//! Maps a [`TaskId`] to its single outstanding reminder timer. Each handle
//! carries a generation number so a timer that fires after being replaced
//! or cancelled can tell that its entry is gone.

use crate::scheduler::tasks::TaskId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Cancelable token for one armed, not-yet-fired reminder timer.
#[derive(Debug)]
pub struct ReminderHandle {
    generation: u64,
    fire_at: DateTime<Utc>,
    cancel: CancellationToken,
}

impl ReminderHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wall-clock instant the timer was armed for.
    pub fn fire_at(&self) -> DateTime<Utc> {
        self.fire_at
    }

    fn cancel(self) {
        self.cancel.cancel();
    }
}

/// At most one outstanding reminder per task.
#[derive(Debug, Default)]
pub struct ReminderRegistry {
    handles: HashMap<TaskId, ReminderHandle>,
    next_generation: u64,
}

impl ReminderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a timer for `id`, cancelling any timer it replaces.
    ///
    /// Returns the generation the timer must present when it fires.
    pub fn register(
        &mut self,
        id: TaskId,
        fire_at: DateTime<Utc>,
        cancel: CancellationToken,
    ) -> u64 {
        self.next_generation = self.next_generation.wrapping_add(1);
        let generation = self.next_generation;
        let handle = ReminderHandle {
            generation,
            fire_at,
            cancel,
        };
        if let Some(previous) = self.handles.insert(id, handle) {
            previous.cancel();
        }
        generation
    }

    /// Cancel and drop the timer for `id`. Returns `false` if none was armed.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        match self.handles.remove(&id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Consume the entry for a firing timer.
    ///
    /// Returns `false` when the entry was cancelled or replaced by a newer
    /// timer, in which case the firing is stale and must be ignored.
    pub fn take_if_current(&mut self, id: TaskId, generation: u64) -> bool {
        let current = self
            .handles
            .get(&id)
            .is_some_and(|handle| handle.generation == generation);
        if current {
            self.handles.remove(&id);
        }
        current
    }

    /// Cancel every outstanding timer. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.handles.len();
        for (_, handle) in self.handles.drain() {
            handle.cancel();
        }
        count
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.handles.contains_key(&id)
    }

    pub fn get(&self, id: TaskId) -> Option<&ReminderHandle> {
        self.handles.get(&id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
