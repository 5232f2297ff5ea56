//! Priority-ordered task queue.
//!
//! A binary min-heap over [`TaskRef`]s with a side index from [`TaskId`] to
//! heap slot, so removal and re-prioritisation by identity are `O(log n)`
//! and never confuse two tasks that compare equal.
//!
//! Ordering is `(priority rank, created time)` ascending: `High` before
//! `Medium` before `Low`, and first-created first within a priority band.
//! Each entry caches its key at insertion, so mutating a queued task's
//! priority in place cannot corrupt the heap; the task simply keeps its old
//! slot until [`TaskQueue::update_priority`] or [`TaskQueue::replace`] is
//! called.

use crate::error::{Result, TaskminderError};
use crate::scheduler::tasks::{TaskId, TaskPriority, TaskRef};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueKey {
    rank: u8,
    created: DateTime<Utc>,
    /// Insertion sequence; only breaks exact ties.
    seq: u64,
}

impl Ord for QueueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.created.cmp(&other.created))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for QueueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
struct Entry {
    key: QueueKey,
    task: TaskRef,
}

/// Priority-ordered collection of tasks with identity-based removal.
#[derive(Debug, Default)]
pub struct TaskQueue {
    heap: Vec<Entry>,
    slots: HashMap<TaskId, usize>,
    next_seq: u64,
}

impl TaskQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task.
    ///
    /// A task whose id is already queued is not duplicated; its position is
    /// refreshed from its current priority instead.
    pub fn insert(&mut self, task: TaskRef) {
        let id = task.id();
        if let Some(slot) = self.slots.get(&id).copied() {
            self.remove_at(slot);
        }
        let key = self.key_for(&task);
        self.heap.push(Entry { key, task });
        let slot = self.heap.len() - 1;
        self.slots.insert(id, slot);
        self.sift_up(slot);
    }

    /// The highest-priority task, without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskminderError::EmptyQueue`] when no tasks are queued.
    pub fn peek_highest(&self) -> Result<TaskRef> {
        self.heap
            .first()
            .map(|entry| TaskRef::clone(&entry.task))
            .ok_or(TaskminderError::EmptyQueue)
    }

    /// Remove and return the highest-priority task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskminderError::EmptyQueue`] when no tasks are queued.
    pub fn pop_highest(&mut self) -> Result<TaskRef> {
        if self.heap.is_empty() {
            return Err(TaskminderError::EmptyQueue);
        }
        Ok(self.remove_at(0))
    }

    /// Remove a task by identity. Returns `true` if it was queued.
    pub fn remove(&mut self, id: TaskId) -> bool {
        match self.slots.get(&id).copied() {
            Some(slot) => {
                self.remove_at(slot);
                true
            }
            None => false,
        }
    }

    /// Change a queued task's priority and move it to its new position.
    ///
    /// The entry is taken out before the priority is written, then
    /// reinserted under the new key.
    ///
    /// # Errors
    ///
    /// Returns [`TaskminderError::NotFound`] if the task is not queued; its
    /// priority is left untouched in that case.
    pub fn update_priority(&mut self, task: &TaskRef, priority: TaskPriority) -> Result<()> {
        let slot = self
            .slots
            .get(&task.id())
            .copied()
            .ok_or(TaskminderError::NotFound(task.id()))?;
        let removed = self.remove_at(slot);
        removed.set_priority(priority);
        self.insert(removed);
        Ok(())
    }

    /// Re-seat a queued task after an external change to its fields.
    ///
    /// # Errors
    ///
    /// Returns [`TaskminderError::NotFound`] if the task is not queued.
    pub fn replace(&mut self, task: &TaskRef) -> Result<()> {
        if !self.slots.contains_key(&task.id()) {
            return Err(TaskminderError::NotFound(task.id()));
        }
        self.insert(TaskRef::clone(task));
        Ok(())
    }

    /// Returns `true` if a task with this id is queued.
    pub fn contains(&self, id: TaskId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Look up a queued task by id.
    pub fn get(&self, id: TaskId) -> Option<TaskRef> {
        self.slots
            .get(&id)
            .map(|&slot| TaskRef::clone(&self.heap[slot].task))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.slots.clear();
    }

    /// All queued tasks in unspecified order.
    ///
    /// The returned vector is a fresh copy; the heap is not touched.
    pub fn snapshot(&self) -> Vec<TaskRef> {
        self.heap
            .iter()
            .map(|entry| TaskRef::clone(&entry.task))
            .collect()
    }

    /// All queued tasks in pop order, without disturbing the heap.
    pub fn sorted(&self) -> Vec<TaskRef> {
        let mut entries: Vec<&Entry> = self.heap.iter().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
            .into_iter()
            .map(|entry| TaskRef::clone(&entry.task))
            .collect()
    }

    fn key_for(&mut self, task: &TaskRef) -> QueueKey {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        QueueKey {
            rank: task.priority().rank(),
            created: task.created_time(),
            seq,
        }
    }

    fn remove_at(&mut self, slot: usize) -> TaskRef {
        let entry = self.heap.swap_remove(slot);
        self.slots.remove(&entry.task.id());
        if slot < self.heap.len() {
            self.slots.insert(self.heap[slot].task.id(), slot);
            // The moved-in entry may belong above or below this slot.
            let slot = self.sift_up(slot);
            self.sift_down(slot);
        }
        entry.task
    }

    fn sift_up(&mut self, mut slot: usize) -> usize {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.heap[slot].key >= self.heap[parent].key {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
        slot
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut smallest = slot;
            if left < len && self.heap[left].key < self.heap[smallest].key {
                smallest = left;
            }
            if right < len && self.heap[right].key < self.heap[smallest].key {
                smallest = right;
            }
            if smallest == slot {
                return;
            }
            self.swap(slot, smallest);
            slot = smallest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        self.slots.insert(self.heap[a].task.id(), a);
        self.slots.insert(self.heap[b].task.id(), b);
    }
}
