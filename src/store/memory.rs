//! In-memory task repository.
//!
//! Stores snapshots rather than live handles so a loaded task never aliases
//! the caller's instance, matching what a real database would return.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{StoreError, TaskRepository};
use crate::scheduler::tasks::{TaskId, TaskRecord, TaskRef, TaskSnapshot};

#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    rows: Mutex<HashMap<TaskId, TaskSnapshot>>,
}

impl MemoryTaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TaskRepository for MemoryTaskStore {
    fn load_all(&self) -> Result<Vec<TaskRef>, StoreError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let mut snapshots: Vec<TaskSnapshot> = rows.values().cloned().collect();
        snapshots.sort_by_key(|s| s.created_time);
        Ok(snapshots
            .into_iter()
            .map(|s| TaskRecord::from_snapshot(s).into_ref())
            .collect())
    }

    fn save(&self, task: &TaskRecord) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let id = task.id();
        if rows.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        rows.insert(id, task.snapshot());
        Ok(())
    }

    fn update(&self, task: &TaskRecord) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        match rows.get_mut(&task.id()) {
            Some(row) => {
                *row = task.snapshot();
                Ok(())
            }
            None => Err(StoreError::NotFound(task.id().to_string())),
        }
    }

    fn delete(&self, id: TaskId) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn get_by_id(&self, id: TaskId) -> Result<TaskRef, StoreError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.get(&id)
            .cloned()
            .map(|s| TaskRecord::from_snapshot(s).into_ref())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
