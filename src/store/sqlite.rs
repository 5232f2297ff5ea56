//! SQLite-backed task repository.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::schema::{apply_schema, read_schema_version};
use super::{StoreError, TaskRepository};
use crate::scheduler::tasks::{TaskId, TaskRecord, TaskRef, TaskSnapshot};

const SELECT_COLUMNS: &str = "SELECT id, title, description, due_time, reminder_time, priority, \
     status, created_time, last_modified_time FROM tasks";

/// SQLite-backed task repository.
///
/// Thread-safe via an internal `Mutex<Connection>`; all statements are
/// serialized through it.
pub struct SqliteTaskStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Open (or create) the database at `path`, creating parent directories.
    ///
    /// Applies the schema if the database is new.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        debug!(path = %path.display(), "opened task store");
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
        })
    }

    /// Database file, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the current schema version from the database.
    pub fn schema_version(&self) -> Result<Option<u32>, StoreError> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }
}

impl TaskRepository for SqliteTaskStore {
    fn load_all(&self) -> Result<Vec<TaskRef>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY created_time ASC"))?;
        let rows = stmt.query_map([], row_to_raw)?;

        let mut tasks = Vec::new();
        for r in rows {
            let snapshot = r?.into_snapshot()?;
            tasks.push(TaskRecord::from_snapshot(snapshot).into_ref());
        }
        debug!(count = tasks.len(), "loaded tasks");
        Ok(tasks)
    }

    fn save(&self, task: &TaskRecord) -> Result<(), StoreError> {
        let s = task.snapshot();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (id, title, description, due_time, reminder_time, priority, \
             status, created_time, last_modified_time) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                s.id.to_string(),
                s.title,
                s.description,
                format_time(s.due_time),
                format_time(s.reminder_time),
                s.priority.as_str(),
                s.status.as_str(),
                format_time(s.created_time),
                format_time(s.last_modified_time),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::AlreadyExists(s.id.to_string())
            }
            other => StoreError::Sqlite(other),
        })?;
        Ok(())
    }

    fn update(&self, task: &TaskRecord) -> Result<(), StoreError> {
        let s = task.snapshot();
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE tasks SET title = ?2, description = ?3, due_time = ?4, reminder_time = ?5, \
             priority = ?6, status = ?7, last_modified_time = ?8 WHERE id = ?1",
            params![
                s.id.to_string(),
                s.title,
                s.description,
                format_time(s.due_time),
                format_time(s.reminder_time),
                s.priority.as_str(),
                s.status.as_str(),
                format_time(s.last_modified_time),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(s.id.to_string()));
        }
        Ok(())
    }

    fn delete(&self, id: TaskId) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn get_by_id(&self, id: TaskId) -> Result<TaskRef, StoreError> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id.to_string()],
                row_to_raw,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(TaskRecord::from_snapshot(raw.into_snapshot()?).into_ref())
    }
}

// ---------------------------------------------------------------------------
// Row conversion helpers
// ---------------------------------------------------------------------------

/// Column values as stored, before parsing.
struct RawTaskRow {
    id: String,
    title: String,
    description: String,
    due_time: String,
    reminder_time: String,
    priority: String,
    status: String,
    created_time: String,
    last_modified_time: String,
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTaskRow> {
    Ok(RawTaskRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        due_time: row.get(3)?,
        reminder_time: row.get(4)?,
        priority: row.get(5)?,
        status: row.get(6)?,
        created_time: row.get(7)?,
        last_modified_time: row.get(8)?,
    })
}

impl RawTaskRow {
    fn into_snapshot(self) -> Result<TaskSnapshot, StoreError> {
        let corrupt = |field: &str, value: &str| {
            StoreError::Corrupt(format!("task {}: bad {field} {value:?}", self.id))
        };
        Ok(TaskSnapshot {
            id: self.id.parse().map_err(|_| corrupt("id", &self.id))?,
            due_time: parse_time(&self.due_time).ok_or_else(|| corrupt("due_time", &self.due_time))?,
            reminder_time: parse_time(&self.reminder_time)
                .ok_or_else(|| corrupt("reminder_time", &self.reminder_time))?,
            priority: self
                .priority
                .parse()
                .map_err(|_| corrupt("priority", &self.priority))?,
            status: self
                .status
                .parse()
                .map_err(|_| corrupt("status", &self.status))?,
            created_time: parse_time(&self.created_time)
                .ok_or_else(|| corrupt("created_time", &self.created_time))?,
            last_modified_time: parse_time(&self.last_modified_time)
                .ok_or_else(|| corrupt("last_modified_time", &self.last_modified_time))?,
            title: self.title.clone(),
            description: self.description.clone(),
        })
    }
}

/// Fixed-width RFC 3339 so that text order matches time order.
fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
