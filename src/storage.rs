//! Persistence port for the task store.
//!
//! The store talks to a small key-value interface. Each planner uses two keys:
//! one holding the JSON task array and one holding the last selected view mode.
//! [`FileStorage`] keeps one file per key under a data directory. Tests use
//! `MemoryStorage`, which keeps everything in a map.

#[cfg(test)]
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::PersistenceError;
use crate::fields::PlannerKind;
use crate::task::Task;

/// Key-value backend the store is constructed with.
pub trait Storage {
    /// Read a key. A key that was never written is `Ok(None)`.
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Overwrite a key.
    fn save(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// Storage key names for one planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageKeys {
    pub tasks: &'static str,
    pub view: &'static str,
}

impl StorageKeys {
    pub fn for_planner(kind: PlannerKind) -> Self {
        match kind {
            PlannerKind::Smart => StorageKeys {
                tasks: "smart-task-manager-tasks",
                view: "smart-task-manager-view",
            },
            PlannerKind::Weekly => StorageKeys {
                tasks: "weekly-todo-tasks",
                view: "weekly-todo-view",
            },
        }
    }
}

/// Serialize the whole collection.
pub fn encode_tasks(tasks: &[Task]) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string_pretty(tasks)?)
}

/// Revive a snapshot. Malformed input yields an empty collection.
pub fn decode_tasks(raw: &str) -> Vec<Task> {
    match serde_json::from_str::<Vec<Task>>(raw) {
        Ok(tasks) => tasks
            .into_iter()
            .map(|mut t| {
                t.schedule = t.schedule.normalized();
                t
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, "task snapshot is malformed, starting fresh");
            Vec::new()
        }
    }
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| PersistenceError::Io { key: key.to_string(), source })
    }

    /// Atomic-ish write via temp file + rename.
    fn save(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let io_err = |source| PersistenceError::Io { key: key.to_string(), source };
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp).map_err(io_err)?;
        f.write_all(value.as_bytes()).map_err(io_err)?;
        f.flush().map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }
}

/// In-process storage with save counting and failure injection.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    saves: usize,
    fail_saves: bool,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key.
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    /// Make every following save fail.
    pub fn fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

#[cfg(test)]
impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        if self.fail_saves {
            return Err(PersistenceError::Injected(key.to_string()));
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Priority, Status};
    use crate::task::{Schedule, TaskDraft};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample_tasks() -> Vec<Task> {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 15).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut done = Task::from_draft(
            TaskDraft::new("Ship", Schedule::dated(day)).priority(Priority::High),
            now,
        );
        done.apply(crate::task::TaskPatch::status(Status::Completed), now);
        let weekly = Task::from_draft(
            TaskDraft::new("Review", Schedule::weekly(day, 4)).deadline(now),
            now,
        );
        vec![done, weekly]
    }

    #[test]
    fn test_snapshot_round_trip_preserves_values() {
        let tasks = sample_tasks();
        let raw = encode_tasks(&tasks).unwrap();
        let back = decode_tasks(&raw);
        assert_eq!(back.len(), tasks.len());
        for (a, b) in tasks.iter().zip(&back) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.title, b.title);
            assert_eq!(a.status, b.status);
            assert_eq!(a.priority, b.priority);
            assert_eq!(a.schedule, b.schedule);
            assert_eq!(a.created_at, b.created_at);
            assert_eq!(a.completed_at, b.completed_at);
            assert_eq!(a.deadline, b.deadline);
        }
        assert_eq!(back, tasks);
    }

    #[test]
    fn test_decode_malformed_is_empty() {
        assert!(decode_tasks("not json").is_empty());
        assert!(decode_tasks("{\"tasks\": 3}").is_empty());
        assert!(decode_tasks("[]").is_empty());
    }

    #[test]
    fn test_keys_differ_per_planner() {
        let smart = StorageKeys::for_planner(PlannerKind::Smart);
        let weekly = StorageKeys::for_planner(PlannerKind::Weekly);
        assert_eq!(smart.tasks, "smart-task-manager-tasks");
        assert_eq!(weekly.tasks, "weekly-todo-tasks");
        assert_ne!(smart.view, weekly.view);
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path());
        assert_eq!(storage.load("k").unwrap(), None);
        storage.save("k", "[1,2]").unwrap();
        assert_eq!(storage.load("k").unwrap().as_deref(), Some("[1,2]"));
        storage.save("k", "[]").unwrap();
        assert_eq!(storage.load("k").unwrap().as_deref(), Some("[]"));
        assert!(!storage.path_for("k").with_extension("json.tmp").exists());
    }

    #[test]
    fn test_memory_storage_injected_failure() {
        let mut storage = MemoryStorage::new();
        storage.save("k", "a").unwrap();
        storage.fail_saves(true);
        assert!(matches!(storage.save("k", "b"), Err(PersistenceError::Injected(_))));
        assert_eq!(storage.get("k"), Some("a"));
        assert_eq!(storage.save_count(), 1);
    }
}
