//! Task store and utility functions for the planner.
//!
//! This module provides the `TaskStore`, the only owner of the task collection.
//! Every successful mutation re-serializes the whole collection to the storage
//! backend before returning. It also carries the date-input parsing and display
//! helpers shared by the CLI and the board.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::fields::*;
use crate::storage::{decode_tasks, encode_tasks, Storage, StorageKeys};
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};

/// Source of the current time.
pub type Clock = Box<dyn Fn() -> DateTime<Utc>>;

/// In-memory task collection mirrored to a storage backend.
pub struct TaskStore<S: Storage> {
    tasks: Vec<Task>,
    storage: S,
    keys: StorageKeys,
    kind: PlannerKind,
    clock: Clock,
}

impl<S: Storage> TaskStore<S> {
    /// Load the planner's snapshot. A missing, unreadable or malformed snapshot
    /// starts an empty planner.
    pub fn open(storage: S, kind: PlannerKind) -> Self {
        let keys = StorageKeys::for_planner(kind);
        let tasks = match storage.load(keys.tasks) {
            Ok(Some(raw)) => decode_tasks(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "could not read task snapshot, starting fresh");
                Vec::new()
            }
        };
        debug!(count = tasks.len(), key = keys.tasks, "loaded tasks");
        TaskStore {
            tasks,
            storage,
            keys,
            kind,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn kind(&self) -> PlannerKind {
        self.kind
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// All tasks in insertion order.
    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Create a task from a draft and persist.
    pub fn create(&mut self, draft: TaskDraft) -> Result<Task, StoreError> {
        if draft.title.trim().is_empty() {
            return Err(StoreError::Validation("title cannot be empty".into()));
        }
        draft.schedule.validate().map_err(StoreError::Validation)?;

        let mut task = Task::from_draft(draft, self.now());
        while self.get(task.id).is_some() {
            task.id = TaskId::new();
        }
        debug!(id = %task.id, title = %task.title, "created task");
        self.tasks.push(task.clone());
        self.persist()?;
        Ok(task)
    }

    /// Merge a patch into the task with `id` and persist. Unknown ids are a
    /// no-op and return `Ok(None)`.
    pub fn update(&mut self, id: TaskId, patch: TaskPatch) -> Result<Option<Task>, StoreError> {
        if let Some(ref title) = patch.title {
            if title.trim().is_empty() {
                return Err(StoreError::Validation("title cannot be empty".into()));
            }
        }
        if let Some(ref schedule) = patch.schedule {
            schedule.validate().map_err(StoreError::Validation)?;
        }

        let now = self.now();
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(%id, "update of unknown task ignored");
            return Ok(None);
        };
        task.apply(patch, now);
        let updated = task.clone();
        debug!(%id, status = ?updated.status, "updated task");
        self.persist()?;
        Ok(Some(updated))
    }

    /// Move a task to another board column.
    pub fn move_to(&mut self, id: TaskId, status: Status) -> Result<Option<Task>, StoreError> {
        self.update(id, TaskPatch::status(status))
    }

    /// Remove a task and persist. Unknown ids leave the collection untouched.
    pub fn delete(&mut self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let Some(idx) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(%id, "delete of unknown task ignored");
            return Ok(None);
        };
        let removed = self.tasks.remove(idx);
        debug!(%id, "deleted task");
        self.persist()?;
        Ok(Some(removed))
    }

    /// Append already-finalized tasks (rollover output) as one mutation.
    pub fn append(&mut self, tasks: Vec<Task>) -> Result<usize, StoreError> {
        if tasks.is_empty() {
            return Ok(0);
        }
        let count = tasks.len();
        for mut task in tasks {
            while self.get(task.id).is_some() {
                task.id = TaskId::new();
            }
            self.tasks.push(task);
        }
        debug!(count, "appended tasks");
        self.persist()?;
        Ok(count)
    }

    /// Resolve a full id, a unique id prefix, or a unique title (case-insensitive).
    ///
    /// Id-prefix and title matches are pooled, so a title that also reads as
    /// the prefix of another task's id is reported as ambiguous.
    pub fn resolve(&self, identifier: &str) -> Result<TaskId, StoreError> {
        let needle = identifier.trim();
        if let Some(id) = TaskId::parse(needle) {
            return self
                .get(id)
                .map(|t| t.id)
                .ok_or_else(|| StoreError::NotFound(needle.to_string()));
        }

        let lowered = needle.to_lowercase();
        if lowered.is_empty() {
            return Err(StoreError::NotFound(needle.to_string()));
        }
        let matches: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|t| {
                t.id.to_string().starts_with(&lowered) || t.title.to_lowercase() == lowered
            })
            .map(|t| t.id)
            .collect();

        match matches.len() {
            0 => Err(StoreError::NotFound(needle.to_string())),
            1 => Ok(matches[0]),
            count => Err(StoreError::Ambiguous {
                identifier: needle.to_string(),
                count,
            }),
        }
    }

    /// Last selected view mode; defaults to week.
    pub fn view_mode(&self) -> ViewMode {
        match self.storage.load(self.keys.view) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
                warn!(error = %e, "ignoring stored view mode");
                ViewMode::default()
            }),
            Ok(None) => ViewMode::default(),
            Err(e) => {
                warn!(error = %e, "could not read view mode");
                ViewMode::default()
            }
        }
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) -> Result<(), StoreError> {
        self.storage.save(self.keys.view, mode.as_str())?;
        Ok(())
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let raw = encode_tasks(&self.tasks)?;
        self.storage.save(self.keys.tasks, &raw).map_err(|e| {
            warn!(error = %e, "task snapshot not saved");
            StoreError::from(e)
        })
    }
}

/// Parse human-readable date input.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "monday", "mon", ... (this week's occurrence, today or later)
/// - "next monday", ... (the occurrence in the following week)
/// - "in 3d", "in 2w"
/// - "YYYY-MM-DD" format
pub fn parse_date_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return today.succ_opt(),
        "yesterday" => return today.pred_opt(),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let offset = if let Some(nd) = rest.strip_suffix('d') {
            nd.trim().parse::<i64>().ok().and_then(Duration::try_days)
        } else if let Some(nw) = rest.strip_suffix('w') {
            nw.trim().parse::<i64>().ok().and_then(Duration::try_weeks)
        } else {
            None
        };
        return offset.and_then(|delta| today.checked_add_signed(delta));
    }

    let (next, name) = match s.strip_prefix("next ") {
        Some(rest) => (true, rest),
        None => (false, s.as_str()),
    };
    if let Some(target) = weekday_index(name) {
        let current = today.weekday().num_days_from_monday() as i64;
        let ahead = (target - current).rem_euclid(7);
        let days = if next { ahead + 7 } else { ahead };
        return today.checked_add_signed(Duration::days(days));
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Day index (0 = Monday) for a weekday name or abbreviation.
pub fn weekday_index(name: &str) -> Option<i64> {
    const NAMES: [(&str, &str); 7] = [
        ("monday", "mon"),
        ("tuesday", "tue"),
        ("wednesday", "wed"),
        ("thursday", "thu"),
        ("friday", "fri"),
        ("saturday", "sat"),
        ("sunday", "sun"),
    ];
    let name = name.trim().to_lowercase();
    NAMES
        .iter()
        .position(|(full, short)| name == *full || name == *short)
        .map(|i| i as i64)
}

/// Today in the local timezone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Format a scheduled date relative to today ("today", "tomorrow", "in 3d", "2d ago").
pub fn format_date_relative(d: NaiveDate, today: NaiveDate) -> String {
    let delta = (d - today).num_days();
    match delta {
        0 => "today".into(),
        1 => "tomorrow".into(),
        -1 => "yesterday".into(),
        n if n > 1 => format!("in {n}d"),
        n => format!("{}d ago", -n),
    }
}

/// Format a priority for display.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::High => "High",
        Priority::Medium => "Medium",
        Priority::Low => "Low",
    }
}

/// Format a task status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Todo => "To Do",
        Status::InProgress => "In Progress",
        Status::Completed => "Completed",
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[&Task]) {
    println!(
        "{:<9} {:<12} {:<7} {:<11} {:<10} {}",
        "ID", "Status", "Pri", "Date", "When", "Title [tags]"
    );
    let today = today();
    for t in tasks {
        let tags = if t.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", t.tags.join(","))
        };
        println!(
            "{:<9} {:<12} {:<7} {:<11} {:<10} {}{}",
            t.id.short(),
            format_status(t.status),
            format_priority(t.priority),
            t.date().format("%Y-%m-%d").to_string(),
            format_date_relative(t.date(), today),
            truncate(&t.title, 48),
            tags
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use crate::storage::MemoryStorage;
    use crate::task::Schedule;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap()
    }

    fn store() -> TaskStore<MemoryStorage> {
        TaskStore::open(MemoryStorage::new(), PlannerKind::Smart).with_clock(fixed_now)
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft::new(title, Schedule::dated(d(2024, 1, 2)))
    }

    #[test]
    fn test_create_assigns_unique_ids() {
        let mut store = store();
        let mut seen = HashSet::new();
        for i in 0..50 {
            let task = store.create(draft(&format!("Task {i}"))).unwrap();
            assert!(seen.insert(task.id));
            assert_eq!(task.created_at, fixed_now());
        }
        assert_eq!(store.list().len(), 50);
        assert_eq!(store.list()[0].title, "Task 0");
        assert_eq!(store.list()[49].title, "Task 49");
    }

    #[test]
    fn test_create_rejects_blank_title() {
        let mut store = store();
        assert!(matches!(store.create(draft("   ")), Err(StoreError::Validation(_))));
        assert!(store.list().is_empty());
        assert_eq!(store.storage().save_count(), 0);
    }

    #[test]
    fn test_create_rejects_bad_day_of_week() {
        let mut store = store();
        let schedule = Schedule::Weekly { week_start: d(2024, 1, 1), day_of_week: 9 };
        let bad = TaskDraft::new("x", schedule);
        assert!(matches!(store.create(bad), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_every_mutation_persists() {
        let mut store = store();
        let task = store.create(draft("Write")).unwrap();
        assert_eq!(store.storage().save_count(), 1);
        store.update(task.id, TaskPatch::status(Status::InProgress)).unwrap();
        assert_eq!(store.storage().save_count(), 2);
        store.delete(task.id).unwrap();
        assert_eq!(store.storage().save_count(), 3);
        assert_eq!(store.storage().get("smart-task-manager-tasks"), Some("[]"));
    }

    #[test]
    fn test_status_transitions_drive_completed_at() {
        let mut store = store();
        let task = store.create(draft("Write")).unwrap();
        let done = store.move_to(task.id, Status::Completed).unwrap().unwrap();
        assert_eq!(done.completed_at, Some(fixed_now()));
        let reopened = store.move_to(task.id, Status::Todo).unwrap().unwrap();
        assert_eq!(reopened.completed_at, None);
        assert_eq!(store.get(task.id).unwrap().completed_at, None);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut store = store();
        store.create(draft("Keep")).unwrap();
        let before = store.list().to_vec();
        let res = store.update(TaskId::new(), TaskPatch::status(Status::Completed)).unwrap();
        assert!(res.is_none());
        assert_eq!(store.list(), &before[..]);
        assert_eq!(store.storage().save_count(), 1);
    }

    #[test]
    fn test_update_rejects_blank_title() {
        let mut store = store();
        let task = store.create(draft("Keep")).unwrap();
        let patch = TaskPatch { title: Some(" ".into()), ..Default::default() };
        assert!(matches!(store.update(task.id, patch), Err(StoreError::Validation(_))));
        assert_eq!(store.get(task.id).unwrap().title, "Keep");
    }

    #[test]
    fn test_delete_unknown_id_leaves_collection_unchanged() {
        let mut store = store();
        store.create(draft("A")).unwrap();
        store.create(draft("B")).unwrap();
        let before = store.list().to_vec();
        assert!(store.delete(TaskId::new()).unwrap().is_none());
        assert_eq!(store.list().len(), before.len());
        assert_eq!(store.list(), &before[..]);
    }

    #[test]
    fn test_reopen_restores_snapshot() {
        let mut store = store();
        let a = store.create(draft("A").priority(Priority::High)).unwrap();
        store.move_to(a.id, Status::Completed).unwrap();
        let storage = store.storage().clone();

        let reopened = TaskStore::open(storage, PlannerKind::Smart);
        assert_eq!(reopened.list().len(), 1);
        assert_eq!(reopened.list()[0].id, a.id);
        assert_eq!(reopened.list()[0].priority, Priority::High);
        assert_eq!(reopened.list()[0].completed_at, Some(fixed_now()));
    }

    #[test]
    fn test_malformed_snapshot_opens_empty() {
        let storage = MemoryStorage::new().with_entry("smart-task-manager-tasks", "{oops");
        let store = TaskStore::open(storage, PlannerKind::Smart);
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_planners_are_isolated() {
        let mut smart = store();
        smart.create(draft("Smart only")).unwrap();
        let weekly = TaskStore::open(smart.storage().clone(), PlannerKind::Weekly);
        assert!(weekly.list().is_empty());
    }

    #[test]
    fn test_failed_save_keeps_memory_state() {
        let mut storage = MemoryStorage::new();
        storage.fail_saves(true);
        let mut store = TaskStore::open(storage, PlannerKind::Smart).with_clock(fixed_now);
        let err = store.create(draft("Unsaved")).unwrap_err();
        assert!(matches!(err, StoreError::Persistence(PersistenceError::Injected(_))));
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0].title, "Unsaved");
    }

    #[test]
    fn test_append_is_one_persist() {
        let mut store = store();
        let a = store.create(draft("A")).unwrap();
        let copies = vec![Task { id: TaskId::new(), ..a.clone() }, Task { id: TaskId::new(), ..a }];
        assert_eq!(store.append(copies).unwrap(), 2);
        assert_eq!(store.list().len(), 3);
        assert_eq!(store.storage().save_count(), 2);
        assert_eq!(store.append(Vec::new()).unwrap(), 0);
        assert_eq!(store.storage().save_count(), 2);
    }

    #[test]
    fn test_resolve_by_prefix_and_title() {
        let mut store = store();
        let a = store.create(draft("Groceries")).unwrap();
        store.create(draft("Laundry")).unwrap();
        assert_eq!(store.resolve(&a.id.to_string()).unwrap(), a.id);
        assert_eq!(store.resolve(&a.id.short()).unwrap(), a.id);
        assert_eq!(store.resolve("groceries").unwrap(), a.id);
        assert!(matches!(store.resolve("missing"), Err(StoreError::NotFound(_))));

        store.create(draft("Laundry")).unwrap();
        assert!(matches!(store.resolve("laundry"), Err(StoreError::Ambiguous { count: 2, .. })));
        assert!(matches!(store.resolve("  "), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_resolve_title_that_looks_like_an_id_prefix() {
        let mut store = store();
        let bed = store.create(draft("bed")).unwrap();
        let mut laundry = Task::from_draft(draft("Laundry"), fixed_now());
        laundry.id = TaskId::parse("bed00000-0000-4000-8000-000000000000").unwrap();
        store.append(vec![laundry.clone()]).unwrap();

        assert!(matches!(store.resolve("bed"), Err(StoreError::Ambiguous { count: 2, .. })));
        assert_eq!(store.resolve("bed00000").unwrap(), laundry.id);
        assert_eq!(store.resolve(&bed.id.to_string()).unwrap(), bed.id);
        store.delete(laundry.id).unwrap();
        assert_eq!(store.resolve("bed").unwrap(), bed.id);
    }

    #[test]
    fn test_view_mode_round_trip_and_default() {
        let mut store = store();
        assert_eq!(store.view_mode(), ViewMode::Week);
        store.set_view_mode(ViewMode::Month).unwrap();
        assert_eq!(store.view_mode(), ViewMode::Month);
        assert_eq!(store.storage().get("smart-task-manager-view"), Some("month"));

        let garbage = MemoryStorage::new().with_entry("smart-task-manager-view", "year");
        assert_eq!(TaskStore::open(garbage, PlannerKind::Smart).view_mode(), ViewMode::Week);
    }

    #[test]
    fn test_parse_date_input() {
        // 2024-01-03 is a Wednesday.
        let today = d(2024, 1, 3);
        assert_eq!(parse_date_input("today", today), Some(today));
        assert_eq!(parse_date_input("Tomorrow", today), Some(d(2024, 1, 4)));
        assert_eq!(parse_date_input("in 3d", today), Some(d(2024, 1, 6)));
        assert_eq!(parse_date_input("in 2w", today), Some(d(2024, 1, 17)));
        assert_eq!(parse_date_input("wed", today), Some(today));
        assert_eq!(parse_date_input("monday", today), Some(d(2024, 1, 8)));
        assert_eq!(parse_date_input("next friday", today), Some(d(2024, 1, 12)));
        assert_eq!(parse_date_input("2024-02-29", today), Some(d(2024, 2, 29)));
        assert_eq!(parse_date_input("someday", today), None);
        assert_eq!(parse_date_input("in 3x", today), None);
    }

    #[test]
    fn test_parse_date_input_out_of_range_offsets() {
        let today = d(2024, 1, 3);
        assert_eq!(parse_date_input("in 9999999999d", today), None);
        assert_eq!(parse_date_input("in 9999999999999w", today), None);
        assert_eq!(parse_date_input("in -9999999999d", today), None);
        assert_eq!(parse_date_input("tomorrow", NaiveDate::MAX), None);
    }

    #[test]
    fn test_format_date_relative() {
        let today = d(2024, 1, 3);
        assert_eq!(format_date_relative(today, today), "today");
        assert_eq!(format_date_relative(d(2024, 1, 4), today), "tomorrow");
        assert_eq!(format_date_relative(d(2024, 1, 1), today), "2d ago");
        assert_eq!(format_date_relative(d(2024, 1, 8), today), "in 5d");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer title", 6), "a lon…");
    }
}
