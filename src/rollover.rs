//! Rollover of unfinished work onto the current period.
//!
//! Both flavours are additive: they return new tasks with fresh identities and
//! leave the originals where they were. The caller appends the result to the
//! store.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::fields::Status;
use crate::period;
use crate::task::{Schedule, Task, TaskId};

/// Copy of `task` under a fresh identity created at `now`.
fn successor(task: &Task, schedule: Schedule, now: DateTime<Utc>) -> Task {
    Task {
        id: TaskId::new(),
        schedule,
        created_at: now,
        ..task.clone()
    }
}

/// Whether any unfinished task is scheduled before `today`.
pub fn has_overdue(tasks: &[Task], today: NaiveDate) -> bool {
    tasks.iter().any(|t| is_overdue(t, today))
}

fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    !task.status.is_completed() && task.date() < today
}

/// Copy every unfinished task scheduled before the start of `now`'s day onto
/// that day. Status, priority and the rest of the record carry over.
pub fn rollover_overdue<Tz: TimeZone>(tasks: &[Task], now: &DateTime<Tz>) -> Vec<Task> {
    let today = now.date_naive();
    let created = now.with_timezone(&Utc);
    tasks
        .iter()
        .filter(|t| is_overdue(t, today))
        .map(|t| successor(t, t.schedule.on(today), created))
        .collect()
}

/// Copy every unfinished task of the week containing `week` into the following
/// week as a fresh to-do, and return the new tasks with the next week's Monday.
pub fn roll_forward_week<Tz: TimeZone>(
    tasks: &[Task],
    week: NaiveDate,
    now: &DateTime<Tz>,
) -> (Vec<Task>, NaiveDate) {
    let current = period::week_start(week);
    let next = current + Duration::weeks(1);
    let created = now.with_timezone(&Utc);
    let rolled = tasks
        .iter()
        .filter(|t| !t.status.is_completed() && t.schedule.week_start() == current)
        .map(|t| Task {
            status: Status::Todo,
            completed_at: None,
            ..successor(t, t.schedule.shifted_weeks(1), created)
        })
        .collect();
    (rolled, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TaskStore;
    use crate::fields::{PlannerKind, Priority};
    use crate::storage::MemoryStorage;
    use crate::task::{TaskDraft, TaskPatch};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()
    }

    fn earlier() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap()
    }

    fn task(title: &str, schedule: Schedule, status: Status) -> Task {
        let draft = TaskDraft::new(title, schedule).priority(Priority::High);
        let mut t = Task::from_draft(draft, earlier());
        t.apply(TaskPatch::status(status), earlier());
        t
    }

    #[test]
    fn test_rollover_copies_only_unfinished_past_tasks() {
        let yesterday = d(2024, 1, 9);
        let tasks = vec![
            task("open", Schedule::dated(yesterday), Status::Todo),
            task("done", Schedule::dated(yesterday), Status::Completed),
        ];
        let before = tasks.clone();

        let rolled = rollover_overdue(&tasks, &now());
        assert_eq!(rolled.len(), 1);
        let copy = &rolled[0];
        assert_eq!(copy.title, "open");
        assert_eq!(copy.date(), d(2024, 1, 10));
        assert_ne!(copy.id, tasks[0].id);
        assert_eq!(copy.created_at, now());
        assert_eq!(copy.priority, Priority::High);
        assert_eq!(tasks, before);
    }

    #[test]
    fn test_rollover_ignores_today_and_future() {
        let tasks = vec![
            task("today", Schedule::dated(d(2024, 1, 10)), Status::Todo),
            task("later", Schedule::dated(d(2024, 1, 20)), Status::InProgress),
        ];
        assert!(rollover_overdue(&tasks, &now()).is_empty());
        assert!(!has_overdue(&tasks, d(2024, 1, 10)));
    }

    #[test]
    fn test_rollover_keeps_in_progress_status() {
        let tasks = vec![task("doing", Schedule::dated(d(2024, 1, 1)), Status::InProgress)];
        let rolled = rollover_overdue(&tasks, &now());
        assert_eq!(rolled[0].status, Status::InProgress);
        assert!(has_overdue(&tasks, d(2024, 1, 10)));
    }

    #[test]
    fn test_rollover_rekeys_weekly_tasks_onto_today() {
        let tasks = vec![task("weekly", Schedule::weekly(d(2024, 1, 1), 4), Status::Todo)];
        let rolled = rollover_overdue(&tasks, &now());
        assert_eq!(rolled[0].schedule, Schedule::weekly(d(2024, 1, 8), 2));
    }

    #[test]
    fn test_roll_forward_week() {
        let week = d(2024, 1, 8);
        let tasks = vec![
            task("todo", Schedule::weekly(week, 0), Status::Todo),
            task("doing", Schedule::weekly(week, 3), Status::InProgress),
            task("done", Schedule::weekly(week, 4), Status::Completed),
            task("other week", Schedule::weekly(d(2024, 1, 1), 2), Status::Todo),
        ];

        let (rolled, next) = roll_forward_week(&tasks, d(2024, 1, 11), &now());
        assert_eq!(next, d(2024, 1, 15));
        assert_eq!(rolled.len(), 2);
        assert_eq!(rolled[0].schedule, Schedule::weekly(d(2024, 1, 15), 0));
        assert_eq!(rolled[1].schedule, Schedule::weekly(d(2024, 1, 15), 3));
        assert!(rolled.iter().all(|t| t.status == Status::Todo && t.completed_at.is_none()));
        assert!(rolled.iter().all(|t| t.created_at == now()));
        assert!(rolled.iter().all(|r| tasks.iter().all(|t| t.id != r.id)));
    }

    #[test]
    fn test_rollover_through_store_is_additive() {
        let fixed = now();
        let mut store =
            TaskStore::open(MemoryStorage::new(), PlannerKind::Smart).with_clock(move || fixed);
        store.create(TaskDraft::new("stale", Schedule::dated(d(2024, 1, 9)))).unwrap();
        store
            .create(
                TaskDraft::new("finished", Schedule::dated(d(2024, 1, 9)))
                    .status(Status::Completed),
            )
            .unwrap();

        let rolled = rollover_overdue(store.list(), &store.now());
        assert_eq!(store.append(rolled).unwrap(), 1);
        assert_eq!(store.list().len(), 3);
        assert_eq!(store.list()[0].date(), d(2024, 1, 9));
        assert_eq!(store.list()[2].date(), d(2024, 1, 10));
        assert_eq!(store.list()[2].title, "stale");
    }
}
