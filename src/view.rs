//! Projection of the task collection onto the displayed period.

use chrono::NaiveDate;

use crate::fields::{Status, ViewMode};
use crate::period::{self, Period};
use crate::task::{Schedule, Task};

/// Tasks that belong to the period of `mode` containing `anchor`, in input
/// order.
///
/// Day and month views compare calendar dates. The week view compares dated
/// tasks by date range and weekly tasks by their week start.
pub fn project(tasks: &[Task], anchor: NaiveDate, mode: ViewMode) -> Vec<&Task> {
    let period = Period::containing(anchor, mode);
    tasks.iter().filter(|t| in_period(t, &period)).collect()
}

fn in_period(task: &Task, period: &Period) -> bool {
    match (period.mode, task.schedule) {
        (ViewMode::Week, Schedule::Weekly { week_start, .. }) => {
            week_start == period::week_start(period.anchor)
        }
        _ => period.contains(task.date()),
    }
}

/// Tasks scheduled on one calendar day.
pub fn on_day<'a>(tasks: &[&'a Task], day: NaiveDate) -> Vec<&'a Task> {
    tasks.iter().copied().filter(|t| t.date() == day).collect()
}

/// Split tasks into board columns, one per status, keeping input order.
pub fn by_status<'a>(tasks: &[&'a Task]) -> [Vec<&'a Task>; 3] {
    let mut columns: [Vec<&Task>; 3] = Default::default();
    for &task in tasks {
        columns[task.status.column()].push(task);
    }
    columns
}

/// Completion summary of a set of tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl Progress {
    pub fn of(tasks: &[&Task]) -> Self {
        tasks.iter().fold(Progress::default(), |mut p, t| {
            p.total += 1;
            match t.status {
                Status::Todo => p.todo += 1,
                Status::InProgress => p.in_progress += 1,
                Status::Completed => p.completed += 1,
            }
            p
        })
    }

    /// Completed share rounded to the nearest whole percent; 0 when empty.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u32
    }
}
