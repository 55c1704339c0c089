//! Task data structure and related functionality.
//!
//! This module defines the `Task` record, its scheduling key, and the draft and
//! patch types through which tasks are created and changed. Only the task store
//! builds tasks from drafts or applies patches; everything else reads.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fields::*;
use crate::period;

/// Opaque task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// A fresh random identifier.
    pub fn new() -> Self {
        TaskId(Uuid::new_v4())
    }

    /// First eight hex digits, enough to pick a task on the command line.
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(TaskId)
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Where a task sits on the calendar.
///
/// Dated tasks carry an absolute date. Weekly tasks carry the Monday of their
/// week plus a day index (0 = Monday). Both resolve to a calendar date, so every
/// view and the rollover engine work through the same accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, rename_all = "camelCase")]
pub enum Schedule {
    #[serde(rename_all = "camelCase")]
    Dated {
        #[serde(with = "iso_date")]
        date: NaiveDate,
    },
    #[serde(rename_all = "camelCase")]
    Weekly {
        #[serde(with = "iso_date")]
        week_start: NaiveDate,
        day_of_week: u8,
    },
}

impl Schedule {
    pub fn dated(date: NaiveDate) -> Self {
        Schedule::Dated { date }
    }

    /// Weekly key for `day_of_week` in the week containing `week`.
    pub fn weekly(week: NaiveDate, day_of_week: u8) -> Self {
        Schedule::Weekly {
            week_start: period::week_start(week),
            day_of_week,
        }
    }

    /// Weekly key that resolves to exactly `date`.
    pub fn weekly_on(date: NaiveDate) -> Self {
        Schedule::Weekly {
            week_start: period::week_start(date),
            day_of_week: date.weekday().num_days_from_monday() as u8,
        }
    }

    /// The calendar day the task is scheduled on.
    pub fn date(&self) -> NaiveDate {
        match *self {
            Schedule::Dated { date } => date,
            Schedule::Weekly { week_start, day_of_week } => {
                week_start + Duration::days(day_of_week as i64)
            }
        }
    }

    /// Monday of the week the task belongs to.
    pub fn week_start(&self) -> NaiveDate {
        match *self {
            Schedule::Dated { date } => period::week_start(date),
            Schedule::Weekly { week_start, .. } => week_start,
        }
    }

    pub fn is_weekly(&self) -> bool {
        matches!(self, Schedule::Weekly { .. })
    }

    /// Same key strategy, moved onto `date`.
    pub fn on(&self, date: NaiveDate) -> Self {
        match self {
            Schedule::Dated { .. } => Schedule::dated(date),
            Schedule::Weekly { .. } => Schedule::weekly_on(date),
        }
    }

    /// Advance by whole weeks, keeping the day of week.
    pub fn shifted_weeks(&self, weeks: i64) -> Self {
        match *self {
            Schedule::Dated { date } => Schedule::Dated {
                date: date + Duration::weeks(weeks),
            },
            Schedule::Weekly { week_start, day_of_week } => Schedule::Weekly {
                week_start: week_start + Duration::weeks(weeks),
                day_of_week,
            },
        }
    }

    /// Snap a weekly key's week start back onto its Monday.
    pub fn normalized(self) -> Self {
        match self {
            Schedule::Weekly { week_start, day_of_week } => Schedule::Weekly {
                week_start: period::week_start(week_start),
                day_of_week,
            },
            dated => dated,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Schedule::Weekly { day_of_week, .. } if day_of_week > 6 => {
                Err(format!("day of week must be 0-6, got {day_of_week}"))
            }
            _ => Ok(()),
        }
    }
}

/// A scheduled piece of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub schedule: Schedule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Finalize a draft under a fresh identity.
    pub(crate) fn from_draft(draft: TaskDraft, now: DateTime<Utc>) -> Self {
        let completed_at = draft.status.is_completed().then_some(now);
        Task {
            id: TaskId::new(),
            title: draft.title.trim().to_string(),
            description: draft.description.filter(|d| !d.trim().is_empty()),
            priority: draft.priority,
            status: draft.status,
            tags: normalise_tags(&draft.tags),
            schedule: draft.schedule.normalized(),
            deadline: draft.deadline,
            created_at: now,
            completed_at,
        }
    }

    /// Merge a patch. `completed_at` follows the resulting status: set on a
    /// transition into completed, kept while it stays completed, cleared
    /// otherwise.
    pub(crate) fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) {
        let was_completed = self.status.is_completed();
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(desc) = patch.description {
            self.description = desc.filter(|d| !d.trim().is_empty());
        }
        if let Some(p) = patch.priority {
            self.priority = p;
        }
        if let Some(s) = patch.status {
            self.status = s;
        }
        if let Some(tags) = patch.tags {
            self.tags = normalise_tags(&tags);
        }
        if let Some(schedule) = patch.schedule {
            self.schedule = schedule.normalized();
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = deadline;
        }

        match (was_completed, self.status.is_completed()) {
            (false, true) => self.completed_at = Some(now),
            (true, true) => {
                if self.completed_at.is_none() {
                    self.completed_at = Some(now);
                }
            }
            (_, false) => self.completed_at = None,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.schedule.date()
    }
}

/// Everything needed to create a task; identity and timestamps come from the
/// store.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub status: Status,
    pub tags: Vec<String>,
    pub schedule: Schedule,
    pub deadline: Option<DateTime<Utc>>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, schedule: Schedule) -> Self {
        TaskDraft {
            title: title.into(),
            description: None,
            priority: Priority::default(),
            status: Status::default(),
            tags: Vec::new(),
            schedule,
            deadline: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// A partial update. `None` leaves a field alone; for clearable fields
/// `Some(None)` clears it. Completion time is never patched directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub tags: Option<Vec<String>>,
    pub schedule: Option<Schedule>,
    pub deadline: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    /// A patch that only changes status, as a board move does.
    pub fn status(status: Status) -> Self {
        TaskPatch {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }
}

/// Normalize a tag by trimming, lowercasing, and replacing spaces with hyphens.
pub fn normalise_tag(s: &str) -> String {
    s.trim().to_lowercase().replace(' ', "-")
}

/// Split comma-separated tag strings, normalize, sort and deduplicate.
pub fn normalise_tags(inputs: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = inputs
        .iter()
        .flat_map(|raw| raw.split(','))
        .map(normalise_tag)
        .filter(|t| !t.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// Calendar dates on the wire. Written as `YYYY-MM-DD`; full ISO-8601
/// timestamps are accepted on read and truncated to their date.
mod iso_date {
    use chrono::{DateTime, NaiveDate};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        if let Ok(date) = NaiveDate::parse_from_str(&raw, FORMAT) {
            return Ok(date);
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.date_naive())
            .map_err(|_| de::Error::custom(format!("invalid date '{raw}'")))
    }
}
