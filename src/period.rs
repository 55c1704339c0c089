//! Calendar periods: week and month boundaries, navigation and titles.
//!
//! Weeks start on Monday everywhere in the planner.

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::fields::ViewMode;

/// Monday on or before `d`.
pub fn week_start(d: NaiveDate) -> NaiveDate {
    d - Duration::days(d.weekday().num_days_from_monday() as i64)
}

/// Sunday on or after `d`.
pub fn week_end(d: NaiveDate) -> NaiveDate {
    week_start(d) + Duration::days(6)
}

/// First day of the month containing `d`.
pub fn month_start(d: NaiveDate) -> NaiveDate {
    d - Duration::days(d.day0() as i64)
}

/// Last day of the month containing `d`.
pub fn month_end(d: NaiveDate) -> NaiveDate {
    // Only the last representable month has no successor.
    month_start(d)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Navigation direction for [`step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

/// Move the anchor by one period of the given mode.
pub fn step(anchor: NaiveDate, mode: ViewMode, direction: Direction) -> NaiveDate {
    match (mode, direction) {
        (ViewMode::Day, Direction::Next) => anchor + Duration::days(1),
        (ViewMode::Day, Direction::Prev) => anchor - Duration::days(1),
        (ViewMode::Week, Direction::Next) => anchor + Duration::weeks(1),
        (ViewMode::Week, Direction::Prev) => anchor - Duration::weeks(1),
        // Month arithmetic clamps to the last valid day (Jan 31 -> Feb 29).
        (ViewMode::Month, Direction::Next) => {
            anchor.checked_add_months(Months::new(1)).unwrap_or(anchor)
        }
        (ViewMode::Month, Direction::Prev) => {
            anchor.checked_sub_months(Months::new(1)).unwrap_or(anchor)
        }
    }
}

/// An inclusive date range displayed by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub mode: ViewMode,
    pub anchor: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// The period of the given mode that contains `anchor`.
    pub fn containing(anchor: NaiveDate, mode: ViewMode) -> Self {
        let (start, end) = match mode {
            ViewMode::Day => (anchor, anchor),
            ViewMode::Week => (week_start(anchor), week_end(anchor)),
            ViewMode::Month => (month_start(anchor), month_end(anchor)),
        };
        Period { mode, anchor, start, end }
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        d >= self.start && d <= self.end
    }

    /// Every day of the period in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        let len = (self.end - self.start).num_days() + 1;
        (0..len).map(move |i| start + Duration::days(i))
    }

    /// Heading shown above the view.
    pub fn title(&self) -> String {
        match self.mode {
            ViewMode::Day => self.anchor.format("%A, %B %-d, %Y").to_string(),
            ViewMode::Week => format!(
                "{} - {}",
                self.start.format("%b %-d"),
                self.end.format("%b %-d, %Y")
            ),
            ViewMode::Month => self.anchor.format("%B %Y").to_string(),
        }
    }

    /// Possessive label used in progress summaries.
    pub fn label(&self) -> &'static str {
        match self.mode {
            ViewMode::Day => "Today's",
            ViewMode::Week => "This Week's",
            ViewMode::Month => "This Month's",
        }
    }
}

/// Calendar grid for the month containing `anchor`: full Monday-to-Sunday rows
/// covering the whole month, padded with days of the neighbouring months.
pub fn month_grid(anchor: NaiveDate) -> Vec<NaiveDate> {
    let first = week_start(month_start(anchor));
    let last = week_end(month_end(anchor));
    let len = (last - first).num_days() + 1;
    (0..len).map(|i| first + Duration::days(i)).collect()
}
