//! Enumerations and field types for planner tasks.
//!
//! This module defines the structured values a task carries (priority and
//! status) together with the view modes and sort keys used by the CLI and the
//! board.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How important a task is.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Display rank, higher sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

/// Task progress status. Doubles as the kanban column a task sits in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Completed,
}

impl Status {
    /// Board column order, left to right.
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Completed];

    /// Display rank, higher sorts first. Actionable work surfaces on top.
    pub fn rank(self) -> u8 {
        match self {
            Status::Todo => 3,
            Status::InProgress => 2,
            Status::Completed => 1,
        }
    }

    pub fn is_completed(self) -> bool {
        self == Status::Completed
    }

    /// Column index on the board.
    pub fn column(self) -> usize {
        match self {
            Status::Todo => 0,
            Status::InProgress => 1,
            Status::Completed => 2,
        }
    }
}

/// The displayed time granularity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    Day,
    #[default]
    Week,
    Month,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Day => "day",
            ViewMode::Week => "week",
            ViewMode::Month => "month",
        }
    }

    /// Next mode in the day -> week -> month cycle.
    pub fn cycle(self) -> ViewMode {
        match self {
            ViewMode::Day => ViewMode::Week,
            ViewMode::Week => ViewMode::Month,
            ViewMode::Month => ViewMode::Day,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "day" => Ok(ViewMode::Day),
            "week" => Ok(ViewMode::Week),
            "month" => Ok(ViewMode::Month),
            other => Err(format!("unknown view mode '{other}'")),
        }
    }
}

/// Which planner flavour a data set belongs to.
///
/// The smart planner schedules tasks on absolute dates and rolls overdue work
/// onto today. The weekly planner schedules by week and day of week and rolls a
/// whole week forward at once.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PlannerKind {
    #[default]
    Smart,
    Weekly,
}

/// Available orderings for task lists.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum SortKey {
    /// Status first (todo, in progress, completed), then priority.
    #[default]
    Status,
    /// Priority only.
    Priority,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_put_actionable_work_first() {
        assert!(Status::Todo.rank() > Status::InProgress.rank());
        assert!(Status::InProgress.rank() > Status::Completed.rank());
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert!(Priority::Medium.rank() > Priority::Low.rank());
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&Status::InProgress).unwrap(), "\"in-progress\"");
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        let s: Status = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(s, Status::Completed);
    }

    #[test]
    fn test_view_mode_parse_and_cycle() {
        assert_eq!("month".parse::<ViewMode>().unwrap(), ViewMode::Month);
        assert!("year".parse::<ViewMode>().is_err());
        assert_eq!(ViewMode::Month.cycle(), ViewMode::Day);
        assert_eq!(ViewMode::default(), ViewMode::Week);
    }
}
