//! Command implementations for the CLI interface.
//!
//! This module contains the subcommands and their handlers: task CRUD,
//! projected listings, rollover, progress and calendar summaries, and the
//! board launcher. Handlers print their results and return errors to `main`.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::db::*;
use crate::error::StoreError;
use crate::fields::*;
use crate::period::{self, Period};
use crate::rollover::{has_overdue, roll_forward_week, rollover_overdue};
use crate::sort::{order_by_priority, order_by_status_then_priority};
use crate::storage::Storage;
use crate::task::{normalise_tags, Schedule, Task, TaskDraft, TaskPatch};
use crate::view::{self, Progress};

#[derive(Subcommand)]
pub enum Commands {
    /// Open the kanban board.
    Board {
        /// Day to open the board on (default today).
        #[arg(long)]
        date: Option<String>,
    },

    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Scheduled day: YYYY-MM-DD, "today", "tomorrow", a weekday, or "in Nd".
        #[arg(long)]
        date: Option<String>,
        /// Weekly planner: day of the week (mon..sun) within --date's week.
        #[arg(long)]
        day: Option<String>,
        /// Priority: low | medium | high.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Status: todo | in-progress | completed.
        #[arg(long, value_enum, default_value_t = Status::Todo)]
        status: Status,
        /// Comma-separated tags. May be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Deadline: YYYY-MM-DDTHH:MM or any --date form (midnight).
        #[arg(long)]
        deadline: Option<String>,
    },

    /// List the tasks of the current period.
    List {
        /// Period to show: day | week | month (default: last used).
        #[arg(long, value_enum)]
        view: Option<ViewMode>,
        /// Any day inside the period (default today).
        #[arg(long)]
        date: Option<String>,
        /// Ignore the period and list every task.
        #[arg(long)]
        all: bool,
        /// Ordering.
        #[arg(long, value_enum, default_value_t = SortKey::Status)]
        sort: SortKey,
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Filter by tag. May be repeated. Accepts comma-separated.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Show a single task by id prefix or title.
    Show {
        id: String,
    },

    /// Update fields on a task.
    Update {
        /// Task id prefix or title.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        clear_desc: bool,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Reschedule onto another day.
        #[arg(long)]
        date: Option<String>,
        /// Add tags. May be repeated and comma-separated.
        #[arg(long = "add-tag")]
        add_tags: Vec<String>,
        /// Remove tags. May be repeated and comma-separated.
        #[arg(long = "rm-tag")]
        rm_tags: Vec<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        clear_deadline: bool,
    },

    /// Move a task to another board column.
    Move {
        id: String,
        #[arg(value_enum)]
        status: Status,
    },

    /// Mark a task completed.
    Complete {
        id: String,
    },

    /// Reopen a task (status todo).
    Reopen {
        id: String,
    },

    /// Delete a task.
    Delete {
        id: String,
    },

    /// Copy unfinished work forward: overdue tasks onto today (smart planner)
    /// or this week's open tasks into next week (weekly planner).
    Rollover {
        /// Weekly planner: any day of the week to roll (default today).
        #[arg(long)]
        week: Option<String>,
        /// Only show what would be copied.
        #[arg(long)]
        dry_run: bool,
    },

    /// Completion summary of a period.
    Progress {
        #[arg(long, value_enum)]
        view: Option<ViewMode>,
        #[arg(long)]
        date: Option<String>,
    },

    /// Month calendar with per-day task counts.
    Calendar {
        /// Any day inside the month (default today).
        #[arg(long)]
        date: Option<String>,
    },

    /// Show or set the default view mode.
    Mode {
        #[arg(value_enum)]
        mode: Option<ViewMode>,
    },

    /// List distinct tags and counts.
    Tags,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parse an optional date argument, defaulting to `today`.
fn date_arg(input: Option<&str>, today: NaiveDate) -> Result<NaiveDate, StoreError> {
    match input {
        None => Ok(today),
        Some(s) => parse_date_input(s, today).ok_or_else(|| {
            StoreError::Validation(format!(
                "unrecognised date '{s}'. Use YYYY-MM-DD, 'today', 'tomorrow', a weekday, or 'in Nd'"
            ))
        }),
    }
}

/// Parse a deadline: a local `YYYY-MM-DDTHH:MM` timestamp, or a date at midnight.
pub fn parse_deadline_input(s: &str, today: NaiveDate) -> Result<DateTime<Utc>, StoreError> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M")
        .ok()
        .or_else(|| parse_date_input(s, today).and_then(|d| d.and_hms_opt(0, 0, 0)))
        .ok_or_else(|| StoreError::Validation(format!("unrecognised deadline '{s}'")))?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| StoreError::Validation(format!("deadline '{s}' does not exist locally")))
}

/// Scheduling key a new task gets in the given planner.
pub fn schedule_for(
    kind: PlannerKind,
    date: NaiveDate,
    day: Option<&str>,
) -> Result<Schedule, StoreError> {
    match (kind, day) {
        (PlannerKind::Smart, Some(_)) => Err(StoreError::Validation(
            "--day only applies to the weekly planner, use --date".into(),
        )),
        (PlannerKind::Smart, None) => Ok(Schedule::dated(date)),
        (PlannerKind::Weekly, None) => Ok(Schedule::weekly_on(date)),
        (PlannerKind::Weekly, Some(name)) => {
            let index = weekday_index(name)
                .ok_or_else(|| StoreError::Validation(format!("unknown weekday '{name}'")))?;
            Ok(Schedule::weekly(date, index as u8))
        }
    }
}

fn local_today<S: Storage>(store: &TaskStore<S>) -> NaiveDate {
    store.now().with_timezone(&Local).date_naive()
}

/// Launch the kanban board.
pub fn cmd_board<S: Storage>(
    store: &mut TaskStore<S>,
    date: Option<String>,
) -> Result<(), StoreError> {
    let anchor = date_arg(date.as_deref(), local_today(store))?;
    crate::tui::run::run_board(store, anchor)?;
    Ok(())
}

/// Add a new task.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add<S: Storage>(
    store: &mut TaskStore<S>,
    title: String,
    desc: Option<String>,
    date: Option<String>,
    day: Option<String>,
    priority: Priority,
    status: Status,
    tags: Vec<String>,
    deadline: Option<String>,
) -> Result<Task, StoreError> {
    let today = local_today(store);
    let date = date_arg(date.as_deref(), today)?;
    let schedule = schedule_for(store.kind(), date, day.as_deref())?;

    let mut draft = TaskDraft::new(title, schedule)
        .priority(priority)
        .status(status)
        .tags(tags);
    if let Some(d) = desc {
        draft = draft.description(d);
    }
    if let Some(dl) = deadline {
        draft = draft.deadline(parse_deadline_input(&dl, today)?);
    }

    let task = store.create(draft)?;
    println!("Added task {} on {}", task.id.short(), task.date());
    Ok(task)
}

/// List the tasks of a period with optional filtering and sorting.
pub fn cmd_list<S: Storage>(
    store: &TaskStore<S>,
    view_mode: Option<ViewMode>,
    date: Option<String>,
    all: bool,
    sort: SortKey,
    status: Option<Status>,
    tags: Vec<String>,
) -> Result<(), StoreError> {
    let anchor = date_arg(date.as_deref(), local_today(store))?;
    let mode = view_mode.unwrap_or_else(|| store.view_mode());
    let tags = normalise_tags(&tags);

    let mut selected: Vec<&Task> = if all {
        store.list().iter().collect()
    } else {
        view::project(store.list(), anchor, mode)
    };
    selected.retain(|t| status.map_or(true, |s| t.status == s));
    selected.retain(|t| tags.iter().all(|tag| t.tags.contains(tag)));

    let ordered = match sort {
        SortKey::Status => order_by_status_then_priority(&selected),
        SortKey::Priority => order_by_priority(&selected),
    };

    if all {
        println!("All tasks ({})", ordered.len());
    } else {
        println!("{} ({})", Period::containing(anchor, mode).title(), ordered.len());
    }
    print_table(&ordered);
    if store.kind() == PlannerKind::Smart && has_overdue(store.list(), local_today(store)) {
        println!(
            "\nUnfinished tasks from earlier days. Run `planner rollover` to copy them to today."
        );
    }
    Ok(())
}

/// View detailed information about a specific task.
pub fn cmd_show<S: Storage>(store: &TaskStore<S>, id: String) -> Result<(), StoreError> {
    let task_id = store.resolve(&id)?;
    let Some(task) = store.get(task_id) else {
        return Err(StoreError::NotFound(id));
    };
    let today = local_today(store);
    println!("ID:           {}", task.id);
    println!("Title:        {}", task.title);
    println!("Status:       {}", format_status(task.status));
    println!("Priority:     {}", format_priority(task.priority));
    println!(
        "Date:         {} ({})",
        task.date(),
        format_date_relative(task.date(), today)
    );
    if task.schedule.is_weekly() {
        println!(
            "Week of:      {} ({})",
            task.schedule.week_start(),
            task.date().format("%A")
        );
    }
    let deadline = task
        .deadline
        .map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let tags = if task.tags.is_empty() {
        "-".to_string()
    } else {
        task.tags.join(",")
    };
    let completed = task
        .completed_at
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    println!("Deadline:     {}", deadline);
    println!("Tags:         {}", tags);
    println!("Created UTC:  {}", task.created_at.to_rfc3339());
    println!("Completed:    {}", completed);
    println!("Description:\n{}\n", task.description.as_deref().unwrap_or("-"));
    Ok(())
}

/// Update an existing task's fields.
#[allow(clippy::too_many_arguments)]
pub fn cmd_update<S: Storage>(
    store: &mut TaskStore<S>,
    id: String,
    title: Option<String>,
    desc: Option<String>,
    clear_desc: bool,
    priority: Option<Priority>,
    status: Option<Status>,
    date: Option<String>,
    add_tags: Vec<String>,
    rm_tags: Vec<String>,
    deadline: Option<String>,
    clear_deadline: bool,
) -> Result<(), StoreError> {
    let task_id = store.resolve(&id)?;
    let Some(current) = store.get(task_id).cloned() else {
        return Err(StoreError::NotFound(id));
    };
    let today = local_today(store);

    let mut patch = TaskPatch {
        title,
        priority,
        status,
        ..Default::default()
    };
    if clear_desc {
        patch.description = Some(None);
    }
    if let Some(d) = desc {
        patch.description = Some(Some(d));
    }
    if let Some(ds) = date {
        let day = date_arg(Some(&ds), today)?;
        patch.schedule = Some(current.schedule.on(day));
    }
    if clear_deadline {
        patch.deadline = Some(None);
    }
    if let Some(dl) = deadline {
        patch.deadline = Some(Some(parse_deadline_input(&dl, today)?));
    }

    let add = normalise_tags(&add_tags);
    let rm = normalise_tags(&rm_tags);
    if !add.is_empty() || !rm.is_empty() {
        let mut merged: Vec<String> = current
            .tags
            .iter()
            .filter(|t| !rm.contains(t))
            .cloned()
            .collect();
        merged.extend(add);
        patch.tags = Some(merged);
    }

    if patch.is_empty() {
        println!("Nothing to update.");
        return Ok(());
    }
    store.update(task_id, patch)?;
    println!("Updated task {}", task_id.short());
    Ok(())
}

/// Move a task to a status column.
pub fn cmd_move<S: Storage>(
    store: &mut TaskStore<S>,
    id: String,
    status: Status,
) -> Result<(), StoreError> {
    let task_id = store.resolve(&id)?;
    store.move_to(task_id, status)?;
    println!("Moved {} to {}", task_id.short(), format_status(status));
    Ok(())
}

/// Delete a task.
pub fn cmd_delete<S: Storage>(store: &mut TaskStore<S>, id: String) -> Result<(), StoreError> {
    let task_id = store.resolve(&id)?;
    if let Some(removed) = store.delete(task_id)? {
        println!("Deleted {} ({})", removed.id.short(), removed.title);
    }
    Ok(())
}

/// Copy unfinished work onto the current period.
pub fn cmd_rollover<S: Storage>(
    store: &mut TaskStore<S>,
    week: Option<String>,
    dry_run: bool,
) -> Result<usize, StoreError> {
    let now = store.now().with_timezone(&Local);
    let today = now.date_naive();

    let (rolled, heading) = match store.kind() {
        PlannerKind::Smart => {
            if week.is_some() {
                return Err(StoreError::Validation(
                    "--week only applies to the weekly planner".into(),
                ));
            }
            (rollover_overdue(store.list(), &now), format!("today ({today})"))
        }
        PlannerKind::Weekly => {
            let week = date_arg(week.as_deref(), today)?;
            let (rolled, next) = roll_forward_week(store.list(), week, &now);
            (rolled, format!("week of {next}"))
        }
    };

    if rolled.is_empty() {
        println!("Nothing to roll over.");
        return Ok(0);
    }
    let refs: Vec<&Task> = rolled.iter().collect();
    if dry_run {
        println!("Would copy {} task(s) to {}:", rolled.len(), heading);
        print_table(&refs);
        return Ok(0);
    }
    println!("Copying {} task(s) to {}:", rolled.len(), heading);
    print_table(&refs);
    store.append(rolled)
}

/// Print a completion summary for a period.
pub fn cmd_progress<S: Storage>(
    store: &TaskStore<S>,
    view_mode: Option<ViewMode>,
    date: Option<String>,
) -> Result<(), StoreError> {
    let anchor = date_arg(date.as_deref(), local_today(store))?;
    let mode = view_mode.unwrap_or_else(|| store.view_mode());
    let period = Period::containing(anchor, mode);
    let tasks = view::project(store.list(), anchor, mode);
    let p = Progress::of(&tasks);

    println!("{} Progress: {}", period.label(), period.title());
    println!("{} {}%", progress_bar(p.percent(), 30), p.percent());
    println!("Total:        {}", p.total);
    println!("Completed:    {}", p.completed);
    println!("In Progress:  {}", p.in_progress);
    println!("To Do:        {}", p.todo);

    if mode == ViewMode::Week {
        println!();
        for day in period.days() {
            let daily = Progress::of(&view::on_day(&tasks, day));
            println!(
                "{:<10} {:>2}/{:<2} {}",
                day.format("%a %d").to_string(),
                daily.completed,
                daily.total,
                progress_bar(daily.percent(), 10)
            );
        }
    }
    Ok(())
}

/// Text progress bar of `width` cells.
pub fn progress_bar(percent: u32, width: usize) -> String {
    let filled = (percent.min(100) as usize * width) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Print a month grid with completed/total counts per day.
pub fn cmd_calendar<S: Storage>(
    store: &TaskStore<S>,
    date: Option<String>,
) -> Result<(), StoreError> {
    let today = local_today(store);
    let anchor = date_arg(date.as_deref(), today)?;
    let tasks = view::project(store.list(), anchor, ViewMode::Month);
    let month = period::month_start(anchor);

    println!("{}", Period::containing(anchor, ViewMode::Month).title());
    let header = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"].map(|d| format!("{d:<10}"));
    println!("{}", header.concat());
    for row in period::month_grid(anchor).chunks(7) {
        let line: String = row
            .iter()
            .map(|&day| format!("{:<10}", calendar_cell(day, month, today, &tasks)))
            .collect();
        println!("{}", line.trim_end());
    }
    Ok(())
}

fn calendar_cell(day: NaiveDate, month: NaiveDate, today: NaiveDate, tasks: &[&Task]) -> String {
    use chrono::Datelike;

    if period::month_start(day) != month {
        return " .".into();
    }
    let marker = if day == today { "*" } else { "" };
    let on_day = view::on_day(tasks, day);
    if on_day.is_empty() {
        return format!("{:>2}{}", day.day(), marker);
    }
    let p = Progress::of(&on_day);
    format!("{:>2}{} {}/{}", day.day(), marker, p.completed, p.total)
}

/// Show or set the persisted view mode.
pub fn cmd_mode<S: Storage>(
    store: &mut TaskStore<S>,
    mode: Option<ViewMode>,
) -> Result<(), StoreError> {
    match mode {
        Some(m) => {
            store.set_view_mode(m)?;
            println!("View mode set to {m}");
        }
        None => println!("{}", store.view_mode()),
    }
    Ok(())
}

/// List all distinct tags with their usage counts.
pub fn cmd_tags<S: Storage>(store: &TaskStore<S>) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for t in store.list() {
        for tag in &t.tags {
            *counts.entry(tag.clone()).or_default() += 1;
        }
    }
    println!("{:<16} Count", "Tag");
    for (tag, c) in counts {
        println!("{:<16} {}", truncate(&tag, 16), c);
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
