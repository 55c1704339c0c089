//! # Planner - day, week and month task planning CLI
//!
//! A terminal task planner with two flavours sharing one engine:
//!
//! - **smart**: every task carries an absolute date.
//! - **weekly**: every task carries the Monday of its week plus a weekday.
//!
//! Tasks are projected into a day, week or month period, ordered by status and
//! priority, and summarised as progress. Unfinished work can be rolled over
//! onto today (smart) or into next week (weekly). A kanban board (`planner
//! board`) shows the period as To Do / In Progress / Completed columns.
//!
//! ## Quick Start
//!
//! ```bash
//! planner add "Write report" --date tomorrow --priority high --tag work
//! planner list --view week
//! planner complete "Write report"
//! planner rollover
//! planner --planner weekly add "Gym" --day fri
//! planner board
//! ```
//!
//! Data is stored in `~/.planner/` (or `--data-dir` / `$PLANNER_DIR`), one JSON
//! file per storage key. Set `RUST_LOG` or pass `-v` for log output on stderr.

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod period;
pub mod rollover;
pub mod sort;
pub mod storage;
pub mod task;
pub mod view;
pub mod tui {
    pub mod board;
    pub mod colors;
    pub mod input;
    pub mod run;
}

use cli::Cli;
use cmd::*;
use config::Config;
use db::TaskStore;
use error::StoreError;
use fields::Status;
use storage::FileStorage;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return;
    }

    let config = Config::resolve(cli.data_dir.clone(), cli.planner);
    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        eprintln!(
            "Failed to create data directory {}: {}",
            config.data_dir.display(),
            e
        );
        std::process::exit(1);
    }
    let mut store = TaskStore::open(FileStorage::new(&config.data_dir), config.planner);
    debug!(
        dir = %store.storage().dir().display(),
        planner = ?config.planner,
        "opened planner"
    );
    if let Err(e) = dispatch(&mut store, cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn dispatch(store: &mut TaskStore<FileStorage>, command: Commands) -> Result<(), StoreError> {
    match command {
        Commands::Board { date } => cmd_board(store, date),

        Commands::Add {
            title,
            desc,
            date,
            day,
            priority,
            status,
            tags,
            deadline,
        } => cmd_add(store, title, desc, date, day, priority, status, tags, deadline).map(|_| ()),

        Commands::List {
            view,
            date,
            all,
            sort,
            status,
            tags,
        } => cmd_list(store, view, date, all, sort, status, tags),

        Commands::Show { id } => cmd_show(store, id),

        Commands::Update {
            id,
            title,
            desc,
            clear_desc,
            priority,
            status,
            date,
            add_tags,
            rm_tags,
            deadline,
            clear_deadline,
        } => cmd_update(
            store,
            id,
            title,
            desc,
            clear_desc,
            priority,
            status,
            date,
            add_tags,
            rm_tags,
            deadline,
            clear_deadline,
        ),

        Commands::Move { id, status } => cmd_move(store, id, status),

        Commands::Complete { id } => cmd_move(store, id, Status::Completed),

        Commands::Reopen { id } => cmd_move(store, id, Status::Todo),

        Commands::Delete { id } => cmd_delete(store, id),

        Commands::Rollover { week, dry_run } => cmd_rollover(store, week, dry_run).map(|_| ()),

        Commands::Progress { view, date } => cmd_progress(store, view, date),

        Commands::Calendar { date } => cmd_calendar(store, date),

        Commands::Mode { mode } => cmd_mode(store, mode),

        Commands::Tags => {
            cmd_tags(store);
            Ok(())
        }

        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}
