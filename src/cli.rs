use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::cmd::Commands;
use crate::fields::PlannerKind;

/// Day, week and month task planner.
/// Data defaults to ~/.planner or a directory passed via --data-dir.
#[derive(Parser)]
#[command(name = "planner", version, about = "Plan tasks by day, week and month")]
pub struct Cli {
    /// Directory holding the planner's JSON files.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Planner flavour: smart (dated tasks) | weekly (week + weekday).
    #[arg(long, global = true, value_enum)]
    pub planner: Option<PlannerKind>,

    /// More log output. Repeat for more detail.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}
