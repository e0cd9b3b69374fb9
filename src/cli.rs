use crate::command::{history, rename, touch, undo};

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "batchmv", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Rename files as one batch, recorded for undo.
    Rename(rename::RenameArgs),
    /// Change timestamps or attributes of files as one batch, recorded for undo.
    Touch(touch::TouchArgs),
    /// Revert the most recent recorded batch.
    Undo(undo::UndoArgs),
    /// Show or clear the recorded batches.
    History(history::HistoryArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Undo log file (defaults to <exe>_undo.log next to the executable)
    #[arg(long, global = true, value_name = "FILE")]
    pub undo_log: Option<PathBuf>,

    /// What to do when a file in the batch fails
    #[arg(long, global = true, value_enum, default_value_t = OnError::Ask)]
    pub on_error: OnError,

    /// Log every step to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

/// Answer given to per-file errors during a batch.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnError {
    /// Prompt for abort, retry or ignore (aborts when not interactive)
    Ask,
    /// Stop the batch at the first failure
    Abort,
    /// Skip failed files and carry on
    Ignore,
}
