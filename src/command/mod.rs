pub mod history;
pub mod prompt;
pub mod rename;
pub mod report;
pub mod touch;
pub mod undo;

use crate::cli::{Command, GlobalArgs, OnError};
use crate::error::Result;
use crate::history::default_log_path;

use std::path::PathBuf;

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    pub undo_log: PathBuf,
    pub on_error: OnError,
    pub cwd: PathBuf,
}

impl Context {
    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        let undo_log = match &args.undo_log {
            Some(path) => std::path::absolute(path)?,
            None => default_log_path()?,
        };
        log::debug!("Undo log: {}", undo_log.display());

        Ok(Self {
            undo_log,
            on_error: args.on_error,
            cwd: std::env::current_dir()?,
        })
    }
}

pub fn execute(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Rename(args) => rename::execute(args, ctx),
        Command::Touch(args) => touch::execute(args, ctx),
        Command::Undo(args) => undo::execute(args, ctx),
        Command::History(args) => history::execute(args, ctx),
    }
}
