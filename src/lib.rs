//! Batch file renames and touches with abort/retry/ignore recovery and a
//! persistent undo log.
//!
//! Renames run in two phases through intermediate names, so swaps and
//! cycles inside one batch never collide. Every committed batch is recorded
//! in an [`UndoChangeLog`](history::UndoChangeLog) and can be reverted later.

pub mod cli;
pub mod command;
pub mod error;
pub mod fs;
pub mod history;
pub mod state;
pub mod validation;

pub use error::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run() -> Result<()> {
    use clap::Parser;

    let cli = cli::Cli::parse();

    let level = if cli.global.verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();

    let ctx = command::Context::from_args(&cli.global)?;
    command::execute(cli.command, &ctx)
}
