use super::Context;
use super::prompt::confirm_operation;
use super::report::display_path;
use crate::error::{BatchError, Result};
use crate::history::{Batch, UndoChangeLog};
use crate::state::{epoch, format_timestamp};

use chrono::NaiveDateTime;
use clap::Parser;
use colored::Colorize;

/// Entries shown per batch.
const PREVIEW_ENTRIES: usize = 5;

#[derive(Parser, Debug, Clone)]
pub struct HistoryArgs {
    /// Forget every recorded batch
    #[arg(long)]
    pub clear: bool,

    /// Skip the interactive confirmation prompt for --clear
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn execute(args: HistoryArgs, ctx: &Context) -> Result<()> {
    let mut history = UndoChangeLog::load(&ctx.undo_log)?;

    if args.clear {
        if history.is_empty() {
            println!("\n{}", "Undo log is already empty".yellow());
            return Ok(());
        }

        if !confirm_operation(args.yes)? {
            println!("\n{}", "Operation cancelled.".yellow());
            return Err(BatchError::Cancelled);
        }

        history.clear();
        history.save(&ctx.undo_log)?;
        println!("\n{} Undo log cleared", "✓".green().bold());
        return Ok(());
    }

    println!(
        "\n{} {}",
        "Undo log:".bold().cyan(),
        ctx.undo_log.display().to_string().dimmed()
    );

    if history.is_empty() {
        println!("\n{}", "No batches recorded".yellow());
        return Ok(());
    }

    print_stack("Rename batches", history.renames().iter().rev(), |batch| {
        batch
            .entries
            .iter()
            .map(|(s, d)| {
                format!(
                    "{} → {}",
                    display_path(s, &ctx.cwd),
                    display_path(d, &ctx.cwd)
                )
            })
            .collect()
    });

    print_stack("Touch batches", history.touches().iter().rev(), |batch| {
        batch
            .entries
            .iter()
            .map(|change| {
                format!(
                    "{} {}",
                    display_path(change.path(), &ctx.cwd),
                    change.after.brace_block()
                )
            })
            .collect()
    });

    Ok(())
}

/// Prints batches newest first; the first one listed is what `undo` reverts.
fn print_stack<'a, P: 'a>(
    title: &str,
    batches: impl Iterator<Item = &'a Batch<P>>,
    lines: impl Fn(&Batch<P>) -> Vec<String>,
) {
    let batches: Vec<_> = batches.collect();
    println!("\n{} ({})", title.bold(), batches.len());

    for (idx, batch) in batches.into_iter().enumerate() {
        let entries = lines(batch);
        println!(
            "  {} {} {}",
            format!("#{}", idx + 1).cyan(),
            describe_timestamp(&batch.timestamp),
            format!("({} entries)", entries.len()).dimmed()
        );

        for line in entries.iter().take(PREVIEW_ENTRIES) {
            println!("     {}", line);
        }
        if entries.len() > PREVIEW_ENTRIES {
            println!("     ... and {} more", entries.len() - PREVIEW_ENTRIES);
        }
    }
}

fn describe_timestamp(ts: &NaiveDateTime) -> String {
    if *ts == epoch() {
        "no timestamp".to_string()
    } else {
        format_timestamp(ts)
    }
}
