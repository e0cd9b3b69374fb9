use super::Context;
use super::prompt::{ConsoleCallback, confirm_operation};
use super::report::{print_rename_plan, print_summary, print_touch_plan};
use crate::error::{BatchError, Result};
use crate::fs::{BatchRename, BatchTouch, RenamePlan, TouchPlan};
use crate::history::UndoChangeLog;
use crate::state::format_timestamp;

use clap::Parser;
use colored::Colorize;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
pub struct UndoArgs {
    /// Undo the newest touch batch instead of the newest rename batch
    #[arg(long)]
    pub touch: bool,

    /// Show what would be reverted without changing anything
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Skip the interactive confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn execute(args: UndoArgs, ctx: &Context) -> Result<()> {
    let mut history = UndoChangeLog::load(&ctx.undo_log)?;

    if args.touch {
        undo_touch(&args, ctx, &mut history)
    } else {
        undo_rename(&args, ctx, &mut history)
    }
}

fn undo_rename(args: &UndoArgs, ctx: &Context, history: &mut UndoChangeLog) -> Result<()> {
    let Some(batch) = history.renames().newest() else {
        return Err(BatchError::NothingToUndo("rename"));
    };

    let inverse = batch.entries.inverse();
    print_rename_plan(
        &format!("Undo Rename Batch ({}):", format_timestamp(&batch.timestamp)),
        &inverse,
        &ctx.cwd,
    );

    if args.dry_run {
        println!("\n{}", "DRY RUN - No changes were made".yellow().bold());
        return Ok(());
    }

    if !confirm_operation(args.yes)? {
        println!("\n{}", "Operation cancelled.".yellow());
        return Err(BatchError::Cancelled);
    }

    let Some(batch) = history.pop_rename() else {
        return Err(BatchError::NothingToUndo("rename"));
    };

    let mut callback = ConsoleCallback::new(ctx.on_error);
    let mut undo = BatchRename::new(&inverse, &mut callback);
    let completed = undo.execute();
    let reverted = undo.committed().clone();
    drop(undo);

    let remainder = rename_remainder(&batch.entries, &reverted);
    if !remainder.is_empty() {
        log::warn!(
            "{} entries could not be reverted and stay in the undo log",
            remainder.len()
        );
    }
    history.push_rename_at(batch.timestamp, remainder);
    history.save(&ctx.undo_log)?;

    print_summary(callback.log(), Some(&ctx.cwd));

    if !completed {
        return Err(BatchError::Aborted {
            committed: reverted.len(),
            total: inverse.len(),
        });
    }

    Ok(())
}

fn undo_touch(args: &UndoArgs, ctx: &Context, history: &mut UndoChangeLog) -> Result<()> {
    let Some(batch) = history.touches().newest() else {
        return Err(BatchError::NothingToUndo("touch"));
    };

    let inverse = batch.entries.inverse();
    print_touch_plan(
        &format!("Undo Touch Batch ({}):", format_timestamp(&batch.timestamp)),
        &inverse,
        &ctx.cwd,
    );

    if args.dry_run {
        println!("\n{}", "DRY RUN - No changes were made".yellow().bold());
        return Ok(());
    }

    if !confirm_operation(args.yes)? {
        println!("\n{}", "Operation cancelled.".yellow());
        return Err(BatchError::Cancelled);
    }

    let Some(batch) = history.pop_touch() else {
        return Err(BatchError::NothingToUndo("touch"));
    };

    let mut callback = ConsoleCallback::new(ctx.on_error);
    let mut undo = BatchTouch::new(&inverse, &mut callback);
    let completed = undo.execute();
    let reverted = undo.committed().clone();
    drop(undo);

    let remainder = touch_remainder(&batch.entries, &reverted);
    history.push_touch_at(batch.timestamp, remainder);
    history.save(&ctx.undo_log)?;

    print_summary(callback.log(), Some(&ctx.cwd));

    if !completed {
        return Err(BatchError::Aborted {
            committed: reverted.len(),
            total: inverse.len(),
        });
    }

    Ok(())
}

/// Entries of a recorded rename batch that were not moved back.
///
/// `reverted` holds sources of the inverse plan, i.e. the recorded
/// destinations.
fn rename_remainder(recorded: &RenamePlan, reverted: &BTreeSet<PathBuf>) -> RenamePlan {
    recorded
        .iter()
        .filter(|(_, destination)| !reverted.contains(*destination))
        .map(|(s, d)| (s.to_path_buf(), d.to_path_buf()))
        .collect()
}

fn touch_remainder(recorded: &TouchPlan, reverted: &BTreeSet<PathBuf>) -> TouchPlan {
    recorded
        .iter()
        .filter(|change| !reverted.contains(change.path()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::TouchChange;
    use crate::state::FileState;
    use std::path::Path;

    #[test]
    fn test_rename_remainder_keeps_unreverted() {
        let mut recorded = RenamePlan::new();
        recorded.insert("/d/a", "/d/b");
        recorded.insert("/d/c", "/d/e");

        let reverted: BTreeSet<PathBuf> = [PathBuf::from("/d/b")].into();
        let remainder = rename_remainder(&recorded, &reverted);

        assert_eq!(remainder.len(), 1);
        assert_eq!(remainder.get(Path::new("/d/c")), Some(Path::new("/d/e")));
    }

    #[test]
    fn test_touch_remainder_keeps_unreverted() {
        let recorded: TouchPlan = ["/d/a", "/d/b"]
            .into_iter()
            .map(|p| TouchChange::new(FileState::new(p), FileState::new(p)))
            .collect();

        let reverted: BTreeSet<PathBuf> = [PathBuf::from("/d/a")].into();
        let remainder = touch_remainder(&recorded, &reverted);

        assert_eq!(remainder.len(), 1);
        assert!(remainder.get(Path::new("/d/b")).is_some());
    }
}
