use super::Context;
use super::prompt::{ConsoleCallback, confirm_operation};
use super::report::{print_summary, print_touch_plan};
use crate::error::{BatchError, Result};
use crate::fs::{BatchTouch, TouchChange, TouchPlan};
use crate::history::UndoChangeLog;
use crate::state::{Attributes, FileState};
use crate::validation::{parse_attributes_arg, parse_timestamp_arg};

use chrono::NaiveDateTime;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
pub struct TouchArgs {
    /// Files to change
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// New modification time: "dd-mm-yyyy hh:mm:ss" or "now"
    #[arg(long, short = 'm', value_name = "TIME", value_parser = parse_timestamp_arg)]
    pub modified: Option<NaiveDateTime>,

    /// New access time: "dd-mm-yyyy hh:mm:ss" or "now"
    #[arg(long, short = 'a', value_name = "TIME", value_parser = parse_timestamp_arg)]
    pub accessed: Option<NaiveDateTime>,

    /// New creation time (applied on Windows only)
    #[arg(long, short = 'c', value_name = "TIME", value_parser = parse_timestamp_arg)]
    pub created: Option<NaiveDateTime>,

    /// New attribute flags from R, H, S, A; N clears all of them
    #[arg(long, value_name = "KEYS", value_parser = parse_attributes_arg)]
    pub attributes: Option<Attributes>,

    /// Show what would change without touching anything
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Skip the interactive confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl TouchArgs {
    /// Desired state carrying only the fields given on the command line.
    fn desired(&self) -> FileState {
        FileState {
            path: PathBuf::new(),
            attributes: self.attributes,
            created: self.created,
            modified: self.modified,
            accessed: self.accessed,
        }
    }
}

pub fn execute(args: TouchArgs, ctx: &Context) -> Result<()> {
    let desired = args.desired();
    if desired.is_noop() {
        return Err(BatchError::InvalidPlan(
            "nothing to change: pass --modified, --accessed, --created or --attributes"
                .to_string(),
        ));
    }

    let plan = build_plan(&args.paths, &desired)?;

    print_touch_plan("Touch Plan:", &plan, &ctx.cwd);

    if args.dry_run {
        println!("\n{}", "DRY RUN - No changes were made".yellow().bold());
        return Ok(());
    }

    if !confirm_operation(args.yes)? {
        println!("\n{}", "Operation cancelled.".yellow());
        return Err(BatchError::Cancelled);
    }

    let mut history = UndoChangeLog::load(&ctx.undo_log)?;
    let mut callback = ConsoleCallback::new(ctx.on_error);

    let mut batch = BatchTouch::new(&plan, &mut callback);
    let completed = batch.execute();
    let committed = batch.committed_plan();
    drop(batch);

    let committed_count = committed.len();
    history.push_touch(committed);
    history.save(&ctx.undo_log)?;

    print_summary(callback.log(), Some(&ctx.cwd));

    if !completed {
        return Err(BatchError::Aborted {
            committed: committed_count,
            total: plan.len(),
        });
    }

    Ok(())
}

/// Captures the current state of every path and pairs it with `desired`.
pub fn build_plan(paths: &[PathBuf], desired: &FileState) -> Result<TouchPlan> {
    let mut plan = TouchPlan::new();

    for path in paths {
        let path = std::path::absolute(path)?;
        if !path.exists() {
            return Err(BatchError::InvalidPath(
                path.display().to_string(),
                "cannot find file".to_string(),
            ));
        }

        let before = FileState::capture(&path)?;
        plan.insert(TouchChange::new(before, desired.clone()));
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::parse_timestamp;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_build_plan_captures_before() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "x").unwrap();

        let ts = parse_timestamp("01-02-2020 03:04:05").unwrap();
        let desired = FileState::new("").with_modified(ts);
        let plan = build_plan(&[file.clone()], &desired).unwrap();

        let change = plan.get(&std::path::absolute(&file).unwrap()).unwrap();
        assert_eq!(change.after.modified, Some(ts));
        assert!(change.after.accessed.is_none());
        assert!(change.before.modified.is_some());
        assert_eq!(change.after.path, change.before.path);
    }

    #[test]
    fn test_build_plan_missing_file() {
        let temp = TempDir::new().unwrap();
        let desired = FileState::new("").with_attributes(Attributes::empty());
        let err = build_plan(&[temp.path().join("missing")], &desired).unwrap_err();
        assert!(err.to_string().contains("cannot find file"));
    }
}
