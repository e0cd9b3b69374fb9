use super::Context;
use super::prompt::{ConsoleCallback, confirm_operation};
use super::report::{print_rename_plan, print_summary};
use crate::error::{BatchError, Result};
use crate::fs::{BatchRename, RenamePlan};
use crate::history::UndoChangeLog;
use crate::validation::validate_rename_plan;

use clap::Parser;
use colored::Colorize;
use ignore::WalkBuilder;
use regex::Regex;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
pub struct RenameArgs {
    /// Source and destination pairs: SRC DST [SRC DST ...]
    ///
    /// A destination without a directory part stays next to its source.
    #[arg(value_name = "PATH", conflicts_with = "pattern")]
    pub paths: Vec<PathBuf>,

    /// Build the plan from file names matching this regex
    ///
    /// Examples:
    ///   --pattern '^IMG_(\d+)' --replace 'photo-$1'
    ///   --pattern '\.jpeg$' --replace '.jpg' --recursive
    #[arg(long, short = 'e', value_name = "REGEX", requires = "replace", verbatim_doc_comment)]
    pub pattern: Option<String>,

    /// Replacement for --pattern; `$1` or `${name}` insert captures
    #[arg(long, short = 'r', value_name = "TEXT", requires = "pattern")]
    pub replace: Option<String>,

    /// Directory searched by --pattern
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Descend into subdirectories when searching with --pattern
    #[arg(long)]
    pub recursive: bool,

    /// Show what would change without renaming anything
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Skip the interactive confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn execute(args: RenameArgs, ctx: &Context) -> Result<()> {
    let plan = match (&args.pattern, &args.replace) {
        (Some(pattern), Some(replace)) => {
            plan_from_pattern(&args.dir, pattern, replace, args.recursive)?
        }
        _ => plan_from_pairs(&args.paths)?,
    };
    let plan = validate_rename_plan(plan)?;

    if plan.is_empty() {
        println!("\n{}", "No files to rename".yellow());
        return Ok(());
    }

    print_rename_plan("Rename Plan:", &plan, &ctx.cwd);

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

    let mut batch = BatchRename::new(&plan, &mut callback);
    let completed = batch.execute();
    let committed = batch.committed_plan();
    drop(batch);

    let committed_count = committed.len();
    history.push_rename(committed);
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

/// Builds a plan from alternating source and destination arguments.
pub fn plan_from_pairs(paths: &[PathBuf]) -> Result<RenamePlan> {
    if paths.is_empty() {
        return Err(BatchError::InvalidPlan(
            "nothing to rename: pass SRC DST pairs or --pattern".to_string(),
        ));
    }

    if paths.len() % 2 != 0 {
        return Err(BatchError::InvalidPlan(format!(
            "expected SRC DST pairs, got {} paths",
            paths.len()
        )));
    }

    let mut plan = RenamePlan::new();
    for pair in paths.chunks_exact(2) {
        let source = std::path::absolute(&pair[0])?;
        let destination = sibling_or_absolute(&source, &pair[1])?;

        if let Some(previous) = plan.insert(source.clone(), destination) {
            return Err(BatchError::InvalidPlan(format!(
                "{} is listed twice (already renamed to {})",
                source.display(),
                previous.display()
            )));
        }
    }

    Ok(plan)
}

/// Builds a plan by applying `pattern` → `replace` to file names under `dir`.
///
/// Hidden and ignored files are skipped, following `ignore` defaults.
pub fn plan_from_pattern(
    dir: &Path,
    pattern: &str,
    replace: &str,
    recursive: bool,
) -> Result<RenamePlan> {
    let regex = Regex::new(pattern)?;
    let root = std::path::absolute(dir)?;

    if !root.is_dir() {
        return Err(BatchError::InvalidPath(
            dir.display().to_string(),
            "not a directory".to_string(),
        ));
    }

    let mut plan = RenamePlan::new();
    let walker = WalkBuilder::new(&root)
        .max_depth(if recursive { None } else { Some(1) })
        .build();

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            log::debug!("Skipping non-UTF-8 name: {}", entry.path().display());
            continue;
        };

        if !regex.is_match(name) {
            continue;
        }

        let new_name = regex.replace(name, replace);
        if new_name != name {
            log::debug!("Matched: {} → {}", name, new_name);
            plan.insert(entry.path(), entry.path().with_file_name(&*new_name));
        }
    }

    Ok(plan)
}

fn sibling_or_absolute(source: &Path, destination: &Path) -> Result<PathBuf> {
    let bare_name = destination
        .parent()
        .is_some_and(|parent| parent.as_os_str().is_empty());

    match source.parent() {
        Some(parent) if bare_name => Ok(parent.join(destination)),
        _ => Ok(std::path::absolute(destination)?),
    }
}
