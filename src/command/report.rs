//! Plan previews and batch summaries printed to stdout.

use crate::fs::{LogEntry, MemoryLog, RenamePlan, TouchPlan};

use colored::Colorize;
use std::path::Path;

/// Successful entries listed before the rest are folded into a count.
const MAX_LISTED: usize = 20;

/// Path relative to `base` with forward slashes, or the path as given.
pub fn display_path(path: &Path, base: &Path) -> String {
    let relative = if path.is_absolute() {
        pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
    } else {
        path.to_path_buf()
    };
    relative.to_string_lossy().replace('\\', "/")
}

pub fn print_rename_plan(title: &str, plan: &RenamePlan, base: &Path) {
    println!("\n{}", title.bold().cyan());
    for (idx, (source, destination)) in plan.iter().enumerate() {
        if idx == MAX_LISTED {
            println!("   • ... and {} more", plan.len() - MAX_LISTED);
            break;
        }
        println!(
            "   {} → {}",
            display_path(source, base).yellow(),
            display_path(destination, base).green()
        );
    }
    println!(
        "\n{} {} to rename",
        plan.len().to_string().cyan().bold(),
        if plan.len() == 1 { "file" } else { "files" }
    );
}

pub fn print_touch_plan(title: &str, plan: &TouchPlan, base: &Path) {
    println!("\n{}", title.bold().cyan());
    for (idx, change) in plan.iter().enumerate() {
        if idx == MAX_LISTED {
            println!("   • ... and {} more", plan.len() - MAX_LISTED);
            break;
        }
        println!(
            "   {} {} → {}",
            display_path(change.path(), base),
            change.before.brace_block().dimmed(),
            change.after.brace_block().green()
        );
    }
    println!(
        "\n{} {} to touch",
        plan.len().to_string().cyan().bold(),
        if plan.len() == 1 { "file" } else { "files" }
    );
}

/// Prints the transaction log of a finished batch.
///
/// Rename entries are shown relative to `base`; touch entries carry state
/// blocks and are shown as logged.
pub fn print_summary(log: &MemoryLog, base: Option<&Path>) {
    if log.entries().is_empty() {
        println!("\n{}", "No changes made".yellow());
        return;
    }

    let show = |text: &str| match base {
        Some(base) => display_path(Path::new(text), base),
        None => text.to_string(),
    };

    let (ok, failed): (Vec<&LogEntry>, Vec<&LogEntry>) =
        log.entries().iter().partition(|e| e.is_success());

    println!("\n{}", "Changes applied:".green().bold());
    for entry in ok.iter().take(MAX_LISTED) {
        println!(
            "   {} {} → {}",
            "✓".green(),
            show(entry.source.as_str()).dimmed(),
            show(entry.destination.as_str())
        );
    }
    if ok.len() > MAX_LISTED {
        println!("   {} {} more...", "✓".green(), ok.len() - MAX_LISTED);
    }

    if !failed.is_empty() {
        println!("\n{}", "Failed:".red().bold());
        for entry in &failed {
            println!(
                "   {} {} → {}: {}",
                "✗".red(),
                show(entry.source.as_str()),
                show(entry.destination.as_str()),
                entry.error.as_deref().unwrap_or_default().red()
            );
        }
    }

    println!();
    println!(
        "{} {} of {} entries committed",
        if failed.is_empty() { "✓".green().bold() } else { "!".yellow().bold() },
        ok.len(),
        log.entries().len()
    );
}
