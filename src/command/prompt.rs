//! Terminal prompts: plan confirmation and per-file error decisions.
//!
//! Prompts are written to stderr so stdout stays a clean report. When stdin
//! is not a terminal nothing is asked: confirmation is declined and file
//! errors abort the batch, unless a fixed policy was chosen with
//! `--on-error`.

use crate::cli::OnError;
use crate::error::Result;
use crate::fs::{ErrorAction, FixedPolicy, MemoryLog, TransactionCallback, TransactionLog};

use colored::Colorize;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

/// Asks the user to confirm a plan that has already been printed.
///
/// # Returns
///
/// - `Ok(true)` if the user confirms or `skip` is set
/// - `Ok(false)` if the user declines or stdin is not a terminal
pub fn confirm_operation(skip: bool) -> Result<bool> {
    if skip {
        return Ok(true);
    }

    if !io::stdin().is_terminal() {
        log::warn!("Non-interactive terminal detected. Use --yes to confirm automatically.");
        return Ok(false);
    }

    eprint!("{} {} ", "Continue?".bold(), "(y/N)".dimmed());
    io::stderr().flush()?;

    let mut response = String::new();
    io::stdin().read_line(&mut response)?;

    let confirmed =
        response.trim().eq_ignore_ascii_case("y") || response.trim().eq_ignore_ascii_case("yes");

    if !confirmed {
        log::info!("Batch cancelled by user");
    }

    Ok(confirmed)
}

/// Callback for batches run from the command line.
///
/// `--on-error abort|ignore` answers through a [`FixedPolicy`]; `ask`
/// prompts when stdin is a terminal.
pub struct ConsoleCallback {
    fixed: Option<FixedPolicy>,
    interactive: bool,
    log: MemoryLog,
}

impl ConsoleCallback {
    pub fn new(policy: OnError) -> Self {
        let fixed = match policy {
            OnError::Ask => None,
            OnError::Abort => FixedPolicy::new(ErrorAction::Abort),
            OnError::Ignore => FixedPolicy::new(ErrorAction::Ignore),
        };

        Self {
            fixed,
            interactive: io::stdin().is_terminal(),
            log: MemoryLog::new(),
        }
    }

    pub fn log(&self) -> &MemoryLog {
        &self.log
    }

    fn ask(&self, path: &Path, message: &str) -> ErrorAction {
        eprintln!("\n{} {}", "Error:".red().bold(), path.display());
        eprintln!("  {}", message);

        let stdin = io::stdin();
        loop {
            eprint!("{} ", "[A]bort, [R]etry or [I]gnore?".bold());
            let _ = io::stderr().flush();

            let mut response = String::new();
            match stdin.lock().read_line(&mut response) {
                Ok(0) | Err(_) => return ErrorAction::Abort,
                Ok(_) => {}
            }

            if let Some(action) = parse_action(&response) {
                return action;
            }
        }
    }
}

impl TransactionCallback for ConsoleCallback {
    fn logger(&mut self) -> Option<&mut dyn TransactionLog> {
        Some(&mut self.log)
    }

    fn handle_file_error(&mut self, path: &Path, message: &str) -> ErrorAction {
        if let Some(fixed) = self.fixed.as_mut() {
            return fixed.handle_file_error(path, message);
        }

        if !self.interactive {
            log::warn!(
                "{}: {} (non-interactive, aborting; use --on-error ignore to continue)",
                path.display(),
                message
            );
            return ErrorAction::Abort;
        }

        self.ask(path, message)
    }
}

fn parse_action(response: &str) -> Option<ErrorAction> {
    match response.trim().to_ascii_lowercase().as_str() {
        "a" | "abort" => Some(ErrorAction::Abort),
        "r" | "retry" => Some(ErrorAction::Retry),
        "i" | "ignore" => Some(ErrorAction::Ignore),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        assert_eq!(parse_action("a\n"), Some(ErrorAction::Abort));
        assert_eq!(parse_action(" Retry "), Some(ErrorAction::Retry));
        assert_eq!(parse_action("I"), Some(ErrorAction::Ignore));
        assert_eq!(parse_action("maybe"), None);
    }

    #[test]
    fn test_fixed_policies_do_not_prompt() {
        let mut abort = ConsoleCallback::new(OnError::Abort);
        assert_eq!(
            abort.handle_file_error(Path::new("x"), "denied"),
            ErrorAction::Abort
        );

        let mut ignore = ConsoleCallback::new(OnError::Ignore);
        assert_eq!(
            ignore.handle_file_error(Path::new("x"), "denied"),
            ErrorAction::Ignore
        );
        // Answers are repeated for every failure
        assert_eq!(
            ignore.handle_file_error(Path::new("y"), "denied"),
            ErrorAction::Ignore
        );
        assert!(ignore.fixed.is_some());
        assert!(ConsoleCallback::new(OnError::Ask).fixed.is_none());
    }

    #[test]
    fn test_skip_confirmation() {
        assert!(confirm_operation(true).unwrap());
    }
}
