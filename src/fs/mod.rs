//! Batch file mutations with interactive error recovery.
//!
//! The filesystem offers no multi-file transaction, so the executors in this
//! module emulate one: every entry is tracked individually, failures are
//! routed to a [`TransactionCallback`] for an Abort/Retry/Ignore decision, and
//! the set of committed entries is exposed afterwards so it can be pushed onto
//! the undo log.

pub mod callback;
pub mod plan;
pub mod rename;
pub mod touch;

pub use callback::{
    ErrorAction, FixedPolicy, LogEntry, MemoryLog, OwnerHandle, TransactionCallback,
    TransactionLog,
};
pub use plan::{RenamePlan, TouchChange, TouchPlan};
pub use rename::BatchRename;
pub use touch::BatchTouch;

use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchState {
    /// Not executed yet.
    Pending,
    /// Every entry was attempted; some may have been ignored.
    Completed,
    /// Stopped by an abort decision.
    Aborted,
}

/// How one entry ended after the callback had its say.
#[derive(Debug)]
enum Outcome {
    Committed,
    Skipped(String),
    Aborted(String),
}

/// Readable message for a failed operation on `subject`.
///
/// A vanished file gets a fixed message instead of the OS text, which tends
/// to be vague about which side of a rename was missing.
fn describe_error(subject: &Path, err: &io::Error) -> String {
    if err.kind() == io::ErrorKind::NotFound && fs_exists(subject) == Some(false) {
        format!("cannot find file: {}", subject.display())
    } else {
        err.to_string()
    }
}

fn fs_exists(path: &Path) -> Option<bool> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Some(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Some(false),
        Err(_) => None,
    }
}

/// Runs `op` until it succeeds or the callback decides to stop retrying.
///
/// There is no retry limit; a `Retry` answer always re-runs `op`.
fn run_with_recovery<F>(callback: &mut dyn TransactionCallback, subject: &Path, mut op: F) -> Outcome
where
    F: FnMut() -> io::Result<()>,
{
    loop {
        let err = match op() {
            Ok(()) => return Outcome::Committed,
            Err(e) => e,
        };

        let message = describe_error(subject, &err);
        log::debug!("Failed on {}: {}", subject.display(), message);

        match callback.handle_file_error(subject, &message) {
            ErrorAction::Retry => log::debug!("Retrying: {}", subject.display()),
            ErrorAction::Ignore => return Outcome::Skipped(message),
            ErrorAction::Abort => return Outcome::Aborted(message),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted callback shared by executor tests.

    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    /// Answers errors from a queue; an empty queue answers `Abort`.
    #[derive(Default)]
    pub struct Scripted {
        pub answers: VecDeque<ErrorAction>,
        pub seen: Vec<(PathBuf, String)>,
        pub log: MemoryLog,
        /// Run before each answer, so a test can fix the problem before a retry.
        pub on_error: Option<Box<dyn FnMut(&Path)>>,
    }

    impl Scripted {
        pub fn new(answers: impl IntoIterator<Item = ErrorAction>) -> Self {
            Self {
                answers: answers.into_iter().collect(),
                ..Self::default()
            }
        }
    }

    impl TransactionCallback for Scripted {
        fn logger(&mut self) -> Option<&mut dyn TransactionLog> {
            Some(&mut self.log)
        }

        fn handle_file_error(&mut self, path: &Path, message: &str) -> ErrorAction {
            self.seen.push((path.to_path_buf(), message.to_string()));
            if let Some(hook) = self.on_error.as_mut() {
                hook(path);
            }
            self.answers.pop_front().unwrap_or(ErrorAction::Abort)
        }
    }
}
