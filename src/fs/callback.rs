//! Collaborator contract between the batch executors and whoever drives them.
//!
//! Executors never decide on their own how to recover from a failed entry.
//! They hand the failing path and a readable message to
//! [`TransactionCallback::handle_file_error`] and act on the returned
//! [`ErrorAction`]. The callback also supplies an optional
//! [`TransactionLog`] that receives one [`LogEntry`] per processed pair.

use std::fmt;
use std::path::Path;

/// Decision for a failed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Stop the batch. Entries committed so far stay committed.
    Abort,
    /// Attempt the same entry again.
    Retry,
    /// Leave this entry uncommitted and continue with the next one.
    Ignore,
}

/// Opaque handle of the window or terminal that owns error prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerHandle(pub usize);

/// Result of one pair in a batch, as written to the transaction log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Display form of the source side.
    pub source: String,
    /// Display form of the destination side.
    pub destination: String,
    /// Failure message, if the pair did not commit.
    pub error: Option<String>,
}

impl LogEntry {
    pub fn success(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            error: None,
        }
    }

    pub fn failure(
        source: impl Into<String>,
        destination: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => write!(f, "{} -> {}", self.source, self.destination),
            Some(message) => write!(
                f,
                "{} -> ERROR: {} / {}",
                self.source, message, self.destination
            ),
        }
    }
}

/// Sink for per-pair transaction results.
pub trait TransactionLog {
    fn record(&mut self, entry: LogEntry);
}

/// Transaction log that keeps every entry in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    entries: Vec<LogEntry>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries rendered in the transaction log line format.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }

    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_success()).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl TransactionLog for MemoryLog {
    fn record(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }
}

/// Context a batch executor runs in.
pub trait TransactionCallback {
    /// Owner of any prompt raised by [`handle_file_error`](Self::handle_file_error).
    fn owner(&self) -> Option<OwnerHandle> {
        None
    }

    /// Transaction log, if results should be recorded.
    fn logger(&mut self) -> Option<&mut dyn TransactionLog>;

    /// Decides how to continue after `path` failed with `message`.
    fn handle_file_error(&mut self, path: &Path, message: &str) -> ErrorAction;
}

/// Callback that answers every error with the same action.
///
/// `Retry` is rejected by the constructor since a fixed retry never ends.
#[derive(Debug)]
pub struct FixedPolicy {
    action: ErrorAction,
    log: MemoryLog,
}

impl FixedPolicy {
    pub fn new(action: ErrorAction) -> Option<Self> {
        (action != ErrorAction::Retry).then(|| Self {
            action,
            log: MemoryLog::new(),
        })
    }

    pub fn log(&self) -> &MemoryLog {
        &self.log
    }
}

impl TransactionCallback for FixedPolicy {
    fn logger(&mut self) -> Option<&mut dyn TransactionLog> {
        Some(&mut self.log)
    }

    fn handle_file_error(&mut self, path: &Path, message: &str) -> ErrorAction {
        log::warn!("{}: {} ({:?})", path.display(), message, self.action);
        self.action
    }
}
