//! Error types for batchmv.
//!
//! All fallible operations return `Result<T>` which aliases `Result<T, BatchError>`.
//! Per-file failures inside a running batch are not errors at this level: they
//! are handed to a [`TransactionCallback`](crate::fs::TransactionCallback) which
//! decides whether to abort, retry or ignore.

use thiserror::Error;

/// Errors from batch planning, history persistence and the command layer.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The requested plan cannot be executed as given.
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// Invalid path argument.
    #[error("Invalid path '{0}': {1}")]
    InvalidPath(String, String),

    /// Invalid timestamp or attribute argument.
    #[error("Invalid value '{0}': {1}")]
    InvalidValue(String, String),

    /// The selected undo stack is empty.
    #[error("Nothing to undo: no {0} batches recorded")]
    NothingToUndo(&'static str),

    /// The batch stopped early because the user chose abort.
    ///
    /// Entries committed before the abort are still recorded in the undo log.
    #[error("Batch aborted after {committed} of {total} entries")]
    Aborted { committed: usize, total: usize },

    /// User declined confirmation.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// File system operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Regex compilation failed.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Directory walk failed.
    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),

    /// Unexpected error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for batchmv operations.
pub type Result<T> = std::result::Result<T, BatchError>;
