//! Batch attribute and timestamp changes.
//!
//! Paths do not change, so there is nothing to collide with and the batch
//! runs in a single pass. Fields left unset in a change's `after` state are
//! not written.

use super::{BatchState, Outcome, TransactionCallback, run_with_recovery};
use crate::fs::callback::LogEntry;
use crate::fs::plan::TouchPlan;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Executes a [`TouchPlan`] against the filesystem.
#[must_use = "BatchTouch does nothing until executed"]
pub struct BatchTouch<'a> {
    plan: &'a TouchPlan,
    callback: &'a mut dyn TransactionCallback,
    state: BatchState,
    touched: BTreeSet<PathBuf>,
    errors: BTreeMap<PathBuf, String>,
}

impl<'a> BatchTouch<'a> {
    pub fn new(plan: &'a TouchPlan, callback: &'a mut dyn TransactionCallback) -> Self {
        Self {
            plan,
            callback,
            state: BatchState::Pending,
            touched: BTreeSet::new(),
            errors: BTreeMap::new(),
        }
    }

    /// Runs the batch. Returns `false` if the callback aborted.
    pub fn execute(&mut self) -> bool {
        if self.state != BatchState::Pending {
            log::warn!("Touch batch already executed");
            return self.state == BatchState::Completed;
        }

        log::debug!(
            "Touching {} entries (owner: {:?})",
            self.plan.len(),
            self.callback.owner()
        );

        let plan = self.plan;
        self.state = BatchState::Completed;

        for change in plan.iter() {
            let path = change.path();
            if change.after.is_noop() {
                log::debug!("Nothing to change, skipping: {}", path.display());
                self.touched.insert(path.to_path_buf());
                continue;
            }

            match run_with_recovery(&mut *self.callback, path, || change.after.apply()) {
                Outcome::Committed => {
                    log::debug!("Touched: {}", path.display());
                    self.touched.insert(path.to_path_buf());
                }
                Outcome::Skipped(message) => {
                    self.errors.insert(path.to_path_buf(), message);
                }
                Outcome::Aborted(message) => {
                    self.errors.insert(path.to_path_buf(), message);
                    self.state = BatchState::Aborted;
                    break;
                }
            }
        }

        self.write_log();

        log::info!(
            "Touch batch {}: {} of {} committed",
            if self.state == BatchState::Completed { "completed" } else { "aborted" },
            self.touched.len(),
            self.plan.len()
        );

        self.state == BatchState::Completed
    }

    /// Paths whose change was fully applied.
    pub fn committed(&self) -> &BTreeSet<PathBuf> {
        &self.touched
    }

    /// The committed part of the plan, ready for the undo log.
    pub fn committed_plan(&self) -> TouchPlan {
        self.plan.subset(&self.touched)
    }

    pub fn is_aborted(&self) -> bool {
        self.state == BatchState::Aborted
    }

    fn write_log(&mut self) {
        let plan = self.plan;
        let Some(logger) = self.callback.logger() else {
            return;
        };

        for change in plan.iter() {
            let source = format!("{} :: {}", change.path().display(), change.before.brace_block());
            let destination = change.after.brace_block();

            if self.touched.contains(change.path()) {
                logger.record(LogEntry::success(source, destination));
            } else if let Some(message) = self.errors.get(change.path()) {
                logger.record(LogEntry::failure(source, destination, message));
            }
        }
    }
}

impl Drop for BatchTouch<'_> {
    fn drop(&mut self) {
        if self.state == BatchState::Pending && !self.plan.is_empty() {
            log::warn!("Touch batch dropped without executing");
        }
    }
}
