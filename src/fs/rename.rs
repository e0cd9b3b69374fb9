//! Two-phase batch rename.
//!
//! A single pass of `rename(source, destination)` breaks as soon as one
//! entry's destination is another entry's source (`A → B, B → A`). The batch
//! therefore runs in three steps:
//!
//! 1. **Intermediate names**: every destination gets a sibling name
//!    `<stem>_<hex><ext>` that collides with nothing in the plan or on disk
//! 2. **Stage**: each source is renamed to its intermediate name
//! 3. **Commit**: each staged intermediate is renamed to its destination
//!
//! Failures in either phase go to the [`TransactionCallback`]. An abort while
//! staging still commits what was already staged; an abort while committing
//! moves the remaining staged files back to their source names.
//!
//! ## Example
//!
//! ```no_run
//! # use batchmv::fs::{BatchRename, ErrorAction, FixedPolicy, RenamePlan};
//! let mut plan = RenamePlan::new();
//! plan.insert("photos/a.jpg", "photos/b.jpg");
//! plan.insert("photos/b.jpg", "photos/a.jpg");
//!
//! let mut callback = FixedPolicy::new(ErrorAction::Ignore).unwrap();
//! let mut batch = BatchRename::new(&plan, &mut callback);
//! let completed = batch.execute();
//! let committed = batch.committed_plan(); // goes onto the undo log
//! # let _ = (completed, committed);
//! ```

use super::{BatchState, Outcome, TransactionCallback, describe_error, fs_exists, run_with_recovery};
use crate::fs::callback::LogEntry;
use crate::fs::plan::RenamePlan;

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Attempts at finding an intermediate name set with no collisions.
const MAX_SUFFIX_ATTEMPTS: usize = 16;

/// Executes a [`RenamePlan`] against the filesystem.
#[must_use = "BatchRename does nothing until executed"]
pub struct BatchRename<'a> {
    plan: &'a RenamePlan,
    callback: &'a mut dyn TransactionCallback,
    state: BatchState,
    intermediates: BTreeMap<PathBuf, PathBuf>,
    renamed: BTreeSet<PathBuf>,
    errors: BTreeMap<PathBuf, String>,
}

impl<'a> BatchRename<'a> {
    pub fn new(plan: &'a RenamePlan, callback: &'a mut dyn TransactionCallback) -> Self {
        Self {
            plan,
            callback,
            state: BatchState::Pending,
            intermediates: BTreeMap::new(),
            renamed: BTreeSet::new(),
            errors: BTreeMap::new(),
        }
    }

    /// Runs the batch.
    ///
    /// Returns `false` if the callback aborted. Entries committed before the
    /// abort stay committed and are reported by [`committed`](Self::committed).
    /// A batch can only run once; later calls return the first result.
    pub fn execute(&mut self) -> bool {
        if self.state != BatchState::Pending {
            log::warn!("Rename batch already executed");
            return self.state == BatchState::Completed;
        }

        log::debug!(
            "Renaming {} entries (owner: {:?})",
            self.plan.len(),
            self.callback.owner()
        );

        self.make_intermediate_paths();
        let staged_all = self.rename_sources_to_intermediates();
        let committed_all = self.rename_intermediates_to_destinations();
        self.write_log();

        self.state = if staged_all && committed_all {
            BatchState::Completed
        } else {
            BatchState::Aborted
        };

        log::info!(
            "Rename batch {}: {} of {} committed",
            if self.state == BatchState::Completed { "completed" } else { "aborted" },
            self.renamed.len(),
            self.plan.len()
        );

        self.state == BatchState::Completed
    }

    /// Sources whose rename succeeded end-to-end.
    pub fn committed(&self) -> &BTreeSet<PathBuf> {
        &self.renamed
    }

    /// The committed part of the plan, ready for the undo log.
    pub fn committed_plan(&self) -> RenamePlan {
        self.plan.subset(&self.renamed)
    }

    /// Intermediate name chosen for `source`, once the batch has run.
    pub fn intermediate_path(&self, source: &Path) -> Option<&Path> {
        self.intermediates.get(source).map(PathBuf::as_path)
    }

    pub fn is_aborted(&self) -> bool {
        self.state == BatchState::Aborted
    }

    /// Picks one suffix for the whole batch and derives every intermediate name.
    fn make_intermediate_paths(&mut self) {
        let plan = self.plan;
        let reserved: HashSet<&Path> = plan.sources().chain(plan.destinations()).collect();

        for attempt in 1..=MAX_SUFFIX_ATTEMPTS {
            let suffix = format!("{:x}", next_tick());
            self.intermediates = plan
                .iter()
                .map(|(source, destination)| {
                    (source.to_path_buf(), intermediate_path(destination, &suffix))
                })
                .collect();

            let collision = self
                .intermediates
                .values()
                .find(|p| reserved.contains(p.as_path()) || fs_exists(p) != Some(false));

            match collision {
                None => return,
                Some(path) => log::debug!(
                    "Intermediate name taken (attempt {}): {}",
                    attempt,
                    path.display()
                ),
            }
        }

        log::warn!("Could not find a free intermediate suffix; renames may fail");
    }

    fn rename_sources_to_intermediates(&mut self) -> bool {
        let plan = self.plan;

        for (source, _) in plan.iter() {
            let Some(intermediate) = self.intermediates.get(source).cloned() else {
                continue;
            };

            let outcome = run_with_recovery(&mut *self.callback, source, || {
                if let Some(parent) = intermediate.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                fs::rename(source, &intermediate)
            });

            match outcome {
                Outcome::Committed => {
                    log::debug!("Staged: {} → {}", source.display(), intermediate.display());
                    self.renamed.insert(source.to_path_buf());
                }
                Outcome::Skipped(message) => {
                    self.errors.insert(source.to_path_buf(), message);
                }
                Outcome::Aborted(message) => {
                    self.errors.insert(source.to_path_buf(), message);
                    return false;
                }
            }
        }

        true
    }

    fn rename_intermediates_to_destinations(&mut self) -> bool {
        let staged: Vec<(PathBuf, PathBuf, PathBuf)> = self
            .plan
            .iter()
            .filter(|(source, _)| self.renamed.contains(*source))
            .filter_map(|(source, destination)| {
                let intermediate = self.intermediates.get(source)?;
                Some((source.to_path_buf(), intermediate.clone(), destination.to_path_buf()))
            })
            .collect();

        for (idx, (source, intermediate, destination)) in staged.iter().enumerate() {
            let outcome = run_with_recovery(&mut *self.callback, intermediate, || {
                rename_no_clobber(intermediate, destination)
            });

            match outcome {
                Outcome::Committed => {
                    log::debug!("Renamed: {} → {}", source.display(), destination.display());
                }
                Outcome::Skipped(message) => {
                    self.renamed.remove(source);
                    let message = restore(intermediate, source, message);
                    self.errors.insert(source.clone(), message);
                }
                Outcome::Aborted(message) => {
                    self.renamed.remove(source);
                    let message = restore(intermediate, source, message);
                    self.errors.insert(source.clone(), message);
                    self.roll_back_staged(&staged[idx + 1..]);
                    return false;
                }
            }
        }

        true
    }

    /// Moves staged entries that will not be committed back to their sources.
    fn roll_back_staged(&mut self, staged: &[(PathBuf, PathBuf, PathBuf)]) {
        log::warn!("Rolling back {} staged renames...", staged.len());

        for (source, intermediate, _) in staged {
            self.renamed.remove(source);
            let message = restore(intermediate, source, "batch aborted".to_string());
            self.errors.insert(source.clone(), message);
        }
    }

    fn write_log(&mut self) {
        let plan = self.plan;
        let Some(logger) = self.callback.logger() else {
            return;
        };

        for (source, destination) in plan.iter() {
            let source_display = source.display().to_string();
            let destination_display = destination.display().to_string();

            if self.renamed.contains(source) {
                logger.record(LogEntry::success(source_display, destination_display));
            } else if let Some(message) = self.errors.get(source) {
                logger.record(LogEntry::failure(source_display, destination_display, message));
            }
        }
    }
}

impl Drop for BatchRename<'_> {
    fn drop(&mut self) {
        if self.state == BatchState::Pending && !self.plan.is_empty() {
            log::warn!("Rename batch dropped without executing");
        }
    }
}

/// Moves `intermediate` back to `source`, noting the result in `message`.
///
/// A file now sitting at `source` (e.g. another entry's committed rename in a
/// chain) is kept; the staged file then stays under its intermediate name.
fn restore(intermediate: &Path, source: &Path, message: String) -> String {
    match rename_no_clobber(intermediate, source) {
        Ok(()) => {
            log::debug!("Restored: {} → {}", intermediate.display(), source.display());
            message
        }
        Err(e) => {
            log::error!(
                "Failed to restore {} to {}: {}",
                intermediate.display(),
                source.display(),
                describe_error(intermediate, &e)
            );
            format!("{} (left as {})", message, intermediate.display())
        }
    }
}

/// Renames without replacing an existing destination.
///
/// POSIX `rename` silently overwrites its target, which would destroy a file
/// the plan never mentioned.
fn rename_no_clobber(from: &Path, to: &Path) -> io::Result<()> {
    if fs_exists(to) == Some(true) {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("destination already exists: {}", to.display()),
        ));
    }
    fs::rename(from, to)
}

/// `<stem>_<suffix><.ext>` in the directory of `destination`.
fn intermediate_path(destination: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::new();
    if let Some(stem) = destination.file_stem() {
        name.push(stem);
    }
    name.push("_");
    name.push(suffix);
    if let Some(ext) = destination.extension() {
        name.push(".");
        name.push(ext);
    }
    destination.with_file_name(name)
}

/// Monotonically increasing millisecond tick, unique per call.
fn next_tick() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);

    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let mut tick = now;
    let _ = LAST.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        tick = now.max(last + 1);
        Some(tick)
    });
    tick
}
