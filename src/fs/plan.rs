//! Rename and touch plans.
//!
//! Both plans are ordered by source path. Executors walk them in that order
//! and the undo log writes them in that order, so a plan read back from the
//! log compares equal to the one that was saved.

use crate::state::FileState;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Source path to destination path, unique by source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenamePlan {
    entries: BTreeMap<PathBuf, PathBuf>,
}

impl RenamePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pair, replacing and returning any previous destination for `source`.
    pub fn insert(&mut self, source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Option<PathBuf> {
        self.entries.insert(source.into(), destination.into())
    }

    pub fn remove(&mut self, source: &Path) -> Option<PathBuf> {
        self.entries.remove(source)
    }

    pub fn get(&self, source: &Path) -> Option<&Path> {
        self.entries.get(source).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.entries.iter().map(|(s, d)| (s.as_path(), d.as_path()))
    }

    pub fn sources(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }

    pub fn destinations(&self) -> impl Iterator<Item = &Path> {
        self.entries.values().map(PathBuf::as_path)
    }

    /// Plan that moves every destination back to its source.
    pub fn inverse(&self) -> RenamePlan {
        self.entries
            .iter()
            .map(|(s, d)| (d.clone(), s.clone()))
            .collect()
    }

    /// Pairs whose source is in `sources`.
    pub fn subset(&self, sources: &BTreeSet<PathBuf>) -> RenamePlan {
        self.entries
            .iter()
            .filter(|(s, _)| sources.contains(*s))
            .map(|(s, d)| (s.clone(), d.clone()))
            .collect()
    }
}

impl FromIterator<(PathBuf, PathBuf)> for RenamePlan {
    fn from_iter<I: IntoIterator<Item = (PathBuf, PathBuf)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// One touch: the state read at planning time and the desired state.
///
/// Both sides share the same path. Fields left `None` in `after` are not
/// written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchChange {
    pub before: FileState,
    pub after: FileState,
}

impl TouchChange {
    /// Pairs two states, forcing `after` onto the path of `before`.
    pub fn new(before: FileState, mut after: FileState) -> Self {
        after.path = before.path.clone();
        Self { before, after }
    }

    pub fn path(&self) -> &Path {
        &self.before.path
    }

    /// Change that restores the fields this change writes.
    ///
    /// The inverse's `before` is the state the forward change leaves behind;
    /// its `after` holds the original values of the written fields only.
    pub fn inverse(&self) -> TouchChange {
        let result = FileState {
            path: self.before.path.clone(),
            attributes: self.after.attributes.or(self.before.attributes),
            created: self.after.created.or(self.before.created),
            modified: self.after.modified.or(self.before.modified),
            accessed: self.after.accessed.or(self.before.accessed),
        };
        TouchChange {
            after: self.before.masked_by(&self.after),
            before: result,
        }
    }
}

/// Touch changes keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchPlan {
    entries: BTreeMap<PathBuf, TouchChange>,
}

impl TouchPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a change, replacing and returning any previous change for its path.
    pub fn insert(&mut self, change: TouchChange) -> Option<TouchChange> {
        self.entries.insert(change.path().to_path_buf(), change)
    }

    pub fn get(&self, path: &Path) -> Option<&TouchChange> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TouchChange> {
        self.entries.values()
    }

    pub fn inverse(&self) -> TouchPlan {
        self.entries.values().map(TouchChange::inverse).collect()
    }

    pub fn subset(&self, paths: &BTreeSet<PathBuf>) -> TouchPlan {
        self.entries
            .iter()
            .filter(|(p, _)| paths.contains(*p))
            .map(|(_, c)| c.clone())
            .collect()
    }
}

impl FromIterator<TouchChange> for TouchPlan {
    fn from_iter<I: IntoIterator<Item = TouchChange>>(iter: I) -> Self {
        let mut plan = TouchPlan::new();
        for change in iter {
            plan.insert(change);
        }
        plan
    }
}
