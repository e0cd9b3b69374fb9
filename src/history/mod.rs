//! Undo history of committed batches.
//!
//! Two bounded stacks, one per mutation kind, persisted as a human-readable
//! text file next to the executable. Pushing past the depth limit drops the
//! oldest batch. See [`format`] for the file grammar.

pub mod format;

use crate::error::Result;
use crate::fs::plan::{RenamePlan, TouchPlan};
use crate::state;

use chrono::NaiveDateTime;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

/// Batches kept per stack unless configured otherwise.
pub const DEFAULT_DEPTH: usize = 20;

/// Appended to the executable's stem to name the default log file.
pub const LOG_SUFFIX: &str = "_undo.log";

/// One committed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<P> {
    pub timestamp: NaiveDateTime,
    pub entries: P,
}

impl<P> Batch<P> {
    pub fn new(timestamp: NaiveDateTime, entries: P) -> Self {
        Self { timestamp, entries }
    }
}

/// Bounded stack of batches, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoStack<P> {
    batches: VecDeque<Batch<P>>,
    capacity: usize,
}

impl<P> UndoStack<P> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            batches: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Appends `batch` as the newest entry, returning the evicted oldest batch if
    /// the stack was full.
    pub fn push(&mut self, batch: Batch<P>) -> Option<Batch<P>> {
        self.batches.push_back(batch);
        if self.batches.len() > self.capacity {
            self.batches.pop_front()
        } else {
            None
        }
    }

    /// Removes and returns the newest batch.
    pub fn pop(&mut self) -> Option<Batch<P>> {
        self.batches.pop_back()
    }

    pub fn newest(&self) -> Option<&Batch<P>> {
        self.batches.back()
    }

    pub fn oldest(&self) -> Option<&Batch<P>> {
        self.batches.front()
    }

    /// Batches from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Batch<P>> {
        self.batches.iter()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }
}

/// Rename and touch undo stacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoChangeLog {
    renames: UndoStack<RenamePlan>,
    touches: UndoStack<TouchPlan>,
}

impl Default for UndoChangeLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_DEPTH)
    }
}

impl UndoChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log keeping at most `depth` batches per stack.
    pub fn with_capacity(depth: usize) -> Self {
        Self {
            renames: UndoStack::with_capacity(depth),
            touches: UndoStack::with_capacity(depth),
        }
    }

    /// Reads a log written by [`save`](Self::save) or by older versions.
    ///
    /// A missing file is an empty log. Malformed lines are skipped.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_capacity(path, DEFAULT_DEPTH)
    }

    pub fn load_with_capacity(path: &Path, depth: usize) -> Result<Self> {
        if !path.exists() {
            log::debug!("No undo log at {}", path.display());
            return Ok(Self::with_capacity(depth));
        }

        let lines = read_text(path)?;
        let log = Self::parse_with_capacity(&lines, depth);
        log::debug!(
            "Loaded undo log {}: {} rename, {} touch batches",
            path.display(),
            log.renames.len(),
            log.touches.len()
        );
        Ok(log)
    }

    pub fn parse(text: &str) -> Self {
        Self::parse_with_capacity(text, DEFAULT_DEPTH)
    }

    pub fn parse_with_capacity(text: &str, depth: usize) -> Self {
        let mut log = Self::with_capacity(depth);
        format::parse(text, &mut log);
        log
    }

    /// Canonical text form; `parse(to_text())` yields an equal log.
    pub fn to_text(&self) -> String {
        format::to_text(self)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_text())?;
        log::debug!("Saved undo log: {}", path.display());
        Ok(())
    }

    pub fn renames(&self) -> &UndoStack<RenamePlan> {
        &self.renames
    }

    pub fn touches(&self) -> &UndoStack<TouchPlan> {
        &self.touches
    }

    /// Records a committed rename batch stamped with the current time.
    ///
    /// Empty plans are not recorded.
    pub fn push_rename(&mut self, entries: RenamePlan) {
        self.push_rename_at(state::now(), entries);
    }

    pub fn push_rename_at(&mut self, timestamp: NaiveDateTime, entries: RenamePlan) {
        if entries.is_empty() {
            return;
        }
        if let Some(evicted) = self.renames.push(Batch::new(timestamp, entries)) {
            log::debug!("Evicted rename batch from {}", evicted.timestamp);
        }
    }

    /// Records a committed touch batch stamped with the current time.
    pub fn push_touch(&mut self, entries: TouchPlan) {
        self.push_touch_at(state::now(), entries);
    }

    pub fn push_touch_at(&mut self, timestamp: NaiveDateTime, entries: TouchPlan) {
        if entries.is_empty() {
            return;
        }
        if let Some(evicted) = self.touches.push(Batch::new(timestamp, entries)) {
            log::debug!("Evicted touch batch from {}", evicted.timestamp);
        }
    }

    pub fn pop_rename(&mut self) -> Option<Batch<RenamePlan>> {
        self.renames.pop()
    }

    pub fn pop_touch(&mut self) -> Option<Batch<TouchPlan>> {
        self.touches.pop()
    }

    pub fn clear(&mut self) {
        self.renames.clear();
        self.touches.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty() && self.touches.is_empty()
    }
}

/// Default log location: `<exe dir>/<exe stem>_undo.log`.
pub fn default_log_path() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    Ok(log_path_for(&exe))
}

pub fn log_path_for(exe: &Path) -> PathBuf {
    let mut name = exe.file_stem().unwrap_or_default().to_os_string();
    name.push(LOG_SUFFIX);
    exe.with_file_name(name)
}

/// Reads a text file, tolerating a UTF-8 byte order mark and invalid bytes.
fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let text: &str = &text;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::plan::TouchChange;
    use crate::state::{Attributes, FileState, epoch, parse_timestamp};
    use tempfile::TempDir;

    fn ts(text: &str) -> NaiveDateTime {
        parse_timestamp(text).unwrap()
    }

    fn rename_plan(pairs: &[(&str, &str)]) -> RenamePlan {
        pairs
            .iter()
            .map(|(s, d)| (PathBuf::from(s), PathBuf::from(d)))
            .collect()
    }

    fn sample_log() -> UndoChangeLog {
        let mut log = UndoChangeLog::new();
        log.push_rename_at(epoch(), rename_plan(&[("/d/a.txt", "/d/b.txt")]));
        log.push_rename_at(
            ts("05-03-2024 14:02:11"),
            rename_plan(&[("/d/x.txt", "/d/y.txt"), ("/d/y.txt", "/e/x.txt")]),
        );

        let before = FileState::new("/d/y.txt")
            .with_attributes(Attributes::ARCHIVE | Attributes::READ_ONLY)
            .with_created(ts("01-01-1999 00:00:00"))
            .with_modified(ts("02-01-1999 00:00:00"));
        let after = FileState::new("/d/y.txt").with_modified(ts("24-12-2023 18:00:00"));
        log.push_touch_at(
            ts("05-03-2024 14:05:40"),
            [TouchChange::new(before, after)].into_iter().collect(),
        );
        log
    }

    #[test]
    fn test_save_format() {
        let text = sample_log().to_text();
        assert_eq!(
            text,
            "<RENAME>\n\
             /d/a.txt -> /d/b.txt\n\
             <END OF BATCH>\n\
             \n\
             <RENAME 05-03-2024 14:02:11>\n\
             /d/x.txt -> /d/y.txt\n\
             /d/y.txt -> /e/x.txt\n\
             <END OF BATCH>\n\
             \n\
             <TOUCH 05-03-2024 14:05:40>\n\
             /d/y.txt :: {RA|01-01-1999 00:00:00|02-01-1999 00:00:00|} -> {||24-12-2023 18:00:00|}\n\
             <END OF BATCH>\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let log = sample_log();
        let reloaded = UndoChangeLog::parse(&log.to_text());
        assert_eq!(reloaded, log);
        assert_eq!(reloaded.to_text(), log.to_text());
    }

    #[test]
    fn test_legacy_untagged_batch() {
        let log = UndoChangeLog::parse("a.txt -> b.txt\n<END OF BATCH>\n");

        assert_eq!(log.renames().len(), 1);
        let batch = log.renames().newest().unwrap();
        assert_eq!(batch.timestamp, epoch());
        assert_eq!(batch.entries, rename_plan(&[("a.txt", "b.txt")]));

        assert_eq!(log.to_text(), "<RENAME>\na.txt -> b.txt\n<END OF BATCH>\n");
    }

    #[test]
    fn test_legacy_matches_tagged() {
        let legacy = UndoChangeLog::parse(
            "/d/a.txt->b.txt\n<END OF BATCH>\n\n/d/c.txt -> /d/e.txt\n<END OF BATCH>\n",
        );
        let tagged = UndoChangeLog::parse(
            "<RENAME>\n/d/a.txt -> /d/b.txt\n<END OF BATCH>\n\n<RENAME>\n/d/c.txt -> /d/e.txt\n<END OF BATCH>\n",
        );
        assert_eq!(legacy, tagged);
        assert_eq!(legacy.renames().len(), 2);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let log = UndoChangeLog::parse(
            "<RENAME 01-01-2020 00:00:00>\n\
             /d/a -> /d/b\n\
             this is not a pair\n\
             /d/c -> /d/d\n\
             <END OF BATCH>\n\
             <TOUCH 01-01-2020 00:00:00>\n\
             /d/a :: {nonsense} -> {|||}\n\
             <END OF BATCH>\n",
        );

        assert_eq!(log.renames().len(), 1);
        assert_eq!(log.renames().newest().unwrap().entries.len(), 2);
        // A batch with no valid lines is not recorded
        assert!(log.touches().is_empty());
    }

    #[test]
    fn test_unterminated_batches_are_kept() {
        let log = UndoChangeLog::parse(
            "<RENAME 01-01-2020 00:00:00>\n\
             /d/a -> /d/b\n\
             <TOUCH 02-01-2020 00:00:00>\n\
             /d/a :: {|||} -> {|||}\n",
        );
        assert_eq!(log.renames().len(), 1);
        assert_eq!(log.touches().len(), 1);
        assert_eq!(
            log.touches().newest().unwrap().timestamp,
            ts("02-01-2020 00:00:00")
        );
    }

    #[test]
    fn test_stack_cap_evicts_oldest() {
        let mut log = UndoChangeLog::new();
        for i in 0..21 {
            let source = format!("/d/{}", i);
            log.push_rename_at(
                epoch() + chrono::Duration::seconds(i),
                rename_plan(&[(source.as_str(), "/d/x")]),
            );
        }

        assert_eq!(log.renames().len(), DEFAULT_DEPTH);
        let oldest = log.renames().oldest().unwrap();
        assert_eq!(oldest.timestamp, epoch() + chrono::Duration::seconds(1));
        assert_eq!(oldest.entries, rename_plan(&[("/d/1", "/d/x")]));
    }

    #[test]
    fn test_empty_batches_not_recorded() {
        let mut log = UndoChangeLog::new();
        log.push_rename(RenamePlan::new());
        log.push_touch(TouchPlan::new());
        assert!(log.is_empty());
    }

    #[test]
    fn test_pop_returns_newest() {
        let mut log = sample_log();
        let batch = log.pop_rename().unwrap();
        assert_eq!(batch.timestamp, ts("05-03-2024 14:02:11"));
        assert_eq!(log.renames().len(), 1);
        assert!(log.pop_touch().is_some());
        assert!(log.pop_touch().is_none());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let log = UndoChangeLog::load(&temp.path().join("none.log")).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_save_and_load_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("app_undo.log");

        let log = sample_log();
        log.save(&path).unwrap();
        assert_eq!(UndoChangeLog::load(&path).unwrap(), log);
    }

    #[test]
    fn test_load_strips_bom() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app_undo.log");
        std::fs::write(&path, "\u{feff}<RENAME>\n/d/a -> /d/b\n<END OF BATCH>\n").unwrap();

        let log = UndoChangeLog::load(&path).unwrap();
        assert_eq!(log.renames().len(), 1);
    }

    #[test]
    fn test_log_path_for_executable() {
        assert_eq!(
            log_path_for(Path::new("/opt/tools/batchmv")),
            PathBuf::from("/opt/tools/batchmv_undo.log")
        );
        assert_eq!(
            log_path_for(Path::new("C:/tools/batchmv.exe")),
            PathBuf::from("C:/tools/batchmv_undo.log")
        );
    }
}
