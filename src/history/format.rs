//! Text encoding of the undo log.
//!
//! ```text
//! <RENAME 05-03-2024 14:02:11>
//! /photos/a.jpg -> /photos/b.jpg
//! <END OF BATCH>
//!
//! <TOUCH 05-03-2024 14:05:40>
//! /photos/b.jpg :: {A|01-01-2020 10:00:00|01-01-2020 10:00:00|} -> {|24-12-2023 18:00:00||}
//! <END OF BATCH>
//! ```
//!
//! Older logs have no tags at all; their pairs are read as rename batches with
//! the epoch as timestamp and are written back in the tagged form. A bare
//! file name on the right of a rename means "same directory as the left".

use super::{Batch, UndoChangeLog};
use crate::fs::plan::{RenamePlan, TouchChange, TouchPlan};
use crate::state::{FileState, epoch, format_timestamp, parse_timestamp};

use chrono::NaiveDateTime;
use regex::Regex;
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::LazyLock;

pub const END_OF_BATCH: &str = "<END OF BATCH>";

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<(RENAME|TOUCH)(?:\s+(\d{2}-\d{2}-\d{4} \d{2}:\d{2}:\d{2}))?>$")
        .expect("Invalid action tag regex")
});

static TOUCH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s*::\s*(\{[^{}]*\})\s*->\s*(\{[^{}]*\})$").expect("Invalid touch line regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Rename,
    Touch,
}

/// Batch being accumulated while reading.
struct Pending {
    action: Action,
    timestamp: NaiveDateTime,
    renames: RenamePlan,
    touches: TouchPlan,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.renames.is_empty() && self.touches.is_empty()
    }

    fn flush_into(&mut self, log: &mut UndoChangeLog) {
        if !self.renames.is_empty() {
            let entries = std::mem::take(&mut self.renames);
            log.renames.push(Batch::new(self.timestamp, entries));
        }
        if !self.touches.is_empty() {
            let entries = std::mem::take(&mut self.touches);
            log.touches.push(Batch::new(self.timestamp, entries));
        }
    }
}

pub(super) fn parse(text: &str, log: &mut UndoChangeLog) {
    let mut pending = Pending {
        action: Action::Rename,
        timestamp: epoch(),
        renames: RenamePlan::new(),
        touches: TouchPlan::new(),
    };

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if line == END_OF_BATCH {
            pending.flush_into(log);
            continue;
        }

        if let Some((action, timestamp)) = parse_tag(line) {
            if !pending.is_empty() {
                log::warn!(
                    "Undo log line {}: new batch started before {}, closing previous batch",
                    idx + 1,
                    END_OF_BATCH
                );
                pending.flush_into(log);
            }
            pending.action = action;
            pending.timestamp = timestamp;
            continue;
        }

        let parsed = match pending.action {
            Action::Rename => parse_rename_line(line)
                .map(|(source, destination)| pending.renames.insert(source, destination))
                .is_some(),
            Action::Touch => parse_touch_line(line)
                .map(|change| pending.touches.insert(change))
                .is_some(),
        };

        if !parsed {
            log::warn!("Skipping malformed undo log line {}: {}", idx + 1, line);
        }
    }

    if !pending.is_empty() {
        log::warn!("Undo log ends without {}, keeping last batch", END_OF_BATCH);
        pending.flush_into(log);
    }
}

pub(super) fn to_text(log: &UndoChangeLog) -> String {
    let mut out = String::new();

    for batch in log.renames.iter() {
        if !out.is_empty() {
            out.push('\n');
        }
        if batch.timestamp == epoch() {
            out.push_str("<RENAME>\n");
        } else {
            let _ = writeln!(out, "<RENAME {}>", format_timestamp(&batch.timestamp));
        }
        for (source, destination) in batch.entries.iter() {
            let _ = writeln!(out, "{} -> {}", source.display(), destination.display());
        }
        out.push_str(END_OF_BATCH);
        out.push('\n');
    }

    for batch in log.touches.iter() {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "<TOUCH {}>", format_timestamp(&batch.timestamp));
        for change in batch.entries.iter() {
            let _ = writeln!(
                out,
                "{} :: {} -> {}",
                change.path().display(),
                change.before.brace_block(),
                change.after.brace_block()
            );
        }
        out.push_str(END_OF_BATCH);
        out.push('\n');
    }

    out
}

fn parse_tag(line: &str) -> Option<(Action, NaiveDateTime)> {
    let caps = TAG_PATTERN.captures(line)?;
    let action = match &caps[1] {
        "RENAME" => Action::Rename,
        _ => Action::Touch,
    };
    let timestamp = match caps.get(2) {
        Some(ts) => parse_timestamp(ts.as_str())?,
        None => epoch(),
    };
    Some((action, timestamp))
}

fn parse_rename_line(line: &str) -> Option<(PathBuf, PathBuf)> {
    let (source, destination) = line.split_once(" -> ").or_else(|| line.split_once("->"))?;
    let (source, destination) = (source.trim(), destination.trim());
    if source.is_empty() || destination.is_empty() {
        return None;
    }

    let source = PathBuf::from(source);
    let destination = if destination.contains(['/', '\\']) {
        PathBuf::from(destination)
    } else {
        match source.parent() {
            Some(parent) => parent.join(destination),
            None => PathBuf::from(destination),
        }
    };

    Some((source, destination))
}

fn parse_touch_line(line: &str) -> Option<TouchChange> {
    let caps = TOUCH_PATTERN.captures(line)?;
    let path = PathBuf::from(caps[1].trim());
    let before = FileState::parse_brace_block(&path, &caps[2])?;
    let after = FileState::parse_brace_block(&path, &caps[3])?;
    Some(TouchChange::new(before, after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Attributes;
    use std::path::Path;

    fn ts(text: &str) -> NaiveDateTime {
        parse_timestamp(text).unwrap()
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_tag("<RENAME>"), Some((Action::Rename, epoch())));
        assert_eq!(
            parse_tag("<TOUCH 05-03-2024 14:02:11>"),
            Some((Action::Touch, ts("05-03-2024 14:02:11")))
        );
        assert_eq!(parse_tag("<RENAME 99-99-2024 14:02:11>"), None);
        assert_eq!(parse_tag("<DELETE>"), None);
        assert_eq!(parse_tag(END_OF_BATCH), None);
    }

    #[test]
    fn test_parse_rename_line_variants() {
        assert_eq!(
            parse_rename_line("/d/a.txt -> /e/b.txt"),
            Some((PathBuf::from("/d/a.txt"), PathBuf::from("/e/b.txt")))
        );
        // Legacy bare separator
        assert_eq!(
            parse_rename_line("/d/a.txt->/e/b.txt"),
            Some((PathBuf::from("/d/a.txt"), PathBuf::from("/e/b.txt")))
        );
        // Bare file name borrows the source directory
        assert_eq!(
            parse_rename_line("/d/a.txt -> b.txt"),
            Some((PathBuf::from("/d/a.txt"), PathBuf::from("/d/b.txt")))
        );
        assert_eq!(parse_rename_line("/d/a.txt -> "), None);
        assert_eq!(parse_rename_line("just text"), None);
    }

    #[test]
    fn test_parse_touch_line() {
        let change = parse_touch_line(
            "/d/a.txt :: {A|01-01-1999 00:00:00|02-01-1999 00:00:00|} -> {||03-03-2003 03:03:03|}",
        )
        .unwrap();

        assert_eq!(change.path(), Path::new("/d/a.txt"));
        assert_eq!(change.before.attributes, Some(Attributes::ARCHIVE));
        assert_eq!(change.before.created, Some(ts("01-01-1999 00:00:00")));
        assert!(change.before.accessed.is_none());
        assert_eq!(change.after.modified, Some(ts("03-03-2003 03:03:03")));
        assert!(change.after.attributes.is_none());
    }

    #[test]
    fn test_parse_touch_line_rejects_garbage() {
        assert!(parse_touch_line("/d/a.txt -> /d/b.txt").is_none());
        assert!(parse_touch_line("/d/a.txt :: {A|||} -> {bad}").is_none());
    }
}
