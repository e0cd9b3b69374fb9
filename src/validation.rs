use crate::error::{BatchError, Result};
use crate::fs::RenamePlan;
use crate::state::{Attributes, parse_timestamp};

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::Path;

/// Longest file name most filesystems accept, in bytes.
const MAX_NAME_LEN: usize = 255;

/// Checks a rename plan before any file is touched.
///
/// Pairs that rename a file onto itself are dropped. Two sources with the
/// same destination make the whole plan invalid, since the second rename
/// would fail or clobber the first.
pub fn validate_rename_plan(plan: RenamePlan) -> Result<RenamePlan> {
    let mut targets: HashMap<&Path, &Path> = HashMap::new();

    for (source, destination) in plan.iter() {
        validate_destination(destination)?;

        if let Some(other) = targets.insert(destination, source) {
            return Err(BatchError::InvalidPlan(format!(
                "{} and {} both rename to {}",
                other.display(),
                source.display(),
                destination.display()
            )));
        }
    }

    Ok(plan
        .iter()
        .filter(|(source, destination)| {
            let same = source == destination;
            if same {
                log::debug!("Source equals destination, skipping: {}", source.display());
            }
            !same
        })
        .map(|(s, d)| (s.to_path_buf(), d.to_path_buf()))
        .collect())
}

pub fn validate_destination(path: &Path) -> Result<()> {
    let text = path.to_string_lossy();
    let invalid = |reason: &str| Err(BatchError::InvalidPath(text.to_string(), reason.to_string()));

    if text.is_empty() {
        return invalid("cannot be empty");
    }

    if text.contains('\0') {
        return invalid("contains a NUL byte");
    }

    if text.ends_with('/') || text.ends_with('\\') {
        return invalid("ends with a path separator");
    }

    let Some(name) = path.file_name() else {
        return invalid("has no file name");
    };

    if name.len() > MAX_NAME_LEN {
        return invalid("file name exceeds 255 bytes");
    }

    Ok(())
}

/// Parses a `dd-mm-yyyy hh:mm:ss` argument, or `now`.
pub fn parse_timestamp_arg(text: &str) -> Result<NaiveDateTime> {
    if text.trim().eq_ignore_ascii_case("now") {
        return Ok(crate::state::now());
    }

    parse_timestamp(text).ok_or_else(|| {
        BatchError::InvalidValue(
            text.to_string(),
            "expected a timestamp like 31-12-2024 23:59:00, or 'now'".to_string(),
        )
    })
}

/// Parses attribute keys such as `RA`; `N` clears every flag.
pub fn parse_attributes_arg(text: &str) -> Result<Attributes> {
    Attributes::from_keys(text).ok_or_else(|| {
        BatchError::InvalidValue(
            text.to_string(),
            "expected attribute keys from R, H, S, A, or N for none".to_string(),
        )
    })
}
