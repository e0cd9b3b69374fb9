//! Snapshots of a file's attributes and timestamps.
//!
//! A [`FileState`] is either captured from disk or built as a desired end
//! state. Every field other than the path is optional: `None` means
//! "unchanged" when the state describes a touch target, and "unknown" when it
//! was read from a log that left the field empty.
//!
//! Timestamps are local wall-clock times with second precision, which is the
//! resolution of the undo log's `dd-mm-yyyy hh:mm:ss` encoding.

use chrono::{DateTime, Local, NaiveDateTime, SubsecRound, TimeZone, Utc};
use filetime::FileTime;
use std::fmt;
use std::fs;
use std::io;
use std::ops::BitOr;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// `chrono` format string for every timestamp in the undo log.
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Formats a timestamp as `dd-mm-yyyy hh:mm:ss`.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a `dd-mm-yyyy hh:mm:ss` timestamp.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT).ok()
}

/// Zero timestamp used by batches from logs that predate timestamps.
pub fn epoch() -> NaiveDateTime {
    DateTime::<Utc>::UNIX_EPOCH.naive_utc()
}

/// Current local time truncated to whole seconds.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

fn to_local(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local().trunc_subsecs(0)
}

fn to_system_time(ts: &NaiveDateTime) -> SystemTime {
    match Local.from_local_datetime(ts).earliest() {
        Some(local) => local.into(),
        // Skipped by a DST transition; treat the wall-clock value as UTC.
        None => ts.and_utc().into(),
    }
}

/// DOS-style file attribute flags.
///
/// Bit values match the Windows `FILE_ATTRIBUTE_*` constants so they can be
/// read directly from metadata on that platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Attributes(u8);

impl Attributes {
    pub const READ_ONLY: Self = Self(0x01);
    pub const HIDDEN: Self = Self(0x02);
    pub const SYSTEM: Self = Self(0x04);
    pub const ARCHIVE: Self = Self(0x20);

    /// Key written for a state with every flag cleared.
    ///
    /// An empty key string already means "unchanged", so "no flags" needs
    /// its own spelling.
    pub const NORMAL_KEY: char = 'N';

    const KEYS: [(char, Attributes); 4] = [
        ('R', Self::READ_ONLY),
        ('H', Self::HIDDEN),
        ('S', Self::SYSTEM),
        ('A', Self::ARCHIVE),
    ];

    const ALL: u8 = 0x01 | 0x02 | 0x04 | 0x20;

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Builds from raw bits, dropping bits this crate does not track.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, flag: Self, enabled: bool) {
        if enabled {
            self.0 |= flag.0;
        } else {
            self.0 &= !flag.0;
        }
    }

    /// Compact key string such as `RA`, or `N` when no flag is set.
    pub fn to_keys(self) -> String {
        if self.is_empty() {
            return Self::NORMAL_KEY.to_string();
        }
        Self::KEYS
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(key, _)| *key)
            .collect()
    }

    /// Parses a key string produced by [`Attributes::to_keys`].
    ///
    /// Keys are case-insensitive. Returns `None` for unknown keys or an
    /// empty string.
    pub fn from_keys(keys: &str) -> Option<Self> {
        let keys = keys.trim();
        if keys.is_empty() {
            return None;
        }

        let mut attributes = Self::empty();
        for c in keys.chars().map(|c| c.to_ascii_uppercase()) {
            if c == Self::NORMAL_KEY {
                continue;
            }
            let (_, flag) = Self::KEYS.iter().find(|(key, _)| *key == c)?;
            attributes.set(*flag, true);
        }
        Some(attributes)
    }

    /// Reads the attributes of a file from its metadata.
    #[cfg(windows)]
    pub fn from_metadata(_path: &Path, metadata: &fs::Metadata) -> Self {
        use std::os::windows::fs::MetadataExt;
        Self::from_bits((metadata.file_attributes() & 0xff) as u8)
    }

    /// Reads the attributes of a file from its metadata.
    ///
    /// Only the read-only flag is backed by the platform; dot-files are
    /// reported as hidden.
    #[cfg(not(windows))]
    pub fn from_metadata(path: &Path, metadata: &fs::Metadata) -> Self {
        let mut attributes = Self::empty();
        attributes.set(Self::READ_ONLY, metadata.permissions().readonly());
        let hidden = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        attributes.set(Self::HIDDEN, hidden);
        attributes
    }
}

impl BitOr for Attributes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_keys())
    }
}

/// Snapshot of a path's attributes and three timestamps.
///
/// Values are never mutated in place: a touch pairs the state captured at
/// planning time with a separate desired state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileState {
    pub path: PathBuf,
    pub attributes: Option<Attributes>,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub accessed: Option<NaiveDateTime>,
}

impl FileState {
    /// A state for `path` with every field left unchanged.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            attributes: None,
            created: None,
            modified: None,
            accessed: None,
        }
    }

    /// Reads the live attributes and timestamps of `path`.
    ///
    /// Timestamps the platform does not report are left as `None`.
    pub fn capture(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let metadata = fs::metadata(&path)?;

        Ok(Self {
            attributes: Some(Attributes::from_metadata(&path, &metadata)),
            created: metadata.created().ok().map(to_local),
            modified: metadata.modified().ok().map(to_local),
            accessed: metadata.accessed().ok().map(to_local),
            path,
        })
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn with_created(mut self, ts: NaiveDateTime) -> Self {
        self.created = Some(ts);
        self
    }

    pub fn with_modified(mut self, ts: NaiveDateTime) -> Self {
        self.modified = Some(ts);
        self
    }

    pub fn with_accessed(mut self, ts: NaiveDateTime) -> Self {
        self.accessed = Some(ts);
        self
    }

    /// A state is valid when it names a path and carries attributes.
    pub fn is_valid(&self) -> bool {
        !self.path.as_os_str().is_empty() && self.attributes.is_some()
    }

    /// Returns true if no field would be changed by applying this state.
    pub fn is_noop(&self) -> bool {
        self.attributes.is_none()
            && self.created.is_none()
            && self.modified.is_none()
            && self.accessed.is_none()
    }

    /// Copy of `self` keeping only the fields that are set in `mask`.
    pub fn masked_by(&self, mask: &FileState) -> FileState {
        FileState {
            path: self.path.clone(),
            attributes: self.attributes.filter(|_| mask.attributes.is_some()),
            created: self.created.filter(|_| mask.created.is_some()),
            modified: self.modified.filter(|_| mask.modified.is_some()),
            accessed: self.accessed.filter(|_| mask.accessed.is_some()),
        }
    }

    /// Encodes as `{attrs|creation|modify|access}`; unset fields are empty.
    pub fn brace_block(&self) -> String {
        let ts = |t: &Option<NaiveDateTime>| t.as_ref().map(format_timestamp).unwrap_or_default();
        format!(
            "{{{}|{}|{}|{}}}",
            self.attributes.map(Attributes::to_keys).unwrap_or_default(),
            ts(&self.created),
            ts(&self.modified),
            ts(&self.accessed),
        )
    }

    /// Decodes a brace block for `path`.
    ///
    /// Returns `None` when the block is not four `|`-separated fields in
    /// braces or a non-empty field fails to parse.
    pub fn parse_brace_block(path: impl Into<PathBuf>, block: &str) -> Option<Self> {
        let inner = block.trim().strip_prefix('{')?.strip_suffix('}')?;
        let fields: Vec<&str> = inner.split('|').collect();
        let [attrs, created, modified, accessed] = fields.as_slice() else {
            return None;
        };

        let ts = |field: &str| -> Option<Option<NaiveDateTime>> {
            if field.trim().is_empty() {
                Some(None)
            } else {
                parse_timestamp(field).map(Some)
            }
        };

        let attributes = if attrs.trim().is_empty() {
            None
        } else {
            Some(Attributes::from_keys(attrs)?)
        };

        Some(Self {
            path: path.into(),
            attributes,
            created: ts(*created)?,
            modified: ts(*modified)?,
            accessed: ts(*accessed)?,
        })
    }

    /// Writes every set field of this state onto `self.path`.
    ///
    /// Timestamps are written before attributes so a read-only target does
    /// not block its own timestamp update.
    pub fn apply(&self) -> io::Result<()> {
        if let Some(modified) = &self.modified {
            filetime::set_file_mtime(
                &self.path,
                FileTime::from_system_time(to_system_time(modified)),
            )?;
        }

        if let Some(accessed) = &self.accessed {
            filetime::set_file_atime(
                &self.path,
                FileTime::from_system_time(to_system_time(accessed)),
            )?;
        }

        if let Some(created) = &self.created {
            set_created(&self.path, to_system_time(created))?;
        }

        if let Some(attributes) = self.attributes {
            set_attributes(&self.path, attributes)?;
        }

        Ok(())
    }
}

#[cfg(windows)]
fn set_created(path: &Path, time: SystemTime) -> io::Result<()> {
    use std::os::windows::fs::FileTimesExt;

    let file = fs::OpenOptions::new().write(true).open(path)?;
    file.set_times(fs::FileTimes::new().set_created(time))
}

#[cfg(not(windows))]
fn set_created(path: &Path, _time: SystemTime) -> io::Result<()> {
    log::debug!(
        "Creation time is not settable on this platform, skipping: {}",
        path.display()
    );
    Ok(())
}

fn set_attributes(path: &Path, attributes: Attributes) -> io::Result<()> {
    let metadata = fs::metadata(path)?;
    let current = Attributes::from_metadata(path, &metadata);

    let mut perms = metadata.permissions();
    let read_only = attributes.contains(Attributes::READ_ONLY);
    if perms.readonly() != read_only {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(read_only);
        fs::set_permissions(path, perms)?;
    }

    let untracked = Attributes::from_bits(!Attributes::READ_ONLY.bits());
    let wanted = Attributes::from_bits(attributes.bits() & untracked.bits());
    let have = Attributes::from_bits(current.bits() & untracked.bits());
    if wanted != have {
        log::debug!(
            "Attributes other than read-only are not writable here ({} requested, {} present): {}",
            wanted,
            have,
            path.display()
        );
    }

    Ok(())
}
