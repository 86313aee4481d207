//! Event types for directory change notifications.
//!
//! # Event Flow
//!
//! ```text
//! File System Change
//!        │
//!        ▼
//! notify::Event (one per backend notification, possibly many paths)
//!        │
//!        ▼
//! FileEvent per path, classified by ChangeKind
//!        │
//!        ▼
//! WatchEvent::Changed sent via channel to the agent
//! ```

use std::time::Instant;

use camino::Utf8PathBuf;
use notify::event::{EventKind, ModifyKind};

/// The kind of change reported for a path.
///
/// A coarse classification of [`notify::EventKind`]. Only [`ChangeKind::Write`]
/// counts as a content change for redeploy purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ChangeKind {
    /// File contents were written.
    Write,
    /// A file or directory was created.
    Create,
    /// A file or directory was removed.
    Remove,
    /// A file or directory was renamed.
    Rename,
    /// Permissions, timestamps or other metadata changed.
    Metadata,
    /// Access events and anything the backend could not classify.
    Other,
}

impl ChangeKind {
    /// Returns a short lowercase label for logging.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Create => "create",
            Self::Remove => "remove",
            Self::Rename => "rename",
            Self::Metadata => "metadata",
            Self::Other => "other",
        }
    }
}

impl From<&EventKind> for ChangeKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => Self::Write,
            EventKind::Modify(ModifyKind::Name(_)) => Self::Rename,
            EventKind::Modify(ModifyKind::Metadata(_)) => Self::Metadata,
            EventKind::Create(_) => Self::Create,
            EventKind::Remove(_) => Self::Remove,
            EventKind::Modify(ModifyKind::Other) | EventKind::Access(_) | EventKind::Any | EventKind::Other => {
                Self::Other
            }
        }
    }
}

/// A change to a single path, with a UTF-8 path guarantee.
///
/// # Examples
///
/// ```
/// use ad_watcher::{ChangeKind, FileEvent};
/// use camino::Utf8PathBuf;
///
/// let event = FileEvent::new(Utf8PathBuf::from("app/main.go"), ChangeKind::Write);
/// assert!(event.is_write());
/// assert_eq!(event.file_name(), Some("main.go"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// The path that changed, as reported by the backend.
    pub path: Utf8PathBuf,

    /// What kind of change occurred.
    pub kind: ChangeKind,

    /// When the event was received from the backend.
    pub timestamp: Instant,
}

impl FileEvent {
    /// Creates a new file event stamped with the current instant.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf, kind: ChangeKind) -> Self {
        Self {
            path,
            kind,
            timestamp: Instant::now(),
        }
    }

    /// Creates a write event for `path`.
    ///
    /// Convenient for feeding the agent synthetic changes.
    #[inline]
    #[must_use]
    pub fn write(path: impl Into<Utf8PathBuf>) -> Self {
        Self::new(path.into(), ChangeKind::Write)
    }

    /// Returns `true` if this event reports written contents.
    #[inline]
    #[must_use]
    pub fn is_write(&self) -> bool {
        self.kind == ChangeKind::Write
    }

    /// Returns the file name without the directory path.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }
}

/// A message from the watcher backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A path changed and passed the watcher's filter.
    Changed(FileEvent),

    /// The backend reported an error. The text is shown to the operator.
    Error(String),
}
