//! Event filtering at the source.
//!
//! Filters run on the notify backend thread before an event is sent to the
//! channel, so discarded events never reach the agent.
//!
//! # Examples
//!
//! ```
//! use ad_watcher::{ChangeKind, FileFilter, WriteFilter};
//! use camino::Utf8Path;
//!
//! let filter = WriteFilter;
//! assert!(filter.should_process(Utf8Path::new("src/app.py"), ChangeKind::Write));
//! assert!(!filter.should_process(Utf8Path::new("src/app.py"), ChangeKind::Create));
//! ```

use camino::Utf8Path;

use crate::events::ChangeKind;

/// A predicate deciding which backend events are forwarded.
///
/// Filters must be [`Send`], [`Sync`] and `'static` because they are moved
/// into the notify callback, which runs on the backend's own thread.
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if a `kind` change to `path` should be forwarded.
    fn should_process(&self, path: &Utf8Path, kind: ChangeKind) -> bool;
}

/// Forwards only content writes.
///
/// Creations, removals, renames and metadata updates are dropped; saving a
/// file in an editor always ends with a write, so nothing is lost.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteFilter;

impl FileFilter for WriteFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path, kind: ChangeKind) -> bool {
        kind == ChangeKind::Write
    }
}

/// Forwards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path, _kind: ChangeKind) -> bool {
        true
    }
}

impl<F> FileFilter for F
where
    F: Fn(&Utf8Path, ChangeKind) -> bool + Send + Sync + 'static,
{
    fn should_process(&self, path: &Utf8Path, kind: ChangeKind) -> bool {
        self(path, kind)
    }
}
