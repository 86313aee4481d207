//! Error types for the ad-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while registering or unregistering directories.

use camino::Utf8PathBuf;

/// Errors that can occur during file watching operations.
///
/// Every variant renders as a single line suitable for showing to the
/// operator, e.g. `Error adding directory: path does not exist: ./missing`.
///
/// # Examples
///
/// ```
/// use ad_watcher::WatchError;
/// use camino::Utf8PathBuf;
///
/// fn describe(err: &WatchError) -> String {
///     match err {
///         WatchError::Notify(e) => format!("backend: {e}"),
///         WatchError::PathNotFound(p) => format!("missing: {p}"),
///         WatchError::NonUtf8Path(p) => format!("bad path: {}", p.display()),
///     }
/// }
///
/// let err = WatchError::path_not_found("./missing");
/// assert_eq!(describe(&err), "missing: ./missing");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The notify backend rejected the operation.
    ///
    /// Covers initialization failures, unreadable directories, and
    /// unwatching a path that was never registered.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The specified path does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// A path is not valid UTF-8.
    ///
    /// Events for such paths are logged and skipped.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) => Some(path),
            Self::Notify(_) | Self::NonUtf8Path(_) => None,
        }
    }
}
