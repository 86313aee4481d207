//! Directory watcher with async event streaming.
//!
//! This module provides the [`FileWatcher`] type that bridges the synchronous
//! `notify` watcher to the async tokio runtime while letting callers register
//! and unregister directories at any time.
//!
//! # Lifecycle
//!
//! 1. **Creation**: `FileWatcher::new()` creates the channel and the notify
//!    backend, returning the watcher together with the event receiver. No
//!    directory is observed yet.
//! 2. **Registration**: `add()` and `remove()` change the observed set.
//! 3. **Event Reception**: the receiver yields filtered [`WatchEvent`]s until
//!    the watcher is dropped.
//! 4. **Shutdown**: dropping the watcher stops the backend and closes the
//!    channel.

use camino::{Utf8Path, Utf8PathBuf};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use ad_core::WatchConfig;

use crate::error::WatchError;
use crate::events::{ChangeKind, FileEvent, WatchEvent};
use crate::filter::FileFilter;

/// A directory watcher that streams events to an async context.
///
/// # Thread Safety
///
/// The notify backend invokes its callback on its own thread; events cross
/// into tokio via `blocking_send`, so a slow consumer applies backpressure to
/// the backend rather than growing memory.
///
/// # Examples
///
/// ```no_run
/// use ad_core::WatchConfig;
/// use ad_watcher::{FileWatcher, WriteFilter};
/// use camino::Utf8Path;
///
/// # fn example() -> Result<(), ad_watcher::WatchError> {
/// let (mut watcher, _events) = FileWatcher::new(&WatchConfig::default(), WriteFilter)?;
/// watcher.add(Utf8Path::new("./src"))?;
/// watcher.remove(Utf8Path::new("./src"))?;
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    /// The notify backend. Dropping it stops event delivery.
    backend: RecommendedWatcher,

    /// Recursion mode applied to every registered directory.
    mode: RecursiveMode,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Creates a watcher that observes nothing until [`add`](Self::add) is called.
    ///
    /// Returns the watcher and the receiving end of its event channel.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Notify`] if the backend fails to initialize
    /// (for example when the inotify instance limit is reached).
    pub fn new<F: FileFilter>(
        config: &WatchConfig,
        filter: F,
    ) -> Result<(Self, mpsc::Receiver<WatchEvent>), WatchError> {
        let (event_tx, event_rx) = mpsc::channel(config.channel_capacity);

        let backend = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            forward_event(&event_tx, &filter, res);
        })?;

        let mode = if config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        tracing::debug!(recursive = config.recursive, "File watcher created");

        Ok((Self { backend, mode }, event_rx))
    }

    /// Starts observing `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if the path doesn't exist, or
    /// [`WatchError::Notify`] if the backend refuses it.
    pub fn add(&mut self, path: &Utf8Path) -> Result<(), WatchError> {
        if !path.exists() {
            return Err(WatchError::path_not_found(path));
        }

        self.backend.watch(path.as_std_path(), self.mode)?;
        tracing::info!(path = %path, "Watching directory");
        Ok(())
    }

    /// Stops observing `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Notify`] if the path was not being observed or the
    /// backend fails to release it.
    pub fn remove(&mut self, path: &Utf8Path) -> Result<(), WatchError> {
        self.backend.unwatch(path.as_std_path())?;
        tracing::info!(path = %path, "Stopped watching directory");
        Ok(())
    }
}

/// Converts one backend notification into filtered [`WatchEvent`]s.
///
/// Runs on the notify backend thread.
fn forward_event<F: FileFilter>(
    tx: &mpsc::Sender<WatchEvent>,
    filter: &F,
    res: notify::Result<notify::Event>,
) {
    let event = match res {
        Ok(event) => event,
        Err(error) => {
            tracing::warn!(error = %error, "Watcher backend error");
            if tx.blocking_send(WatchEvent::Error(error.to_string())).is_err() {
                tracing::debug!("Event channel closed, dropping watcher error");
            }
            return;
        }
    };

    let kind = ChangeKind::from(&event.kind);
    for path in event.paths {
        let utf8_path = match Utf8PathBuf::try_from(path) {
            Ok(p) => p,
            Err(e) => {
                let invalid_path = e.into_path_buf();
                tracing::warn!(
                    path = %invalid_path.display(),
                    "Skipping non-UTF-8 path in file event"
                );
                continue;
            }
        };

        if !filter.should_process(&utf8_path, kind) {
            tracing::trace!(path = %utf8_path, kind = kind.label(), "Filtered out file event");
            continue;
        }

        if tx
            .blocking_send(WatchEvent::Changed(FileEvent::new(utf8_path, kind)))
            .is_err()
        {
            tracing::debug!("Event channel closed, dropping file event");
            break;
        }
    }
}
