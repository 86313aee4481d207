//! The coordinator's mirror of the watcher's registrations.
//!
//! [`WatchSet`] only records a path after the [`PathRegistry`] accepted it and
//! only forgets one after the registry released it, so the mirror never claims
//! a directory the watcher isn't actually observing.

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use ad_watcher::{FileWatcher, WatchError};

/// Something that can start and stop observing directories.
///
/// Implemented by [`FileWatcher`]; tests substitute an in-memory fake.
pub trait PathRegistry: Send {
    /// Starts observing `path`.
    fn register(&mut self, path: &Utf8Path) -> Result<(), WatchError>;

    /// Stops observing `path`.
    fn unregister(&mut self, path: &Utf8Path) -> Result<(), WatchError>;
}

impl PathRegistry for FileWatcher {
    fn register(&mut self, path: &Utf8Path) -> Result<(), WatchError> {
        self.add(path)
    }

    fn unregister(&mut self, path: &Utf8Path) -> Result<(), WatchError> {
        self.remove(path)
    }
}

/// Errors from watch set operations.
#[derive(Debug, thiserror::Error)]
pub enum WatchSetError {
    /// No path was given.
    #[error("no folder given")]
    EmptyPath,

    /// The registry refused the operation.
    #[error(transparent)]
    Registry(#[from] WatchError),
}

/// The set of directories currently registered with the watcher.
#[derive(Debug, Default)]
pub struct WatchSet {
    paths: FxHashSet<Utf8PathBuf>,
}

impl WatchSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `path` and records it.
    ///
    /// # Errors
    ///
    /// [`WatchSetError::EmptyPath`] for an empty argument, or
    /// [`WatchSetError::Registry`] if the registry refused; the set is
    /// unchanged in both cases.
    pub fn add<R: PathRegistry + ?Sized>(
        &mut self,
        registry: &mut R,
        path: &str,
    ) -> Result<Utf8PathBuf, WatchSetError> {
        if path.is_empty() {
            return Err(WatchSetError::EmptyPath);
        }

        let path = Utf8PathBuf::from(path);
        registry.register(&path)?;
        self.paths.insert(path.clone());
        debug!(path = %path, watched = self.paths.len(), "Added to watch set");
        Ok(path)
    }

    /// Unregisters `path` and forgets it.
    ///
    /// # Errors
    ///
    /// Same as [`add`](Self::add); the set is unchanged on error.
    pub fn remove<R: PathRegistry + ?Sized>(
        &mut self,
        registry: &mut R,
        path: &str,
    ) -> Result<Utf8PathBuf, WatchSetError> {
        if path.is_empty() {
            return Err(WatchSetError::EmptyPath);
        }

        let path = Utf8PathBuf::from(path);
        registry.unregister(&path)?;
        self.paths.remove(&path);
        debug!(path = %path, watched = self.paths.len(), "Removed from watch set");
        Ok(path)
    }

    /// Unregisters every path, ignoring individual failures, and clears the set.
    ///
    /// Returns how many paths were cleared.
    pub fn reset<R: PathRegistry + ?Sized>(&mut self, registry: &mut R) -> usize {
        let cleared = self.paths.len();
        for path in self.paths.drain() {
            if let Err(e) = registry.unregister(&path) {
                warn!(path = %path, error = %e, "Failed to unwatch during reset");
            }
        }
        cleared
    }

    /// Returns the watched paths in sorted order.
    #[must_use]
    pub fn list(&self) -> Vec<&Utf8Path> {
        let mut paths: Vec<&Utf8Path> = self.paths.iter().map(Utf8PathBuf::as_path).collect();
        paths.sort_unstable();
        paths
    }

    /// Returns `true` if `path` is watched.
    #[must_use]
    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.paths.contains(path)
    }

    /// Returns the number of watched paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if nothing is watched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ad_watcher::NotifyError;

    /// In-memory registry that refuses paths starting with `missing`.
    #[derive(Debug, Default)]
    pub(crate) struct FakeRegistry {
        pub(crate) registered: FxHashSet<Utf8PathBuf>,
        pub(crate) fail_unregister: bool,
    }

    impl PathRegistry for FakeRegistry {
        fn register(&mut self, path: &Utf8Path) -> Result<(), WatchError> {
            if path.as_str().starts_with("missing") {
                return Err(WatchError::path_not_found(path));
            }
            self.registered.insert(path.to_owned());
            Ok(())
        }

        fn unregister(&mut self, path: &Utf8Path) -> Result<(), WatchError> {
            if self.fail_unregister || !self.registered.remove(path) {
                return Err(WatchError::Notify(NotifyError::watch_not_found()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_add_records_path() {
        let mut registry = FakeRegistry::default();
        let mut set = WatchSet::new();

        let added = set.add(&mut registry, "services/api").expect("registered");
        assert_eq!(added, "services/api");
        assert!(set.contains(Utf8Path::new("services/api")));
        assert!(registry.registered.contains(Utf8Path::new("services/api")));
    }

    #[test]
    fn test_add_empty_path() {
        let mut registry = FakeRegistry::default();
        let mut set = WatchSet::new();

        assert!(matches!(
            set.add(&mut registry, ""),
            Err(WatchSetError::EmptyPath)
        ));
        assert!(set.is_empty());
        assert!(registry.registered.is_empty());
    }

    #[test]
    fn test_add_registry_failure_leaves_set_unchanged() {
        let mut registry = FakeRegistry::default();
        let mut set = WatchSet::new();

        let err = set.add(&mut registry, "missing/dir").expect_err("refused");
        assert_eq!(err.to_string(), "path does not exist: missing/dir");
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_failure_leaves_set_unchanged() {
        let mut registry = FakeRegistry::default();
        let mut set = WatchSet::new();
        set.add(&mut registry, "a").expect("registered");

        registry.fail_unregister = true;
        assert!(set.remove(&mut registry, "a").is_err());
        assert!(set.contains(Utf8Path::new("a")));

        registry.fail_unregister = false;
        set.remove(&mut registry, "a").expect("released");
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_empty_path() {
        let mut registry = FakeRegistry::default();
        let mut set = WatchSet::new();
        assert!(matches!(
            set.remove(&mut registry, ""),
            Err(WatchSetError::EmptyPath)
        ));
    }

    #[test]
    fn test_reset_is_best_effort() {
        let mut registry = FakeRegistry::default();
        let mut set = WatchSet::new();
        set.add(&mut registry, "a").expect("registered");
        set.add(&mut registry, "b").expect("registered");

        registry.fail_unregister = true;
        assert_eq!(set.reset(&mut registry), 2);
        assert!(set.is_empty());
        assert!(set.list().is_empty());
    }

    #[test]
    fn test_list_is_sorted_and_deduplicated() {
        let mut registry = FakeRegistry::default();
        let mut set = WatchSet::new();
        for path in ["web", "api", "web", "db"] {
            set.add(&mut registry, path).expect("registered");
        }

        let listed: Vec<&str> = set.list().into_iter().map(Utf8Path::as_str).collect();
        assert_eq!(listed, ["api", "db", "web"]);
        assert_eq!(set.len(), 3);
    }
}
