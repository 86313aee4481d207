//! Directory watcher with dynamic registration and async event streaming.
//!
//! This crate wraps the `notify` crate behind a [`FileWatcher`] whose set of
//! observed directories can grow and shrink at runtime, and bridges its
//! callback thread to tokio through a bounded channel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    notify backend thread                        │
//! │  ┌───────────────────┐    ┌────────────────┐                    │
//! │  │ RecommendedWatcher │ -> │ Callback       │                    │
//! │  │ (inotify/FSEvents) │    │ (kind filter)  │                    │
//! │  └───────────────────┘    └───────┬────────┘                    │
//! └───────────────────────────────────│─────────────────────────────┘
//!                                     │ blocking_send
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │  ┌──────────────────┐    ┌────────────────┐                     │
//! │  │ FileWatcher      │    │ mpsc::Receiver │ -> agent relay      │
//! │  │ (add / remove)   │    │ (WatchEvent)   │                     │
//! │  └──────────────────┘    └────────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use ad_core::WatchConfig;
//! use ad_watcher::{FileWatcher, WatchEvent, WriteFilter};
//! use camino::Utf8Path;
//!
//! # async fn example() -> Result<(), ad_watcher::WatchError> {
//! let (mut watcher, mut events) = FileWatcher::new(&WatchConfig::default(), WriteFilter)?;
//! watcher.add(Utf8Path::new("./src"))?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         WatchEvent::Changed(change) => println!("Change in {}", change.path),
//!         WatchEvent::Error(message) => eprintln!("Watcher Error: {message}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod watcher;

pub use error::WatchError;
pub use events::{ChangeKind, FileEvent, WatchEvent};
pub use filter::{AcceptAllFilter, FileFilter, WriteFilter};
pub use watcher::FileWatcher;

/// The backend error type wrapped by [`WatchError::Notify`].
pub use notify::Error as NotifyError;
