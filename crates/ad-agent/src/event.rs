//! Events consumed by the dispatch loop.
//!
//! Producers funnel into two queues of [`Event`]s that a single dispatch
//! loop drains, so the coordinator handles commands, file changes and timer
//! fires strictly one at a time.
//!
//! ```text
//! input reader ── Command ───────┬──► command queue ──┐
//! EOF ─────────── Shutdown ──────┘                    │
//! watcher relay ─ FileChanged ───┐                    ├──► dispatch loop
//!               └ WatcherFailed ─┼──► change queue ───┘
//! debounce timer ─ TimerFired ───┘
//! ```

use ad_watcher::FileEvent;

use crate::command::Command;
use crate::timer::TimerId;

/// A unit of work for the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The operator entered a command.
    Command(Command),

    /// A watched directory reported a write.
    FileChanged(FileEvent),

    /// A debounce timer elapsed.
    TimerFired(TimerId),

    /// The watcher backend reported an error.
    WatcherFailed(String),

    /// Stop the dispatch loop.
    Shutdown,
}

impl Event {
    /// Returns a short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Command(_) => "command",
            Self::FileChanged(_) => "file_changed",
            Self::TimerFired(_) => "timer_fired",
            Self::WatcherFailed(_) => "watcher_failed",
            Self::Shutdown => "shutdown",
        }
    }
}

impl From<Command> for Event {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

impl From<FileEvent> for Event {
    fn from(event: FileEvent) -> Self {
        Self::FileChanged(event)
    }
}
