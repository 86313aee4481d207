//! The dispatch loop and the watcher relay.
//!
//! Two queues feed the loop. Operator commands have their own small queue so
//! that a burst of file changes never crowds them out; file changes, watcher
//! errors and timer fires share the other.

use ad_core::AgentConfig;
use ad_watcher::WatchEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::coordinator::Coordinator;
use crate::event::Event;
use crate::watch_set::PathRegistry;

/// Sending halves of the dispatch queues.
#[derive(Debug, Clone)]
pub struct EventSenders {
    /// Operator commands. Producers shed with `try_send` when it is full.
    pub commands: mpsc::Sender<Event>,

    /// File changes, watcher errors and timer fires.
    pub changes: mpsc::Sender<Event>,
}

/// Receiving halves of the dispatch queues, consumed by [`run_dispatch`].
#[derive(Debug)]
pub struct EventQueues {
    commands: mpsc::Receiver<Event>,
    changes: mpsc::Receiver<Event>,
}

impl EventQueues {
    /// Creates both queues with the capacities from `config`.
    #[must_use]
    pub fn new(config: &AgentConfig) -> (EventSenders, Self) {
        let (commands_tx, commands) = mpsc::channel(config.command_queue_capacity);
        let (changes_tx, changes) = mpsc::channel(config.change_queue_capacity);
        (
            EventSenders {
                commands: commands_tx,
                changes: changes_tx,
            },
            Self { commands, changes },
        )
    }
}

/// Feeds events to `coordinator` one at a time until shutdown.
///
/// Stops on [`Event::Shutdown`], when `shutdown` is cancelled, or when the
/// change queue loses all its senders. The latter two are turned into a
/// final [`Event::Shutdown`] so the coordinator always sees one. A closed
/// command queue only stops command intake. Returns the coordinator so the
/// caller decides when its watcher is dropped.
pub async fn run_dispatch<R: PathRegistry>(
    mut coordinator: Coordinator<R>,
    queues: EventQueues,
    shutdown: &CancellationToken,
) -> Coordinator<R> {
    let EventQueues {
        mut commands,
        mut changes,
    } = queues;
    let mut commands_open = true;

    loop {
        let event = tokio::select! {
            () = shutdown.cancelled() => Event::Shutdown,
            command = commands.recv(), if commands_open => match command {
                Some(command) => command,
                None => {
                    debug!("Command queue closed");
                    commands_open = false;
                    continue;
                }
            },
            event = changes.recv() => event.unwrap_or(Event::Shutdown),
        };

        if coordinator.handle(event).is_break() {
            break;
        }
    }

    debug!("Dispatch loop stopped");
    coordinator
}

/// Forwards watcher output into the dispatch loop.
///
/// Runs until the watcher's channel closes, the dispatch loop stops, or
/// `shutdown` is cancelled.
pub async fn relay_watch_events(
    mut source: mpsc::Receiver<WatchEvent>,
    events: mpsc::Sender<Event>,
    shutdown: CancellationToken,
) {
    loop {
        let watch_event = tokio::select! {
            () = shutdown.cancelled() => break,
            watch_event = source.recv() => match watch_event {
                Some(watch_event) => watch_event,
                None => break,
            },
        };

        let event = match watch_event {
            WatchEvent::Changed(change) => Event::FileChanged(change),
            WatchEvent::Error(message) => Event::WatcherFailed(message),
        };

        if events.send(event).await.is_err() {
            break;
        }
    }

    debug!("Watcher relay stopped");
}
