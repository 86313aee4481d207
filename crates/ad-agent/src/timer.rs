//! The single-slot debounce timer.
//!
//! A [`TimerSlot`] holds at most one pending timer. Arming spawns a sleeping
//! task that sends [`Event::TimerFired`] back into the dispatch loop, so the
//! fire is handled like any other event instead of touching state from the
//! timer task.
//!
//! Each arm gets a fresh [`TimerId`]. A fire is only honoured when its id
//! matches the pending slot, which makes [`TimerSlot::cancel`] effective even
//! when the fire was already queued behind other events.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::event::Event;

/// Identifies one arming of the debounce timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors from the debounce timer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    /// A timer is already counting down.
    #[error("debounce timer {0} is already pending")]
    AlreadyPending(TimerId),
}

#[derive(Debug)]
struct PendingTimer {
    id: TimerId,
    handle: JoinHandle<()>,
}

/// Holds the one pending debounce timer, if any.
#[derive(Debug)]
pub struct TimerSlot {
    pending: Option<PendingTimer>,
    next_id: u64,
    events: mpsc::Sender<Event>,
}

impl TimerSlot {
    /// Creates an empty slot whose timers fire into `events`.
    #[must_use]
    pub fn new(events: mpsc::Sender<Event>) -> Self {
        Self {
            pending: None,
            next_id: 0,
            events,
        }
    }

    /// Returns `true` while a timer is counting down.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the id of the pending timer.
    #[must_use]
    pub fn pending_id(&self) -> Option<TimerId> {
        self.pending.as_ref().map(|timer| timer.id)
    }

    /// Arms a timer that fires after `duration`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::AlreadyPending`] if the slot is occupied.
    pub fn arm(&mut self, duration: Duration) -> Result<TimerId, TimerError> {
        if let Some(timer) = &self.pending {
            return Err(TimerError::AlreadyPending(timer.id));
        }

        self.next_id += 1;
        let id = TimerId(self.next_id);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if events.send(Event::TimerFired(id)).await.is_err() {
                trace!(timer = %id, "Event channel closed before timer fired");
            }
        });

        debug!(timer = %id, ?duration, "Debounce timer armed");
        self.pending = Some(PendingTimer { id, handle });
        Ok(id)
    }

    /// Cancels the pending timer.
    ///
    /// Idempotent: returns `false` when nothing was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(timer) => {
                timer.handle.abort();
                debug!(timer = %timer.id, "Debounce timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Frees the slot for a fired timer.
    ///
    /// Returns `false` for a stale fire whose timer was cancelled or replaced,
    /// leaving the slot untouched.
    pub fn complete(&mut self, id: TimerId) -> bool {
        if self.pending_id() == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}
