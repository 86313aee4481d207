//! Input suspension while a redeploy is in flight.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared flag telling the input reader to stop reading.
///
/// Counts outstanding [`SuspendGuard`]s, so overlapping redeploys keep input
/// suspended until the last one finishes. Changes are observable: a reader
/// parked on input can wait for [`InputGate::suspended`] and stop at once.
#[derive(Debug, Clone)]
pub struct InputGate {
    in_flight: Arc<watch::Sender<usize>>,
}

impl Default for InputGate {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(watch::Sender::new(0)),
        }
    }
}

impl InputGate {
    /// Creates an open gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while any guard is alive.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        *self.in_flight.borrow() > 0
    }

    /// Suspends input until the returned guard is dropped.
    #[must_use = "input resumes as soon as the guard is dropped"]
    pub fn suspend(&self) -> SuspendGuard {
        self.in_flight.send_modify(|count| *count += 1);
        SuspendGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Resolves once the gate is suspended. Returns immediately if it already is.
    pub async fn suspended(&self) {
        self.wait_until(|count| count > 0).await;
    }

    /// Resolves once every guard has been dropped.
    pub async fn resumed(&self) {
        self.wait_until(|count| count == 0).await;
    }

    async fn wait_until(&self, done: impl Fn(usize) -> bool) {
        let mut rx = self.in_flight.subscribe();
        // The gate owns the sender, so the channel can't close under us.
        let reached = rx.wait_for(|count| done(*count)).await.is_ok();
        if !reached {
            std::future::pending::<()>().await;
        }
    }
}

/// Keeps an [`InputGate`] suspended. Released on drop, including unwinding.
#[derive(Debug)]
pub struct SuspendGuard {
    in_flight: Arc<watch::Sender<usize>>,
}

impl Drop for SuspendGuard {
    fn drop(&mut self) {
        self.in_flight
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}
