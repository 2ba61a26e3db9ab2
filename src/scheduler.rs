//! Phase-deadline scheduling keyed by game-instance identity.
//!
//! Deadlines are keyed by the game instance's [`Uuid`], never by the session
//! alone, so a timer armed for a replaced or stopped game is provably inert:
//! cancellation aborts the task, and a callback that still fires against a
//! stale instance is treated as a no-op by the owner.

use std::future::Future;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::debug;
use uuid::Uuid;

/// Registry of pending phase deadlines, one per game instance.
#[derive(Debug, Default)]
pub struct PhaseScheduler {
    pending: DashMap<Uuid, JoinHandle<()>>,
}

impl PhaseScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a deadline for `game_id`, invoking `callback` exactly once when it
    /// elapses. Re-arming the same game (DJ rounds) replaces the previous
    /// pending deadline.
    pub fn arm<F, Fut>(&self, game_id: Uuid, deadline: Instant, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;
            callback().await;
        });

        if let Some(stale) = self.pending.insert(game_id, handle) {
            stale.abort();
            debug!(game_id = %game_id, "replaced pending deadline");
        }
    }

    /// Cancel the pending deadline for `game_id`, if any. Returns whether a
    /// deadline was actually cancelled.
    pub fn cancel(&self, game_id: Uuid) -> bool {
        match self.pending.remove(&game_id) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Forget a deadline that just fired so re-arms start from a clean slot.
    pub(crate) fn mark_fired(&self, game_id: Uuid) {
        self.pending.remove(&game_id);
    }

    /// Number of deadlines currently pending.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
