//! Presence estimate
//!
//! A rolling count of reachable peers, derived from the ping/pong
//! handshake. Any participant's ping resets every live participant's
//! estimate, so the number is an eventually-consistent estimate, never a
//! transaction-scoped snapshot - callers that need a stable expectation
//! (wait-broadcasts) copy the value out at the moment they start.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Rolling estimate of currently reachable peers
#[derive(Debug, Default)]
pub struct PresenceTracker {
    estimate: AtomicUsize,
}

impl PresenceTracker {
    pub fn new() -> Self {
        PresenceTracker::default()
    }

    /// Current estimate. Zero until a pong has arrived.
    #[inline]
    pub fn estimate(&self) -> usize {
        self.estimate.load(Ordering::SeqCst)
    }

    /// Begin a counting round: drop back to zero. Called for local pings
    /// and for pings observed from peers.
    pub fn reset(&self) {
        self.estimate.store(0, Ordering::SeqCst);
    }

    /// A peer answered. Pongs are accepted at any time - late replies keep
    /// refining the estimate rather than being dropped.
    pub fn record_pong(&self) -> usize {
        self.estimate.fetch_add(1, Ordering::SeqCst) + 1
    }
}
