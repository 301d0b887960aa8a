//! Pending wait-broadcasts
//!
//! One entry per in-flight `broadcast_and_wait`, keyed by broadcast name.
//! The expected acknowledgement count is frozen when the wait begins; the
//! receive loop increments the counter as `done` envelopes arrive and wakes
//! the waiter through a `Notify` rather than a poll loop. A second wait on
//! a name that is already pending is rejected - overwriting the counter
//! would corrupt the first caller's completion condition.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use tabmesh_core::{MeshError, MeshResult};

/// State of one in-flight wait-broadcast
#[derive(Debug)]
pub struct WaitState {
    expected: usize,
    acks: AtomicUsize,
    notify: Notify,
}

impl WaitState {
    fn new(expected: usize) -> Self {
        WaitState {
            expected,
            acks: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    /// Acknowledgements the wait still expects in total.
    #[inline]
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Acknowledgements received so far.
    #[inline]
    pub fn acks(&self) -> usize {
        self.acks.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn satisfied(&self) -> bool {
        self.acks() >= self.expected
    }

    /// Suspend until enough acknowledgements arrived. Returns immediately
    /// when the expectation is already met (expected == 0 in particular).
    /// There is no timeout: missing acknowledgements suspend forever.
    pub async fn wait(&self) {
        while !self.satisfied() {
            self.notify.notified().await;
        }
    }

    fn acknowledge(&self) {
        self.acks.fetch_add(1, Ordering::SeqCst);
        // notify_one stores a permit when no waiter is parked yet, so an
        // ack that races the waiter's satisfied() check is never lost.
        self.notify.notify_one();
    }
}

/// Table of in-flight waits, keyed by broadcast name
#[derive(Debug, Default)]
pub struct PendingWaits {
    waits: Mutex<HashMap<String, Arc<WaitState>>>,
}

impl PendingWaits {
    pub fn new() -> Self {
        PendingWaits::default()
    }

    /// Begin a wait expecting `expected` acknowledgements.
    pub fn begin(&self, name: &str, expected: usize) -> MeshResult<Arc<WaitState>> {
        let mut waits = self.waits.lock();
        if waits.contains_key(name) {
            return Err(MeshError::WaitPending(name.to_string()));
        }

        let state = Arc::new(WaitState::new(expected));
        waits.insert(name.to_string(), Arc::clone(&state));
        Ok(state)
    }

    /// Record a `done` envelope. Returns false when no wait is pending for
    /// the name - stray acknowledgements are ignored.
    pub fn acknowledge(&self, name: &str) -> bool {
        match self.waits.lock().get(name) {
            Some(state) => {
                state.acknowledge();
                true
            }
            None => false,
        }
    }

    /// Remove a resolved wait.
    pub fn finish(&self, name: &str) {
        self.waits.lock().remove(name);
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.waits.lock().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_zero_expected_resolves_immediately() {
        let waits = PendingWaits::new();
        let state = waits.begin("sync", 0).unwrap();
        state.wait().await; // must not hang
        waits.finish("sync");
        assert!(!waits.is_pending("sync"));
    }

    #[tokio::test]
    async fn test_wait_resolves_after_expected_acks() {
        let waits = Arc::new(PendingWaits::new());
        let state = waits.begin("sync", 2).unwrap();

        let acker = Arc::clone(&waits);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            acker.acknowledge("sync");
            acker.acknowledge("sync");
        });

        tokio::time::timeout(Duration::from_secs(1), state.wait())
            .await
            .expect("wait should resolve once both acks arrive");
        assert_eq!(state.acks(), 2);
    }

    #[tokio::test]
    async fn test_ack_before_wait_is_not_lost() {
        let waits = PendingWaits::new();
        let state = waits.begin("sync", 1).unwrap();

        waits.acknowledge("sync");
        tokio::time::timeout(Duration::from_millis(100), state.wait())
            .await
            .expect("pre-arrived ack should satisfy the wait");
    }

    #[tokio::test]
    async fn test_second_wait_on_same_name_rejected() {
        let waits = PendingWaits::new();
        let _first = waits.begin("sync", 1).unwrap();

        match waits.begin("sync", 1) {
            Err(MeshError::WaitPending(name)) => assert_eq!(name, "sync"),
            other => panic!("expected WaitPending, got {:?}", other.map(|_| ())),
        }

        // A different name is unaffected.
        assert!(waits.begin("other", 1).is_ok());
    }

    #[tokio::test]
    async fn test_stray_ack_is_ignored() {
        let waits = PendingWaits::new();
        assert!(!waits.acknowledge("nobody-waiting"));
    }

    #[tokio::test]
    async fn test_finish_allows_new_wait() {
        let waits = PendingWaits::new();
        let state = waits.begin("sync", 0).unwrap();
        state.wait().await;
        waits.finish("sync");

        assert!(waits.begin("sync", 0).is_ok());
    }
}
