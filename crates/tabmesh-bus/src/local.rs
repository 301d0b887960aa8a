//! Local fan-out channels
//!
//! The bus is the stand-in for a same-origin broadcast primitive: every
//! payload published on a channel reaches every endpoint attached to that
//! channel, including the publisher itself. Higher layers filter their own
//! echoes by session identity.
//!
//! Delivery guarantees: at-most-once, ordered per sender, nothing buffered
//! for endpoints that attach later, oldest payloads dropped for receivers
//! that fall behind the channel capacity.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

use tabmesh_core::DEFAULT_BUS_CAPACITY;

/// A set of named fan-out channels.
///
/// Clones share the same channels; one `LocalBus` models one origin.
#[derive(Clone)]
pub struct LocalBus {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<Bytes>>>>,
    capacity: usize,
}

impl LocalBus {
    /// Create a bus with the default per-channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    /// Create a bus with a custom per-channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        LocalBus {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// Attach to a named channel, creating it on first use.
    pub fn attach(&self, channel: &str) -> BusEndpoint {
        let mut channels = self.channels.lock();
        let tx = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone();

        BusEndpoint {
            channel: channel.to_string(),
            tx,
        }
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One participant's handle on a named channel.
#[derive(Clone)]
pub struct BusEndpoint {
    channel: String,
    tx: broadcast::Sender<Bytes>,
}

impl BusEndpoint {
    /// Channel name this endpoint is attached to.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Publish a payload to every subscriber on the channel.
    ///
    /// The publisher's own subscriptions receive the payload too. A channel
    /// with no live subscriber drops the payload - lost messages are not
    /// retried.
    pub fn publish(&self, payload: Bytes) {
        // send() only errors when there are zero receivers; under
        // at-most-once delivery that is a silent non-delivery, not a fault.
        let _ = self.tx.send(payload);
    }

    /// Subscribe to the channel from this point onward.
    pub fn subscribe(&self) -> broadcast::Receiver<Bytes> {
        self.tx.subscribe()
    }

    /// Number of live subscriptions on the channel (self included).
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Payload receiver channel
pub type PayloadReceiver = mpsc::Receiver<Bytes>;

/// Start a background receive loop.
///
/// Adapts a broadcast subscription into an mpsc stream on a spawned task.
/// Lagged receivers skip the overrun and keep going; the loop ends when the
/// channel or the consumer goes away.
pub fn start_receive_loop(endpoint: &BusEndpoint, buffer_size: usize) -> PayloadReceiver {
    let mut rx = endpoint.subscribe();
    let channel = endpoint.channel.clone();
    let (tx, out) = mpsc::channel(buffer_size);

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(payload) => {
                    if tx.send(payload).await.is_err() {
                        break; // Consumer dropped
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(channel = %channel, skipped, "bus receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    out
}
