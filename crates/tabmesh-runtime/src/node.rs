//! tabmesh Node - runtime wiring
//!
//! One `Node` is one program instance on the mesh. It owns the session
//! identity, the process-wide shared state, and the receive loop that
//! demultiplexes incoming envelopes into the presence tracker, the wait
//! table, and the variable store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use tabmesh_bus::{start_receive_loop, BusEndpoint, LocalBus};
use tabmesh_core::{MeshError, MeshResult, SessionId, Value, MAX_NAME_LEN};
use tabmesh_state::{Registry, RegistrySnapshot, VariableStore};
use tabmesh_wire::{Body, Envelope};

use crate::hooks::HookTable;
use crate::presence::PresenceTracker;
use crate::waits::PendingWaits;

/// Node configuration
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Bus channel the node attaches to
    pub channel: String,
    /// Delay before the automatic startup ping, long enough for
    /// subscriptions on other instances to settle
    pub startup_ping_delay: Duration,
    /// Receive loop buffer (envelopes)
    pub receive_buffer: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            channel: "mesh".to_string(),
            startup_ping_delay: Duration::from_millis(250),
            receive_buffer: 64,
        }
    }
}

/// Counters exposed by [`Node::stats`]
#[derive(Clone, Debug, Default)]
pub struct RuntimeStats {
    pub envelopes_in: u64,
    pub envelopes_out: u64,
    pub self_discarded: u64,
    pub malformed_ignored: u64,
    pub hooks_fired: u64,
    pub acks_received: u64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    envelopes_in: AtomicU64,
    envelopes_out: AtomicU64,
    self_discarded: AtomicU64,
    malformed_ignored: AtomicU64,
    hooks_fired: AtomicU64,
    acks_received: AtomicU64,
}

impl StatsCounters {
    #[inline]
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RuntimeStats {
        RuntimeStats {
            envelopes_in: self.envelopes_in.load(Ordering::Relaxed),
            envelopes_out: self.envelopes_out.load(Ordering::Relaxed),
            self_discarded: self.self_discarded.load(Ordering::Relaxed),
            malformed_ignored: self.malformed_ignored.load(Ordering::Relaxed),
            hooks_fired: self.hooks_fired.load(Ordering::Relaxed),
            acks_received: self.acks_received.load(Ordering::Relaxed),
        }
    }
}

/// Callback invoked with a fresh snapshot after each registry change
pub type RegistryCallback = Box<dyn Fn(RegistrySnapshot) + Send + Sync>;

/// Process-wide shared state, owned here and handed to the receive loop by
/// handle. Torn down with the node; nothing survives a program reload.
struct SharedState {
    hooks: HookTable,
    presence: PresenceTracker,
    waits: PendingWaits,
    registry: Mutex<Registry>,
    variables: Mutex<VariableStore>,
    observer: Mutex<Option<RegistryCallback>>,
    stats: StatsCounters,
}

impl SharedState {
    fn new() -> Self {
        SharedState {
            hooks: HookTable::new(),
            presence: PresenceTracker::new(),
            waits: PendingWaits::new(),
            registry: Mutex::new(Registry::new()),
            variables: Mutex::new(VariableStore::new()),
            observer: Mutex::new(None),
            stats: StatsCounters::default(),
        }
    }
}

/// A program instance attached to the mesh
#[derive(Clone)]
pub struct Node {
    session: SessionId,
    endpoint: BusEndpoint,
    state: Arc<SharedState>,
}

impl Node {
    /// Attach to the bus, start the receive loop, and schedule the startup
    /// ping. Must be called from within a tokio runtime.
    pub fn spawn(bus: &LocalBus, config: NodeConfig) -> Node {
        let endpoint = bus.attach(&config.channel);
        let session = SessionId::generate();
        let state = Arc::new(SharedState::new());

        let mut incoming = start_receive_loop(&endpoint, config.receive_buffer);
        {
            let state = Arc::clone(&state);
            let endpoint = endpoint.clone();
            tokio::spawn(async move {
                while let Some(payload) = incoming.recv().await {
                    dispatch(session, &state, &endpoint, &payload);
                }
            });
        }

        {
            let state = Arc::clone(&state);
            let endpoint = endpoint.clone();
            let delay = config.startup_ping_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                state.presence.reset();
                publish(&endpoint, &state, Envelope::ping(session));
            });
        }

        tracing::debug!(%session, channel = %endpoint.channel(), "node attached");
        Node {
            session,
            endpoint,
            state,
        }
    }

    /// This node's session identity.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Counter snapshot.
    pub fn stats(&self) -> RuntimeStats {
        self.state.stats.snapshot()
    }

    // ------------------------------------------------------------------
    // Broadcasts
    // ------------------------------------------------------------------

    /// Register a hook fired whenever `name` arrives, locally or remotely.
    pub fn on_broadcast<F, Fut>(&self, name: &str, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.state.hooks.register(name, hook);
    }

    /// Fire `name` locally and on every peer. Local hooks are started
    /// before the envelope goes out; nothing is awaited.
    pub fn broadcast(&self, name: &str) -> MeshResult<()> {
        let bytes = Envelope::broadcast(self.session, name, false).encode()?;

        let fired = self.state.hooks.fire(name);
        self.state
            .stats
            .hooks_fired
            .fetch_add(fired.len() as u64, Ordering::Relaxed);

        self.endpoint.publish(bytes);
        StatsCounters::bump(&self.state.stats.envelopes_out);
        Ok(())
    }

    /// Fire `name` everywhere and suspend until every currently reachable
    /// peer has finished reacting.
    ///
    /// The expected acknowledgement count is the presence estimate at call
    /// time; with no known peers the call resolves immediately. There is no
    /// timeout - a peer that dies after receiving the broadcast leaves this
    /// call suspended forever. A second wait on the same name while one is
    /// pending returns [`MeshError::WaitPending`].
    pub async fn broadcast_and_wait(&self, name: &str) -> MeshResult<()> {
        let bytes = Envelope::broadcast(self.session, name, true).encode()?;

        let expected = self.state.presence.estimate();
        let wait = self.state.waits.begin(name, expected)?;

        let fired = self.state.hooks.fire(name);
        self.state
            .stats
            .hooks_fired
            .fetch_add(fired.len() as u64, Ordering::Relaxed);

        self.endpoint.publish(bytes);
        StatsCounters::bump(&self.state.stats.envelopes_out);

        wait.wait().await;
        self.state.waits.finish(name);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Presence
    // ------------------------------------------------------------------

    /// Start a fresh counting round. The estimate drops to zero and grows
    /// as pongs come back; there is no fixed poll window.
    pub fn ping(&self) -> MeshResult<()> {
        self.state.presence.reset();
        self.try_publish(Envelope::ping(self.session))
    }

    /// Rolling estimate of reachable peers.
    pub fn presence_estimate(&self) -> usize {
        self.state.presence.estimate()
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    /// Local read. Never touches the bus; unknown names read as the empty
    /// default value.
    pub fn get_variable(&self, name: &str) -> Value {
        self.state.variables.lock().get(name)
    }

    /// Write locally and replicate to peers.
    pub fn set_variable(&self, name: &str, value: impl Into<Value>) -> MeshResult<()> {
        let value = value.into();
        let bytes = Envelope::var(self.session, name, value.clone()).encode()?;

        self.state.variables.lock().set(name, value);
        self.endpoint.publish(bytes);
        StatsCounters::bump(&self.state.stats.envelopes_out);
        Ok(())
    }

    /// Add a delta locally and replicate the resulting absolute value, so
    /// peers converge even when an earlier update was lost.
    pub fn change_variable(&self, name: &str, delta: impl Into<Value>) -> MeshResult<()> {
        if name.len() > MAX_NAME_LEN {
            return Err(MeshError::NameTooLong(name.len()));
        }

        let value = self.state.variables.lock().change(name, &delta.into());
        self.try_publish(Envelope::var(self.session, name, value))
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Declare a broadcast name for the host's menus. Returns whether the
    /// registry changed; duplicates and the empty string are no-ops.
    pub fn declare_message(&self, name: &str) -> bool {
        let changed = self.state.registry.lock().declare_message(name);
        if changed {
            self.notify_registry();
        }
        changed
    }

    pub fn remove_message(&self, name: &str) -> bool {
        let changed = self.state.registry.lock().remove_message(name);
        if changed {
            self.notify_registry();
        }
        changed
    }

    pub fn declare_variable(&self, name: &str) -> bool {
        let changed = self.state.registry.lock().declare_variable(name);
        if changed {
            self.notify_registry();
        }
        changed
    }

    pub fn remove_variable(&self, name: &str) -> bool {
        let changed = self.state.registry.lock().remove_variable(name);
        if changed {
            self.notify_registry();
        }
        changed
    }

    /// Declared broadcast names, sorted; a single empty placeholder when
    /// nothing is declared.
    pub fn list_messages(&self) -> Vec<String> {
        self.state.registry.lock().list_messages()
    }

    pub fn list_variables(&self) -> Vec<String> {
        self.state.registry.lock().list_variables()
    }

    /// Install the host callback invoked after every registry change.
    pub fn on_registry_changed<F>(&self, callback: F)
    where
        F: Fn(RegistrySnapshot) + Send + Sync + 'static,
    {
        *self.state.observer.lock() = Some(Box::new(callback));
    }

    // ------------------------------------------------------------------
    // Host lifecycle
    // ------------------------------------------------------------------

    /// Host loaded a program: re-render menus from current state.
    pub fn program_loaded(&self) {
        self.notify_registry();
    }

    /// Host disposed the program: drop every declared name and variable.
    pub fn reset(&self) {
        self.state.registry.lock().clear();
        self.state.variables.lock().clear();
        self.notify_registry();
    }

    fn notify_registry(&self) {
        let snapshot = self.state.registry.lock().snapshot();
        if let Some(callback) = self.state.observer.lock().as_ref() {
            callback(snapshot);
        }
    }

    fn try_publish(&self, envelope: Envelope) -> MeshResult<()> {
        let bytes = envelope.encode()?;
        self.endpoint.publish(bytes);
        StatsCounters::bump(&self.state.stats.envelopes_out);
        Ok(())
    }
}

/// Demultiplex one incoming payload.
fn dispatch(session: SessionId, state: &Arc<SharedState>, endpoint: &BusEndpoint, payload: &[u8]) {
    let envelope = match Envelope::parse(payload) {
        Ok(envelope) => envelope,
        Err(err) => {
            StatsCounters::bump(&state.stats.malformed_ignored);
            tracing::debug!(%err, "ignoring malformed payload");
            return;
        }
    };

    StatsCounters::bump(&state.stats.envelopes_in);

    // The bus echoes our own publishes back; hooks already fired locally.
    if envelope.session == session {
        StatsCounters::bump(&state.stats.self_discarded);
        return;
    }

    match envelope.body {
        Body::Ping => {
            state.presence.reset();
            publish(endpoint, state, Envelope::pong(session));
        }
        Body::Pong => {
            state.presence.record_pong();
        }
        Body::Broadcast { name, will_wait } => {
            let handles = state.hooks.fire(&name);
            state
                .stats
                .hooks_fired
                .fetch_add(handles.len() as u64, Ordering::Relaxed);

            if will_wait {
                // The sender is suspended until our reaction settles: ack
                // only after every spawned hook ran to completion.
                let endpoint = endpoint.clone();
                let state = Arc::clone(state);
                tokio::spawn(async move {
                    for handle in handles {
                        let _ = handle.await;
                    }
                    publish(&endpoint, &state, Envelope::done(session, name));
                });
            }
        }
        Body::Done { name } => {
            if state.waits.acknowledge(&name) {
                StatsCounters::bump(&state.stats.acks_received);
            }
        }
        Body::Var { name, value } => {
            state.variables.lock().apply_remote(&name, value);
        }
    }
}

fn publish(endpoint: &BusEndpoint, state: &SharedState, envelope: Envelope) {
    match envelope.encode() {
        Ok(bytes) => {
            endpoint.publish(bytes);
            StatsCounters::bump(&state.stats.envelopes_out);
        }
        Err(err) => tracing::debug!(%err, "failed to encode envelope"),
    }
}
