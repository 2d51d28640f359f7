//! Hub: single-threaded reactor over the presence registry.
//!
//! Session tasks never touch the registry. They enqueue `HubEvent`s, and one
//! task applies them strictly in arrival order. Handling an event never awaits
//! (all pushes are `try_send`), so registry mutations are linearizable without
//! a lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use pulse_core::error::{PulseError, Result};
use pulse_core::protocol::event::{MessageIntent, ServerEvent};

use crate::obs::GatewayMetrics;
use crate::realtime::core::{relay, PresenceRegistry, Registration};
use crate::realtime::types::{ConnId, ConnectionHandle, PreparedMsg};

#[derive(Debug)]
pub enum HubEvent {
    /// Connection upgraded. It receives broadcasts from now on but owns no identity yet.
    Connected(ConnectionHandle),
    /// Identity announcement. `None` means the payload was absent or rejected.
    Announce { conn: ConnId, user_id: Option<String> },
    /// Message intent to relay.
    Message { conn: ConnId, intent: MessageIntent },
    Disconnected { conn: ConnId },
}

/// Owner of the registry and of every connected handle.
pub struct Hub {
    registry: PresenceRegistry,
    peers: HashMap<ConnId, ConnectionHandle>,
    metrics: Arc<GatewayMetrics>,
}

impl Hub {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            registry: PresenceRegistry::new(),
            peers: HashMap::new(),
            metrics,
        }
    }

    /// Spawn the reactor task and return the handle sessions use to reach it.
    pub fn spawn(metrics: Arc<GatewayMetrics>, queue: usize) -> (HubHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue.max(1));
        let hub = Hub::new(metrics);
        let task = tokio::spawn(hub.run(rx));
        let handle = HubHandle {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (handle, task)
    }

    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub async fn run(mut self, mut rx: mpsc::Receiver<HubEvent>) {
        while let Some(ev) = rx.recv().await {
            self.handle(ev);
        }
        tracing::debug!("hub queue closed, reactor stopping");
    }

    pub fn handle(&mut self, ev: HubEvent) {
        match ev {
            HubEvent::Connected(conn) => {
                tracing::debug!(conn = conn.id(), "peer attached");
                self.peers.insert(conn.id(), conn);
                self.metrics.connections_active.set(&[], self.peers.len() as i64);
            }
            HubEvent::Announce { conn, user_id } => self.on_announce(conn, user_id),
            HubEvent::Message { conn, intent } => {
                let outcome = relay(&self.registry, &intent.sender_id, &intent.receiver_id, &intent.text);
                self.metrics.relays.inc(&[("result", outcome.as_str())]);
                tracing::debug!(
                    conn,
                    sender = %intent.sender_id,
                    target = %intent.receiver_id,
                    outcome = outcome.as_str(),
                    "relay"
                );
            }
            HubEvent::Disconnected { conn } => {
                self.peers.remove(&conn);
                // removal before broadcast: the departed identity must not appear in the snapshot
                let gone = self.registry.remove(conn);
                self.metrics.connections_active.set(&[], self.peers.len() as i64);
                tracing::debug!(conn, offline = ?gone, "peer detached");
                self.broadcast_presence();
            }
        }
    }

    fn on_announce(&mut self, conn: ConnId, user_id: Option<String>) {
        let result = match (user_id, self.peers.get(&conn)) {
            (Some(user_id), Some(handle)) => {
                let r = self.registry.register(&user_id, handle);
                if r == Registration::AlreadyOnline {
                    tracing::debug!(conn, user = %user_id, "identity already bound to another connection");
                }
                r
            }
            (None, _) => Registration::Ignored,
            (Some(_), None) => {
                // session already detached; nothing to bind
                return;
            }
        };
        self.metrics.announces.inc(&[("result", result.as_str())]);
        self.broadcast_presence();
    }

    /// Send the full snapshot to every connected handle, announced or not.
    fn broadcast_presence(&self) {
        self.metrics.users_online.set(&[], self.registry.len() as i64);

        let prepared = match PreparedMsg::prepare(&ServerEvent::Users(self.registry.snapshot())) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "presence snapshot encode failed");
                return;
            }
        };
        let mut dropped = 0usize;
        for peer in self.peers.values() {
            if !peer.try_push(&prepared) {
                dropped += 1;
            }
        }
        self.metrics.presence_broadcasts.inc(&[]);
        if dropped > 0 {
            tracing::debug!(dropped, "presence snapshot not delivered to some peers");
        }
    }
}

/// Cloneable sender side of the hub queue, plus the connection id allocator.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubEvent>,
    next_id: Arc<AtomicU64>,
}

impl HubHandle {
    pub fn next_conn_id(&self) -> ConnId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Enqueue an event. Awaits when the queue is full so per-connection order is kept.
    pub async fn send(&self, ev: HubEvent) -> Result<()> {
        self.tx
            .send(ev)
            .await
            .map_err(|_| PulseError::Internal("hub stopped".into()))
    }
}
