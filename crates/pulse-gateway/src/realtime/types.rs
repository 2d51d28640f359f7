use axum::extract::ws::Message;
use tokio::sync::mpsc;

use pulse_core::error::Result;
use pulse_core::protocol::event::ServerEvent;

/// Process-unique connection id, assigned at upgrade. Exposed on the wire as `socketId`.
pub type ConnId = u64;

/// Opaque reference to one live connection: its id plus the sender side of
/// its outbound queue. Only valid while the session task drains the queue.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnId,
    tx: mpsc::Sender<Message>,
}

impl ConnectionHandle {
    pub fn new(id: ConnId, tx: mpsc::Sender<Message>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn socket_id(&self) -> String {
        self.id.to_string()
    }

    /// Non-blocking push. Returns false when the queue is full or the session is gone.
    pub fn try_push(&self, msg: &PreparedMsg) -> bool {
        self.tx.try_send(msg.to_ws_message()).is_ok()
    }
}

/// Prepared message cached for broadcasting (serialize once, send N times).
#[derive(Debug, Clone)]
pub struct PreparedMsg(String);

impl PreparedMsg {
    pub fn prepare(ev: &ServerEvent) -> Result<Self> {
        ev.to_json().map(PreparedMsg)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to axum::ws::Message for transport.
    pub fn to_ws_message(&self) -> Message {
        Message::Text(self.0.clone())
    }
}
