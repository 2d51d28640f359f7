use pulse_core::protocol::event::{DeliveredMessage, ServerEvent};

use crate::realtime::core::PresenceRegistry;
use crate::realtime::types::PreparedMsg;

/// What happened to one relay attempt. Never surfaced to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    /// Target not in the registry; message dropped.
    Offline,
    /// Target queue full or closed; message dropped.
    SendFailed,
}

impl RelayOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RelayOutcome::Delivered => "delivered",
            RelayOutcome::Offline => "offline",
            RelayOutcome::SendFailed => "send_failed",
        }
    }
}

/// Best-effort live forward of `text` from `sender_id` to `target_id`.
///
/// No backlog and no retry: durable delivery belongs to the message store.
pub fn relay(registry: &PresenceRegistry, sender_id: &str, target_id: &str, text: &str) -> RelayOutcome {
    let Some(target) = registry.lookup(target_id) else {
        return RelayOutcome::Offline;
    };

    let ev = ServerEvent::Message(DeliveredMessage {
        sender_id: sender_id.to_string(),
        text: text.to_string(),
    });
    let prepared = match PreparedMsg::prepare(&ev) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "relay encode failed");
            return RelayOutcome::SendFailed;
        }
    };

    if target.conn.try_push(&prepared) {
        RelayOutcome::Delivered
    } else {
        RelayOutcome::SendFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::types::ConnectionHandle;
    use axum::extract::ws::Message;
    use serde_json::Value;
    use tokio::sync::mpsc;

    fn text_of(msg: Message) -> Value {
        match msg {
            Message::Text(s) => serde_json::from_str(&s).expect("json frame"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn online_target_gets_exactly_one_frame() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut reg = PresenceRegistry::new();
        reg.register("bob", &ConnectionHandle::new(2, tx));

        assert_eq!(relay(&reg, "alice", "bob", "hi"), RelayOutcome::Delivered);

        let v = text_of(rx.try_recv().expect("delivered"));
        assert_eq!(v["type"], "receiveMessage");
        assert_eq!(v["data"]["senderId"], "alice");
        assert_eq!(v["data"]["text"], "hi");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn offline_target_is_silent() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut reg = PresenceRegistry::new();
        reg.register("alice", &ConnectionHandle::new(1, tx));

        assert_eq!(relay(&reg, "alice", "bob", "hi"), RelayOutcome::Offline);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stale_handle_is_swallowed() {
        let (tx, rx) = mpsc::channel(1);
        let mut reg = PresenceRegistry::new();
        reg.register("bob", &ConnectionHandle::new(2, tx));
        drop(rx);

        assert_eq!(relay(&reg, "alice", "bob", "hi"), RelayOutcome::SendFailed);
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut reg = PresenceRegistry::new();
        reg.register("bob", &ConnectionHandle::new(2, tx));

        assert_eq!(relay(&reg, "alice", "bob", "one"), RelayOutcome::Delivered);
        assert_eq!(relay(&reg, "alice", "bob", "two"), RelayOutcome::SendFailed);

        let v = text_of(rx.try_recv().expect("first frame"));
        assert_eq!(v["data"]["text"], "one");
        assert!(rx.try_recv().is_err());
    }
}
