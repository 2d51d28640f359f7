//! Decode-once codec for the transport layer.
//!
//! - Text frames => `ClientEvent` (size-checked before any parsing)
//! - Binary frames => rejected, the protocol is text only
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use pulse_core::{
    error::{PulseError, Result},
    protocol::event::{ClientEvent, ServerEvent},
};

#[derive(Debug)]
pub enum Inbound {
    Event(ClientEvent),
    /// Ping or pong from the peer. Counts as activity, nothing to route.
    Heartbeat,
    Close,
}

/// Cheap frame length (policy before decode).
pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) => v.len(),
        Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}

pub fn decode(msg: Message, max_frame_bytes: usize) -> Result<Inbound> {
    if frame_len(&msg) > max_frame_bytes {
        return Err(PulseError::PayloadTooLarge);
    }
    match msg {
        Message::Text(s) => ClientEvent::decode(&s).map(Inbound::Event),
        Message::Binary(_) => Err(PulseError::BadRequest("binary frames are not supported".into())),
        Message::Ping(_) | Message::Pong(_) => Ok(Inbound::Heartbeat),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

pub fn encode(ev: &ServerEvent) -> Result<Message> {
    ev.to_json().map(Message::Text)
}
