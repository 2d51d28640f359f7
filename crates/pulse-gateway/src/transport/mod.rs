//! Transport layer (WebSocket).
//!
//! Exposes the WS upgrade handler and the codec that turns frames into typed
//! client events before they reach the hub.

pub mod codec;
pub mod ws;
