//! pulse gateway library entry.
//!
//! Wires the WebSocket transport, identity binding, and the realtime hub
//! (presence registry + relay) into one service. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod obs;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod transport;
