//! Realtime runtime for the pulse gateway.
//!
//! Presence registry, relay function, and the hub reactor that owns them.

pub mod core;
pub mod types;

pub use core::{Hub, HubEvent, HubHandle, PresenceRegistry, RelayOutcome};
pub use types::{ConnId, ConnectionHandle, PreparedMsg};
