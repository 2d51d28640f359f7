//! Realtime core components.
//!
//! The registry and relay are plain synchronous code; the hub serializes every
//! access to them on one task.

mod hub;
mod registry;
mod relay;

pub use hub::{Hub, HubEvent, HubHandle};
pub use registry::{PresenceRecord, PresenceRegistry, Registration};
pub use relay::{relay, RelayOutcome};
