//! Protocol modules.
//!
//! - `envelope`: the JSON frame shape shared by both directions.
//! - `event`: typed client events (decoded from an envelope) and server events
//!   (encoded into one).
//!
//! All parsers are panic-free: malformed input is reported as `PulseError`.

pub mod envelope;
pub mod event;

/// Current envelope version.
pub const PROTOCOL_VERSION: u8 = 1;
