//! JSON envelope shared by client and server frames.
//!
//! Inbound `data` is kept as `RawValue` so the event decoder only parses the
//! body once it knows which event it is looking at.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{PulseError, Result};
use crate::protocol::PROTOCOL_VERSION;

/// Inbound envelope (client text frame).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Protocol version.
    pub v: u8,
    /// Event name (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Optional payload, stored as raw JSON (lazy parsing). JSON `null` lands as `None`.
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
}

impl Envelope {
    /// Parse a text frame and reject versions this build does not speak.
    pub fn parse(s: &str) -> Result<Self> {
        let env: Envelope = serde_json::from_str(s)
            .map_err(|e| PulseError::BadRequest(format!("invalid envelope json: {e}")))?;
        if env.v != PROTOCOL_VERSION {
            return Err(PulseError::UnsupportedVersion);
        }
        Ok(env)
    }

    /// Raw payload text, if present.
    pub fn data_str(&self) -> Option<&str> {
        self.data.as_deref().map(RawValue::get)
    }
}

/// Outbound envelope (server text frame).
#[derive(Debug, Serialize)]
pub struct OutEnvelope<'a, T: Serialize> {
    pub v: u8,
    #[serde(rename = "type")]
    pub msg_type: &'a str,
    pub data: T,
}

impl<'a, T: Serialize> OutEnvelope<'a, T> {
    pub fn new(msg_type: &'a str, data: T) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            msg_type,
            data,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| PulseError::Internal(format!("json encode failed: {e}")))
    }
}
