//! Typed events of the presence/relay protocol.
//!
//! | direction      | type             | data                              |
//! |----------------|------------------|-----------------------------------|
//! | client→server  | `addUser`        | identity string (null → ignored)  |
//! | client→server  | `sendMessage`    | `{senderId, receiverId, text}`    |
//! | server→all     | `getUsers`       | `[{userId, socketId}]`            |
//! | server→target  | `receiveMessage` | `{senderId, text}`                |
//! | server→self    | `sys.ready`      | `{socketId, user?}`               |
//! | server→self    | `sys.error`      | `{code, msg}`                     |

use serde::{Deserialize, Serialize};

use crate::error::{ClientCode, PulseError, Result};
use crate::protocol::envelope::{Envelope, OutEnvelope};

pub const ADD_USER: &str = "addUser";
pub const SEND_MESSAGE: &str = "sendMessage";
pub const GET_USERS: &str = "getUsers";
pub const RECEIVE_MESSAGE: &str = "receiveMessage";
pub const SYS_READY: &str = "sys.ready";
pub const SYS_ERROR: &str = "sys.error";

/// Request to relay a live text payload to another user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageIntent {
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
}

/// Decoded client event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Identity announcement. `None` when the payload is absent or not a string.
    AddUser { user_id: Option<String> },
    SendMessage(MessageIntent),
}

impl ClientEvent {
    /// Decode the typed event carried by an envelope.
    ///
    /// A malformed identity on `addUser` is not an error: it decodes to
    /// `user_id: None` and the registry ignores it.
    pub fn from_envelope(env: &Envelope) -> Result<Self> {
        match env.msg_type.as_str() {
            ADD_USER => {
                let user_id = env
                    .data_str()
                    .and_then(|raw| serde_json::from_str::<String>(raw).ok());
                Ok(ClientEvent::AddUser { user_id })
            }
            SEND_MESSAGE => {
                let raw = env
                    .data_str()
                    .ok_or_else(|| PulseError::BadRequest("sendMessage requires data".into()))?;
                let intent: MessageIntent = serde_json::from_str(raw)
                    .map_err(|e| PulseError::BadRequest(format!("sendMessage invalid data: {e}")))?;
                Ok(ClientEvent::SendMessage(intent))
            }
            other => Err(PulseError::BadRequest(format!("unknown event type: {other}"))),
        }
    }

    /// Parse a raw text frame straight into a typed event.
    pub fn decode(s: &str) -> Result<Self> {
        let env = Envelope::parse(s)?;
        Self::from_envelope(&env)
    }
}

/// One row of the presence snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub user_id: String,
    pub socket_id: String,
}

/// Payload pushed to the relay target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveredMessage {
    pub sender_id: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadyData<'a> {
    socket_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ErrorData<'a> {
    code: &'a str,
    msg: &'a str,
}

/// Server-to-client event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Users(Vec<PresenceEntry>),
    Message(DeliveredMessage),
    Ready { socket_id: String, user: Option<String> },
    Error { code: ClientCode, msg: String },
}

impl ServerEvent {
    pub fn error(err: &PulseError) -> Self {
        ServerEvent::Error {
            code: err.client_code(),
            msg: err.to_string(),
        }
    }

    pub fn msg_type(&self) -> &'static str {
        match self {
            ServerEvent::Users(_) => GET_USERS,
            ServerEvent::Message(_) => RECEIVE_MESSAGE,
            ServerEvent::Ready { .. } => SYS_READY,
            ServerEvent::Error { .. } => SYS_ERROR,
        }
    }

    /// Encode as a JSON text frame.
    pub fn to_json(&self) -> Result<String> {
        let ty = self.msg_type();
        match self {
            ServerEvent::Users(list) => OutEnvelope::new(ty, list).to_json(),
            ServerEvent::Message(m) => OutEnvelope::new(ty, m).to_json(),
            ServerEvent::Ready { socket_id, user } => OutEnvelope::new(
                ty,
                ReadyData {
                    socket_id: socket_id.as_str(),
                    user: user.as_deref(),
                },
            )
            .to_json(),
            ServerEvent::Error { code, msg } => OutEnvelope::new(
                ty,
                ErrorData {
                    code: code.as_str(),
                    msg: msg.as_str(),
                },
            )
            .to_json(),
        }
    }
}
