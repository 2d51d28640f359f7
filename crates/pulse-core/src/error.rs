//! Shared error type across pulse crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed frame.
    BadRequest,
    /// Token rejected by the authentication collaborator.
    AuthFailed,
    /// Frame exceeds the configured size limit.
    PayloadTooLarge,
    /// Unsupported envelope version.
    UnsupportedVersion,
    /// Connection idle for too long.
    Timeout,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in `sys.error` frames.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Timeout => "TIMEOUT",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PulseError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("auth failed")]
    AuthFailed,
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("unsupported protocol version")]
    UnsupportedVersion,
    #[error("idle timeout")]
    Timeout,
    #[error("internal: {0}")]
    Internal(String),
}

impl PulseError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            PulseError::BadRequest(_) => ClientCode::BadRequest,
            PulseError::AuthFailed => ClientCode::AuthFailed,
            PulseError::PayloadTooLarge => ClientCode::PayloadTooLarge,
            PulseError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            PulseError::Timeout => ClientCode::Timeout,
            PulseError::Internal(_) => ClientCode::Internal,
        }
    }
}
