//! Identity binding for realtime sessions.
//!
//! Token validation belongs to the external authentication service; the
//! gateway only consumes it through `TokenValidator`. `StaticTokens` is the
//! config-backed stand-in used for local runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;

use pulse_core::error::{PulseError, Result};
use pulse_core::protocol::event::MessageIntent;

use crate::config::{IdentityMode, TokenEntry};

/// Resolves a bearer token to the principal it was issued for.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<String>;
}

pub struct StaticTokens {
    tokens: HashMap<String, String>,
}

impl StaticTokens {
    pub fn new(entries: &[TokenEntry]) -> Self {
        let tokens = entries
            .iter()
            .map(|e| (e.token.clone(), e.user.clone()))
            .collect();
        Self { tokens }
    }
}

#[async_trait]
impl TokenValidator for StaticTokens {
    async fn validate(&self, token: &str) -> Result<String> {
        self.tokens.get(token).cloned().ok_or(PulseError::AuthFailed)
    }
}

/// Who a session speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// `trust_client`: identity comes from the client payload.
    Unverified,
    /// `verified`: identity derived from a validated token.
    Verified(String),
}

impl Principal {
    pub fn user(&self) -> Option<&str> {
        match self {
            Principal::Unverified => None,
            Principal::Verified(u) => Some(u.as_str()),
        }
    }

    /// Identity to register for an `addUser` claim.
    ///
    /// Verified sessions always register their own principal; a claim naming
    /// somebody else yields `None` and is not registered.
    pub fn bind_identity(&self, claimed: Option<String>) -> Option<String> {
        match self {
            Principal::Unverified => claimed,
            Principal::Verified(user) => match claimed {
                Some(c) if c != *user => {
                    tracing::warn!(principal = %user, claimed = %c, "identity claim does not match token");
                    None
                }
                _ => Some(user.clone()),
            },
        }
    }

    /// Verified sessions cannot send as someone else.
    pub fn bind_sender(&self, mut intent: MessageIntent) -> MessageIntent {
        if let Principal::Verified(user) = self {
            if intent.sender_id != *user {
                intent.sender_id = user.clone();
            }
        }
        intent
    }
}

/// Resolve the session principal at upgrade time.
pub async fn authenticate(
    mode: IdentityMode,
    validator: &dyn TokenValidator,
    token: Option<&str>,
) -> Result<Principal> {
    match mode {
        IdentityMode::TrustClient => Ok(Principal::Unverified),
        IdentityMode::Verified => {
            let token = token.filter(|t| !t.is_empty()).ok_or(PulseError::AuthFailed)?;
            validator.validate(token).await.map(Principal::Verified)
        }
    }
}
