use serde::Deserialize;
use pulse_core::error::{PulseError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub auth: AuthSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PulseError::UnsupportedVersion);
        }
        self.gateway.validate()?;
        self.auth.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Upper bound on one socket write; a peer that stalls longer is dropped.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Per-connection outbound queue depth. Pushes to a full queue are dropped.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    /// Hub event queue depth. Sessions wait when it is full.
    #[serde(default = "default_hub_queue")]
    pub hub_queue: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
            outbound_queue: default_outbound_queue(),
            hub_queue: default_hub_queue(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(PulseError::BadRequest(
                "gateway.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(PulseError::BadRequest(
                "gateway.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(PulseError::BadRequest(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(100..=60000).contains(&self.write_timeout_ms) {
            return Err(PulseError::BadRequest(
                "gateway.write_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if !(256..=1_048_576).contains(&self.max_frame_bytes) {
            return Err(PulseError::BadRequest(
                "gateway.max_frame_bytes must be between 256 and 1048576".into(),
            ));
        }
        if self.outbound_queue == 0 || self.hub_queue == 0 {
            return Err(PulseError::BadRequest(
                "gateway.outbound_queue and gateway.hub_queue must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:5000".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_write_timeout_ms() -> u64 {
    5000
}
fn default_max_frame_bytes() -> usize {
    16384
}
fn default_outbound_queue() -> usize {
    256
}
fn default_hub_queue() -> usize {
    4096
}

/// How a connection's identity is established.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMode {
    /// Identity is whatever the client announces.
    #[default]
    TrustClient,
    /// Identity is the principal of the token presented at upgrade.
    Verified,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    #[serde(default)]
    pub mode: IdentityMode,

    /// Static bearer tokens accepted in `verified` mode.
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

impl AuthSection {
    pub fn validate(&self) -> Result<()> {
        if self.mode == IdentityMode::Verified && self.tokens.is_empty() {
            return Err(PulseError::BadRequest(
                "auth.tokens must not be empty when auth.mode is verified".into(),
            ));
        }
        if let Some(t) = self.tokens.iter().find(|t| t.token.is_empty() || t.user.trim().is_empty()) {
            return Err(PulseError::BadRequest(format!(
                "auth.tokens entry for user '{}' must have a non-empty token and user",
                t.user
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenEntry {
    pub token: String,
    pub user: String,
}
