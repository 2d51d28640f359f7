//! Shared application state for the pulse gateway.
//!
//! Owns the config, the metrics registry, the token validator, and the handle
//! to the hub reactor. The hub itself (and the presence registry inside it)
//! lives on its own task for the lifetime of the process.

use std::sync::Arc;

use pulse_core::error::Result;

use crate::auth::{StaticTokens, TokenValidator};
use crate::config::GatewayConfig;
use crate::obs::GatewayMetrics;
use crate::realtime::{Hub, HubHandle};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    hub: HubHandle,
}

struct AppStateInner {
    cfg: GatewayConfig,
    metrics: Arc<GatewayMetrics>,
    validator: Arc<dyn TokenValidator>,
}

impl AppState {
    /// Build state with the config-backed token table. Must run inside a tokio runtime.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let validator: Arc<dyn TokenValidator> = Arc::new(StaticTokens::new(&cfg.auth.tokens));
        Self::with_validator(cfg, validator)
    }

    /// Build state with an external token validator.
    pub fn with_validator(cfg: GatewayConfig, validator: Arc<dyn TokenValidator>) -> Result<Self> {
        cfg.validate()?;

        let metrics = Arc::new(GatewayMetrics::default());
        let (hub, _task) = Hub::spawn(Arc::clone(&metrics), cfg.gateway.hub_queue);

        tracing::info!(
            mode = ?cfg.auth.mode,
            hub_queue = cfg.gateway.hub_queue,
            "realtime hub started"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, metrics, validator }),
            hub,
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn validator(&self) -> &dyn TokenValidator {
        self.inner.validator.as_ref()
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    pub fn set_draining(&self) {
        self.inner.metrics.set_draining();
    }
}
