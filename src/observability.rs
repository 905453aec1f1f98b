// src/observability.rs
//! Tracing initialization
//!
//! The pipeline emits structured `tracing` events: proxy creation at INFO,
//! per-invocation routing at DEBUG (tagged with the invocation's call id),
//! and cache/chain diagnostics at TRACE. This module installs a global
//! subscriber exactly once; repeated calls are no-ops.

use crate::utils::config::LogConfig;
use crate::utils::errors::{InterceptError, Result};
use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Initialize tracing with default settings
pub fn init_tracing() -> Result<()> {
    init_tracing_with(&LogConfig::default())
}

/// Initialize tracing with explicit log configuration
pub fn init_tracing_with(cfg: &LogConfig) -> Result<()> {
    let outcome = INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(cfg.level.clone()));

        let builder = tracing_subscriber::fmt().with_env_filter(filter);

        let installed = if cfg.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };

        installed.map_err(|e| InterceptError::Config(format!("tracing init failed: {}", e)))
    });

    outcome.map(|_| ())
}
