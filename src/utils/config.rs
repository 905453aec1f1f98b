// src/utils/config.rs
//! Pipeline configuration
//!
//! Configuration is layered: built-in defaults, an optional `interpose.toml`
//! file in the working directory, then `INTERPOSE_`-prefixed environment
//! variables (e.g. `INTERPOSE_PIPELINE__CACHE_SHAPES=false`).

use crate::interception::registry::OverrideMode;
use crate::utils::errors::{InterceptError, Result};
use serde::Deserialize;
use tracing::debug;

/// Top-level crate configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeaveConfig {
    /// Pipeline behavior knobs
    pub pipeline: PipelineConfig,

    /// Log output settings
    pub log: LogConfig,
}

/// Pipeline behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How a registry entry interacts with the globally supplied handler
    pub override_mode: OverrideMode,

    /// Memoize synthesized proxy shapes process-wide
    pub cache_shapes: bool,

    /// Default limit for timeout-style handlers, in seconds
    pub default_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            override_mode: OverrideMode::Replace,
            cache_shapes: true,
            default_timeout_secs: 30,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON-formatted log lines
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl WeaveConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("interpose").required(false))
            .add_source(
                config::Environment::with_prefix("INTERPOSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| InterceptError::Config(e.to_string()))?;

        let cfg: WeaveConfig = settings
            .try_deserialize()
            .map_err(|e| InterceptError::Config(e.to_string()))?;

        debug!(?cfg, "configuration loaded");
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = WeaveConfig::default();
        assert_eq!(cfg.pipeline.override_mode, OverrideMode::Replace);
        assert!(cfg.pipeline.cache_shapes);
        assert_eq!(cfg.pipeline.default_timeout_secs, 30);
        assert_eq!(cfg.log.level, "info");
        assert!(!cfg.log.json);
    }

    #[test]
    fn test_load_without_sources_yields_defaults() {
        let cfg = WeaveConfig::load().unwrap();
        assert_eq!(cfg.pipeline.default_timeout_secs, 30);
    }
}
