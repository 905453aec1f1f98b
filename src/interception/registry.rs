// src/interception/registry.rs
//! Handler registry for per-member overrides
//!
//! Maps a specific member of a capability set to a dedicated handler,
//! overriding the globally supplied handler for just that member. The
//! registry is consulted first at dispatch time; whether a hit replaces
//! the global handler or runs in front of it is an explicit configuration
//! choice ([`OverrideMode`]), not an assumption.

use crate::interception::capability::CapabilitySetId;
use crate::interception::handler::{Handler, HandlerChain};
use crate::utils::config::WeaveConfig;
use crate::utils::errors::{InterceptError, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Identity of one operation on one capability set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberSelector {
    pub set: CapabilitySetId,
    pub member: String,
}

impl MemberSelector {
    pub fn new(set: impl Into<CapabilitySetId>, member: impl Into<String>) -> Self {
        Self {
            set: set.into(),
            member: member.into(),
        }
    }
}

impl fmt::Display for MemberSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.set, self.member)
    }
}

/// How a registry entry interacts with the globally supplied handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverrideMode {
    /// The registered handler handles the member's calls in isolation
    #[default]
    Replace,

    /// The registered handler runs first, then the global handler
    Prepend,
}

/// Per-member handler overrides for dispatch-time resolution
///
/// At most one entry is active per (capability set, member) pair; the last
/// registration for a member wins.
pub struct HandlerRegistry {
    entries: DashMap<MemberSelector, Arc<dyn Handler>>,
    mode: OverrideMode,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::with_mode(OverrideMode::Replace)
    }

    pub fn with_mode(mode: OverrideMode) -> Self {
        Self {
            entries: DashMap::new(),
            mode,
        }
    }

    pub fn from_config(cfg: &WeaveConfig) -> Self {
        Self::with_mode(cfg.pipeline.override_mode)
    }

    pub fn mode(&self) -> OverrideMode {
        self.mode
    }

    /// Associate a handler with one member; fluent, last registration wins
    pub fn register(&self, selector: MemberSelector, handler: Arc<dyn Handler>) -> &Self {
        debug!(%selector, "registering member handler");
        self.entries.insert(selector, handler);
        self
    }

    /// Remove the entry for a member
    pub fn unregister(&self, selector: &MemberSelector) -> Result<()> {
        if self.entries.remove(selector).is_some() {
            debug!(%selector, "unregistered member handler");
            Ok(())
        } else {
            Err(InterceptError::Config(format!(
                "no handler registered for {}",
                selector
            )))
        }
    }

    /// Handler registered for the given member, if any
    pub fn resolve(&self, set: &CapabilitySetId, member: &str) -> Option<Arc<dyn Handler>> {
        let selector = MemberSelector {
            set: set.clone(),
            member: member.to_string(),
        };
        self.entries.get(&selector).map(|entry| Arc::clone(&entry))
    }

    /// Handler that should run for the member, honoring the override mode
    ///
    /// Returns `None` when no entry exists (the caller falls back to the
    /// globally supplied handler, or to other configuration sources).
    pub fn effective(
        &self,
        set: &CapabilitySetId,
        member: &str,
        global: &Arc<dyn Handler>,
    ) -> Option<Arc<dyn Handler>> {
        let registered = self.resolve(set, member)?;

        match self.mode {
            OverrideMode::Replace => Some(registered),
            OverrideMode::Prepend => {
                let chained = HandlerChain::new()
                    .append(registered)
                    .append(Arc::clone(global));
                Some(Arc::new(chained))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
        info!("cleared handler registry");
    }

    /// Export entries as a human-readable table
    pub fn export_entries(&self) -> String {
        let mut lines: Vec<String> = self
            .entries
            .iter()
            .map(|entry| format!("{}", entry.key()))
            .collect();
        lines.sort_unstable();

        let mut output = String::from("# Interpose Handler Registry\n\n");
        for line in &lines {
            output.push_str(line);
            output.push('\n');
        }
        output
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
