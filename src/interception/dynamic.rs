// src/interception/dynamic.rs
//! Fully-dynamic interception strategy
//!
//! The dynamic proxy synthesizes no fixed-shape surface at all: any member
//! access is accepted and resolved to the pipeline at call time. In
//! exchange it supports per-member handler resolution, consulted in order:
//!
//! 1. a [`HandlerRegistry`](super::registry::HandlerRegistry) entry for the
//!    member (honoring the registry's override mode),
//! 2. declarative [`MemberMetadata`](super::capability::MemberMetadata)
//!    carried by the target type,
//! 3. the globally supplied handler.
//!
//! This is one clearly isolated variant, not the default path.

use crate::interception::capability::CapabilitySet;
use crate::interception::handler::Handler;
use crate::interception::interceptor::{
    CapabilityProxy, DispatchMode, InterceptTarget, Interceptor,
};
use crate::interception::registry::HandlerRegistry;
use crate::utils::errors::{InterceptError, Result};
use std::sync::Arc;
use tracing::info;

/// Per-proxy configuration for dynamic member resolution
#[derive(Clone, Default)]
pub(crate) struct DynamicDispatch {
    pub registry: Option<Arc<HandlerRegistry>>,
    pub use_metadata: bool,
}

/// Fully-dynamic strategy: untyped proxies, per-member handlers
#[derive(Clone, Default)]
pub struct DynamicInterceptor {
    registry: Option<Arc<HandlerRegistry>>,
    use_metadata: bool,
}

impl DynamicInterceptor {
    /// Dynamic interceptor that reads declarative member metadata but has
    /// no registry attached
    pub fn new() -> Self {
        Self {
            registry: None,
            use_metadata: true,
        }
    }

    /// Attach a handler registry consulted first for every member access
    pub fn with_registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Ignore declarative per-member metadata on targets
    pub fn without_metadata(mut self) -> Self {
        self.use_metadata = false;
        self
    }
}

impl Interceptor for DynamicInterceptor {
    fn name(&self) -> &'static str {
        "dynamic"
    }

    fn can_intercept(&self, target: &InterceptTarget, _set: &CapabilitySet) -> bool {
        // Untyped: any instance qualifies, whatever set is requested.
        matches!(target, InterceptTarget::Instance(_))
    }

    fn intercept(
        &self,
        target: InterceptTarget,
        set: &CapabilitySet,
        handler: Arc<dyn Handler>,
    ) -> Result<CapabilityProxy> {
        let instance = match target {
            InterceptTarget::Instance(instance) => instance,
            InterceptTarget::Type(_) => {
                return Err(InterceptError::UnsupportedTarget(
                    "dynamic strategy intercepts instances, not types".to_string(),
                ))
            }
        };

        info!(set = %set.id(), strategy = self.name(), "created proxy");

        Ok(CapabilityProxy::new(
            instance,
            handler,
            set.clone(),
            Arc::new(self.clone()),
            DispatchMode::Dynamic(DynamicDispatch {
                registry: self.registry.clone(),
                use_metadata: self.use_metadata,
            }),
        ))
    }
}
