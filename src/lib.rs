// src/lib.rs
//! Interpose Aspect-Weaving Library
//!
//! This library lets a caller obtain a substitute object (a proxy) that
//! exposes the same operation surface as a real target, routing every
//! member invocation through a configurable, ordered chain of handlers
//! before (optionally) reaching the real implementation.
//!
//! # Architecture
//!
//! The crate is structured into several key modules:
//!
//! - **interception**: capability sets, invocation contexts, handler
//!   chains, interceptor strategies, and the shape-generation cache
//! - **handlers**: exemplar cross-cutting behaviors (retry, timeout,
//!   caching, validation, change notification, access control, transform)
//! - **observability**: tracing initialization
//! - **utils**: configuration and the error taxonomy
//!
//! # Example
//!
//! ```
//! use interpose::{
//!     CapabilitySet, InterceptTarget, Interceptor, InterfaceInterceptor,
//!     PassthroughHandler,
//! };
//! use std::sync::Arc;
//!
//! # use interpose::{Capability, MemberDescriptor};
//! # use serde_json::{json, Value};
//! # struct Calculator { set: CapabilitySet }
//! # #[async_trait::async_trait]
//! # impl Capability for Calculator {
//! #     fn capability_set(&self) -> &CapabilitySet { &self.set }
//! #     async fn dispatch(&self, member: &MemberDescriptor, args: &[Value]) -> interpose::Result<Value> {
//! #         Ok(json!(args.iter().filter_map(Value::as_i64).sum::<i64>()))
//! #     }
//! # }
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let set = CapabilitySet::new("demo/calculator").method("sum", 2);
//! let target = Arc::new(Calculator { set: set.clone() });
//!
//! let proxy = InterfaceInterceptor::new()
//!     .intercept(InterceptTarget::instance(target), &set, Arc::new(PassthroughHandler))
//!     .unwrap();
//!
//! let result = proxy.invoke("sum", vec![json!(2), json!(3)]).await.unwrap();
//! assert_eq!(result, json!(5));
//! # });
//! ```

// Public module exports
pub mod handlers;
pub mod interception;
pub mod observability;
pub mod utils;

// Re-export commonly used types
pub use interception::{
    global_shape_cache, CachedShapeGenerator, Capability, CapabilityProxy, CapabilitySet,
    CapabilitySetId, CapabilityType, Continuation, DynamicInterceptor, ForwardingInterceptor,
    ForwardingShapeGenerator, Handler, HandlerChain, HandlerRegistry, HandlerTypeId,
    InterceptTarget, Interceptor, InterfaceInterceptor, InvocationContext, MemberDescriptor,
    MemberKind, MemberMetadata, MemberSelector, OverrideMode, PassthroughHandler, ProxyShape,
    ProxyType, ShapeGenerator, SubtypeInterceptor,
};
pub use utils::config::WeaveConfig;
pub use utils::errors::{InterceptError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");

/// Crate build information
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub rustc_version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            git_hash: GIT_HASH,
            build_timestamp: env!("BUILD_TIMESTAMP"),
            rustc_version: env!("RUSTC_VERSION"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_build_info() {
        let info = BuildInfo::current();
        assert!(!info.version.is_empty());
    }
}
