// src/interception/mod.rs
//! Interception pipeline and proxy synthesis
//!
//! This module is the core of the crate:
//!
//! - **Capability**: duck-typed conformance surface and capability-set
//!   identity
//! - **Invocation Context**: per-call record of target, member, arguments,
//!   and result/continuation state
//! - **Handler / Handler Chain**: composable cross-cutting behaviors with
//!   an explicit `proceed` continuation
//! - **Handler Registry**: per-member handler overrides
//! - **Interceptors**: interface, subtype, forwarding, and dynamic
//!   strategies producing capability proxies
//! - **Generator**: proxy shape synthesis with a single-flight cache
//!
//! # Architecture
//!
//! ```text
//! Caller
//!   │
//!   ├─ Interceptor.intercept(target, set, handler) ─→ Proxy
//!   │                                │
//!   │                [Shape Generator ± cache]
//!   │
//!   └─ proxy.invoke(member, args)
//!          │
//!          ├─ new InvocationContext
//!          ├─ Handler Chain ── proceed ──→ ... ──→ real target
//!          └─ result / failure flows back through the chain
//! ```

pub mod capability;
pub mod context;
pub mod dynamic;
pub mod generator;
pub mod handler;
pub mod interceptor;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use capability::{
    Capability, CapabilitySet, CapabilitySetId, CapabilityType, MemberDescriptor, MemberKind,
    MemberMetadata,
};
pub use context::InvocationContext;
pub use dynamic::DynamicInterceptor;
pub use generator::{
    global_shape_cache, CachedShapeGenerator, ForwardingShapeGenerator, HandlerTypeId,
    ProxyShape, ShapeGenerator, ShapeKey,
};
pub use handler::{Continuation, Handler, HandlerChain, PassthroughHandler};
pub use interceptor::{
    CapabilityProxy, ForwardingInterceptor, InterceptTarget, Interceptor, InterfaceInterceptor,
    ProxyType, SubtypeInterceptor,
};
pub use registry::{HandlerRegistry, MemberSelector, OverrideMode};
