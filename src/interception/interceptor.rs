// src/interception/interceptor.rs
//! Interceptor strategies and the capability proxy
//!
//! An interceptor is a polymorphic strategy that, given a target and a
//! capability set plus a handler, produces a [`CapabilityProxy`]: a
//! substitute exposing that capability set whose every member invocation
//! is routed into a fresh invocation context fed to the handler chain,
//! terminating (if not short-circuited) in the real target's
//! implementation.
//!
//! Strategies:
//!
//! - **Interface** ([`InterfaceInterceptor`]): capability set described
//!   independently of the target's concrete type; synthesizes a shared
//!   dispatch shape (cacheable) for the forwarding surface.
//! - **Subtype** ([`SubtypeInterceptor`]): operates on a *type*; callers
//!   instantiate the synthesized [`ProxyType`] separately. Only
//!   overridable members route through the pipeline.
//! - **Forwarding** ([`ForwardingInterceptor`]): generic call-forwarding
//!   indirection, no shape synthesis; simpler, slightly slower lookups.
//! - **Dynamic** ([`super::dynamic::DynamicInterceptor`]): untyped; any
//!   member access resolves at call time, with per-member handler
//!   resolution.

use crate::interception::capability::{
    Capability, CapabilitySet, CapabilityType, MemberDescriptor, MemberKind,
};
use crate::interception::context::InvocationContext;
use crate::interception::dynamic::DynamicDispatch;
use crate::interception::generator::{
    global_shape_cache, ProxyShape, ShapeGenerator,
};
use crate::interception::handler::{run_pipeline, Handler};
use crate::utils::config::WeaveConfig;
use crate::utils::errors::{InterceptError, Result};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// What an interceptor is asked to stand in for
#[derive(Clone)]
pub enum InterceptTarget {
    /// A live instance exposing a capability set
    Instance(Arc<dyn Capability>),

    /// A type descriptor; instances are constructed by the synthesized
    /// proxy type, bypassing the original construction path
    Type(Arc<dyn CapabilityType>),
}

impl InterceptTarget {
    pub fn instance(target: Arc<dyn Capability>) -> Self {
        Self::Instance(target)
    }

    pub fn of_type(ty: Arc<dyn CapabilityType>) -> Self {
        Self::Type(ty)
    }
}

impl fmt::Debug for InterceptTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(target) => write!(f, "Instance({})", target.capability_set().id()),
            Self::Type(ty) => write!(f, "Type({})", ty.capability_set().id()),
        }
    }
}

/// Polymorphic interception strategy
pub trait Interceptor: Send + Sync {
    /// Strategy name, reported through proxy introspection
    fn name(&self) -> &'static str;

    /// True iff the candidate's shape is compatible with this strategy
    fn can_intercept(&self, target: &InterceptTarget, set: &CapabilitySet) -> bool;

    /// Produce a proxy routing the capability set through the handler
    ///
    /// Fails with [`InterceptError::UnsupportedTarget`] when
    /// `can_intercept` would be false.
    fn intercept(
        &self,
        target: InterceptTarget,
        set: &CapabilitySet,
        handler: Arc<dyn Handler>,
    ) -> Result<CapabilityProxy>;
}

/// Internal dispatch mechanism of a proxy, one per strategy family
#[derive(Clone)]
pub(crate) enum DispatchMode {
    /// Precomputed dispatch table shared via the generation cache
    Shaped(Arc<ProxyShape>),

    /// Per-call lookup against the exposed capability set
    Forwarding,

    /// Untyped access with per-member handler resolution
    Dynamic(DynamicDispatch),
}

impl DispatchMode {
    fn label(&self) -> &'static str {
        match self {
            Self::Shaped(_) => "shaped",
            Self::Forwarding => "forwarding",
            Self::Dynamic(_) => "dynamic",
        }
    }
}

/// How one member access should be carried out
enum Resolution {
    /// Route through the handler chain
    Pipeline(MemberDescriptor),

    /// Invoke the real target directly (non-overridable subtype member)
    Direct(MemberDescriptor),

    /// Not part of the proxy's surface
    Unknown,
}

/// Substitute object exposing a capability set and routing every member
/// invocation through the interception pipeline
///
/// The proxy references the real target exclusively but does not manage
/// its lifetime; the handler is shared and must outlive the proxy. The
/// introspection surface (`underlying_target`, `created_by`) supports
/// diagnostics and nested proxying. A proxy is itself a [`Capability`],
/// so it can be intercepted again.
#[derive(Clone)]
pub struct CapabilityProxy {
    target: Arc<dyn Capability>,
    handler: Arc<dyn Handler>,
    set: CapabilitySet,
    interceptor: Arc<dyn Interceptor>,
    mode: DispatchMode,
}

impl CapabilityProxy {
    pub(crate) fn new(
        target: Arc<dyn Capability>,
        handler: Arc<dyn Handler>,
        set: CapabilitySet,
        interceptor: Arc<dyn Interceptor>,
        mode: DispatchMode,
    ) -> Self {
        Self {
            target,
            handler,
            set,
            interceptor,
            mode,
        }
    }

    /// The real object behind this proxy (the pre-interception instance)
    pub fn underlying_target(&self) -> &Arc<dyn Capability> {
        &self.target
    }

    /// The interceptor that created this proxy
    pub fn created_by(&self) -> &Arc<dyn Interceptor> {
        &self.interceptor
    }

    /// The capability set this proxy exposes
    pub fn capability_set(&self) -> &CapabilitySet {
        &self.set
    }

    /// The globally supplied handler for this proxy
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Invoke a method member
    pub async fn invoke(&self, member: &str, args: Vec<Value>) -> Result<Value> {
        self.call(member, MemberKind::Method, args).await
    }

    /// Read a property member
    pub async fn get_property(&self, name: &str) -> Result<Value> {
        self.call(name, MemberKind::PropertyGet, Vec::new()).await
    }

    /// Write a property member
    pub async fn set_property(&self, name: &str, value: Value) -> Result<()> {
        self.call(name, MemberKind::PropertySet, vec![value]).await?;
        Ok(())
    }

    /// Raise an event member
    pub async fn raise_event(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        self.call(name, MemberKind::Event, args).await
    }

    async fn call(&self, name: &str, kind: MemberKind, args: Vec<Value>) -> Result<Value> {
        let member = match self.resolve_member(name, kind, args.len()) {
            Resolution::Pipeline(member) => member,
            Resolution::Direct(member) => {
                // Sealed member on a synthesized subtype: the pipeline is
                // bypassed and the base implementation runs as-is.
                return self.target.dispatch(&member, &args).await;
            }
            Resolution::Unknown => {
                return Err(InterceptError::UnknownMember {
                    member: name.to_string(),
                })
            }
        };

        let handler = self.effective_handler(&member);
        let mut ctx = InvocationContext::new(Arc::clone(&self.target), member, args);

        debug!(
            call_id = %ctx.call_id(),
            member = %ctx.member(),
            strategy = self.mode.label(),
            "routing invocation through pipeline"
        );

        run_pipeline(&handler, &mut ctx).await?;
        Ok(ctx.take_result())
    }

    fn resolve_member(&self, name: &str, kind: MemberKind, arity: usize) -> Resolution {
        match &self.mode {
            DispatchMode::Shaped(shape) => {
                if let Some(member) = shape.member(name, kind) {
                    Resolution::Pipeline(member.clone())
                } else if let Some(member) = self.set.member_of_kind(name, kind) {
                    Resolution::Direct(member.clone())
                } else {
                    Resolution::Unknown
                }
            }
            DispatchMode::Forwarding => match self.set.member_of_kind(name, kind) {
                Some(member) => Resolution::Pipeline(member.clone()),
                None => Resolution::Unknown,
            },
            DispatchMode::Dynamic(_) => {
                let member = self
                    .set
                    .member_of_kind(name, kind)
                    .or_else(|| self.target.capability_set().member_of_kind(name, kind))
                    .cloned()
                    .unwrap_or(MemberDescriptor {
                        name: name.to_string(),
                        kind,
                        arity,
                        overridable: true,
                    });
                Resolution::Pipeline(member)
            }
        }
    }

    /// Handler that should run for the member
    ///
    /// Typed strategies always use the globally supplied handler. The
    /// dynamic strategy resolves per member: registry entry first, then
    /// declarative metadata on the target, then the global handler.
    fn effective_handler(&self, member: &MemberDescriptor) -> Arc<dyn Handler> {
        if let DispatchMode::Dynamic(dynamic) = &self.mode {
            if let Some(registry) = &dynamic.registry {
                if let Some(handler) =
                    registry.effective(self.set.id(), &member.name, &self.handler)
                {
                    return handler;
                }
            }
            if dynamic.use_metadata {
                if let Some(metadata) = self.target.member_metadata() {
                    if let Some(handler) = metadata.handler_for(&member.name) {
                        return handler;
                    }
                }
            }
        }
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for CapabilityProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityProxy")
            .field("set", &self.set.id())
            .field("strategy", &self.mode.label())
            .field("interceptor", &self.interceptor.name())
            .finish()
    }
}

#[async_trait::async_trait]
impl Capability for CapabilityProxy {
    fn capability_set(&self) -> &CapabilitySet {
        &self.set
    }

    async fn dispatch(&self, member: &MemberDescriptor, args: &[Value]) -> Result<Value> {
        self.call(&member.name, member.kind, args.to_vec()).await
    }
}

/// Interface-surface strategy
///
/// The target implements a capability set described independently of its
/// concrete type. The forwarding surface is synthesized once per
/// (capability set, handler type) and shared through the generation cache.
#[derive(Clone)]
pub struct InterfaceInterceptor {
    generator: Arc<dyn ShapeGenerator>,
}

impl InterfaceInterceptor {
    /// Interceptor backed by the process-wide shape cache
    pub fn new() -> Self {
        Self {
            generator: global_shape_cache(),
        }
    }

    /// Interceptor backed by an explicit generator (tests inject a fresh
    /// cache, or an uncached generator)
    pub fn with_generator(generator: Arc<dyn ShapeGenerator>) -> Self {
        Self { generator }
    }

    pub fn from_config(cfg: &WeaveConfig) -> Self {
        if cfg.pipeline.cache_shapes {
            Self::new()
        } else {
            Self::with_generator(Arc::new(
                crate::interception::generator::ForwardingShapeGenerator,
            ))
        }
    }
}

impl Default for InterfaceInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for InterfaceInterceptor {
    fn name(&self) -> &'static str {
        "interface"
    }

    fn can_intercept(&self, target: &InterceptTarget, set: &CapabilitySet) -> bool {
        match target {
            InterceptTarget::Instance(instance) => {
                instance.capability_set().is_superset_of(set)
            }
            InterceptTarget::Type(_) => false,
        }
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
                    "interface strategy intercepts instances, not types".to_string(),
                ))
            }
        };

        if !instance.capability_set().is_superset_of(set) {
            return Err(InterceptError::UnsupportedTarget(format!(
                "target '{}' does not expose capability set '{}'",
                instance.capability_set().id(),
                set.id()
            )));
        }

        let shape = self.generator.generate(set, handler.handler_type())?;

        info!(set = %set.id(), strategy = self.name(), "created proxy");

        Ok(CapabilityProxy::new(
            instance,
            handler,
            set.clone(),
            Arc::new(self.clone()),
            DispatchMode::Shaped(shape),
        ))
    }
}

/// Runtime-forwarding strategy
///
/// Uses the generic `Capability::dispatch` indirection directly instead of
/// synthesizing a shape. Same external proxy contract; trades a per-call
/// member lookup for zero synthesis cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardingInterceptor;

impl ForwardingInterceptor {
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for ForwardingInterceptor {
    fn name(&self) -> &'static str {
        "forwarding"
    }

    fn can_intercept(&self, target: &InterceptTarget, set: &CapabilitySet) -> bool {
        match target {
            InterceptTarget::Instance(instance) => {
                instance.capability_set().is_superset_of(set)
            }
            InterceptTarget::Type(_) => false,
        }
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
                    "forwarding strategy intercepts instances, not types".to_string(),
                ))
            }
        };

        if !instance.capability_set().is_superset_of(set) {
            return Err(InterceptError::UnsupportedTarget(format!(
                "target '{}' does not expose capability set '{}'",
                instance.capability_set().id(),
                set.id()
            )));
        }

        info!(set = %set.id(), strategy = self.name(), "created proxy");

        Ok(CapabilityProxy::new(
            instance,
            handler,
            set.clone(),
            Arc::new(*self),
            DispatchMode::Forwarding,
        ))
    }
}

/// Reusable synthesized subtype produced by [`SubtypeInterceptor`]
///
/// Instantiation constructs the backing instance through the type
/// descriptor; the original target's construction path is bypassed.
pub struct ProxyType {
    ty: Arc<dyn CapabilityType>,
    handler: Arc<dyn Handler>,
    shape: Arc<ProxyShape>,
    interceptor: Arc<dyn Interceptor>,
}

impl ProxyType {
    pub fn capability_set(&self) -> &CapabilitySet {
        self.ty.capability_set()
    }

    /// The synthesized dispatch shape (cache-shared across equal requests)
    pub fn shape(&self) -> &Arc<ProxyShape> {
        &self.shape
    }

    /// Construct a fresh proxy instance of this synthesized type
    pub fn instantiate(&self) -> CapabilityProxy {
        let instance = self.ty.construct();
        debug!(set = %self.ty.capability_set().id(), "instantiated synthesized subtype");

        CapabilityProxy::new(
            instance,
            Arc::clone(&self.handler),
            self.ty.capability_set().clone(),
            Arc::clone(&self.interceptor),
            DispatchMode::Shaped(Arc::clone(&self.shape)),
        )
    }
}

impl fmt::Debug for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyType")
            .field("set", &self.ty.capability_set().id())
            .field("shape", &self.shape)
            .finish()
    }
}

/// Overridable-member strategy
///
/// Operates on a type descriptor rather than an instance: synthesis
/// produces a [`ProxyType`] whose overridable members route through the
/// pipeline; sealed members dispatch directly to the base implementation.
#[derive(Clone)]
pub struct SubtypeInterceptor {
    generator: Arc<dyn ShapeGenerator>,
}

impl SubtypeInterceptor {
    pub fn new() -> Self {
        Self {
            generator: global_shape_cache(),
        }
    }

    pub fn with_generator(generator: Arc<dyn ShapeGenerator>) -> Self {
        Self { generator }
    }

    /// Synthesize a reusable proxy type for the descriptor
    pub fn synthesize(
        &self,
        ty: Arc<dyn CapabilityType>,
        handler: Arc<dyn Handler>,
    ) -> Result<ProxyType> {
        let set = ty.capability_set();
        let overridable: Vec<MemberDescriptor> = set
            .members()
            .iter()
            .filter(|m| m.overridable)
            .cloned()
            .collect();

        if overridable.is_empty() {
            return Err(InterceptError::UnsupportedTarget(format!(
                "type '{}' has no overridable members",
                set.id()
            )));
        }

        // The overridable subset gets its own identity so the cache never
        // confuses it with an interface shape for the full set.
        let mut subtype_set = CapabilitySet::new(format!("{}#overridable", set.id()));
        for member in overridable {
            subtype_set = subtype_set.with_member(member);
        }

        let shape = self.generator.generate(&subtype_set, handler.handler_type())?;

        info!(set = %set.id(), strategy = self.name(), "synthesized proxy type");

        Ok(ProxyType {
            ty,
            handler,
            shape,
            interceptor: Arc::new(self.clone()),
        })
    }
}

impl Default for SubtypeInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for SubtypeInterceptor {
    fn name(&self) -> &'static str {
        "subtype"
    }

    fn can_intercept(&self, target: &InterceptTarget, set: &CapabilitySet) -> bool {
        match target {
            InterceptTarget::Type(ty) => {
                ty.capability_set().is_superset_of(set)
                    && ty.capability_set().members().iter().any(|m| m.overridable)
            }
            InterceptTarget::Instance(_) => false,
        }
    }

    fn intercept(
        &self,
        target: InterceptTarget,
        set: &CapabilitySet,
        handler: Arc<dyn Handler>,
    ) -> Result<CapabilityProxy> {
        let ty = match target {
            InterceptTarget::Type(ty) => ty,
            InterceptTarget::Instance(_) => {
                return Err(InterceptError::UnsupportedTarget(
                    "subtype strategy operates on types, not instances".to_string(),
                ))
            }
        };

        if !ty.capability_set().is_superset_of(set) {
            return Err(InterceptError::UnsupportedTarget(format!(
                "type '{}' does not expose capability set '{}'",
                ty.capability_set().id(),
                set.id()
            )));
        }

        Ok(self.synthesize(ty, handler)?.instantiate())
    }
}
