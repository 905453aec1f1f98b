// src/interception/generator.rs
//! Proxy shape synthesis and the generation cache
//!
//! "Generating a proxy type" in this crate means building a [`ProxyShape`]:
//! the precomputed member dispatch table a proxy forwards through. Shapes
//! are deterministic for equal inputs, so repeated generation requests for
//! the same (capability set, handler type) key can be answered from a
//! cache with the identical `Arc`: instantiation never re-pays synthesis
//! cost, and downstream identity checks pass.

use crate::interception::capability::{CapabilitySet, CapabilitySetId, MemberDescriptor, MemberKind};
use crate::utils::errors::{InterceptError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Comparable identity of a handler's concrete type
///
/// Part of the shape-cache key: two proxies over the same capability set
/// but different handler types get distinct shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerTypeId {
    id: TypeId,
    name: &'static str,
}

impl HandlerTypeId {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for HandlerTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Synthesized forwarding surface for one (capability set, handler type)
///
/// Holds the member dispatch table every proxy instance over this shape
/// shares. Identity-equal shapes come from the cache, so `Arc::ptr_eq`
/// holds for repeated generation requests with equal keys.
pub struct ProxyShape {
    set_id: CapabilitySetId,
    handler_type: HandlerTypeId,
    members: HashMap<String, Vec<MemberDescriptor>>,
}

impl ProxyShape {
    pub fn set_id(&self) -> &CapabilitySetId {
        &self.set_id
    }

    pub fn handler_type(&self) -> HandlerTypeId {
        self.handler_type
    }

    /// Member with the given name and kind, if the shape exposes it
    pub fn member(&self, name: &str, kind: MemberKind) -> Option<&MemberDescriptor> {
        self.members.get(name)?.iter().find(|m| m.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.members.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl fmt::Debug for ProxyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyShape")
            .field("set_id", &self.set_id)
            .field("handler_type", &self.handler_type.name)
            .field("members", &self.len())
            .finish()
    }
}

/// Cache key: everything that affects a synthesized shape's identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeKey {
    pub set: CapabilitySetId,
    pub handler: HandlerTypeId,
}

/// Produces proxy shapes; deterministic for equal inputs
pub trait ShapeGenerator: Send + Sync {
    fn generate(&self, set: &CapabilitySet, handler_type: HandlerTypeId) -> Result<Arc<ProxyShape>>;

    /// Wrap this generator in a memoizing cache
    fn into_cached(self) -> CachedShapeGenerator<Self>
    where
        Self: Sized,
    {
        CachedShapeGenerator::new(self)
    }
}

/// Baseline generator: validates the capability set and builds the member
/// dispatch table
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardingShapeGenerator;

impl ShapeGenerator for ForwardingShapeGenerator {
    fn generate(&self, set: &CapabilitySet, handler_type: HandlerTypeId) -> Result<Arc<ProxyShape>> {
        if set.id().is_empty() {
            return Err(InterceptError::Generation(
                "capability set has an empty identity".to_string(),
            ));
        }
        if set.is_empty() {
            return Err(InterceptError::Generation(format!(
                "capability set '{}' declares no members",
                set.id()
            )));
        }

        let mut members: HashMap<String, Vec<MemberDescriptor>> = HashMap::new();
        for member in set.members() {
            match member.kind {
                MemberKind::PropertyGet if member.arity != 0 => {
                    return Err(InterceptError::Generation(format!(
                        "unsupported member shape: getter '{}' declares arity {}",
                        member.name, member.arity
                    )));
                }
                MemberKind::PropertySet if member.arity != 1 => {
                    return Err(InterceptError::Generation(format!(
                        "unsupported member shape: setter '{}' declares arity {}",
                        member.name, member.arity
                    )));
                }
                _ => {}
            }

            let slot = members.entry(member.name.clone()).or_default();
            if slot.iter().any(|existing| existing.same_operation(member)) {
                return Err(InterceptError::Generation(format!(
                    "duplicate member '{}' in capability set '{}'",
                    member,
                    set.id()
                )));
            }
            slot.push(member.clone());
        }

        debug!(set = %set.id(), handler = %handler_type, members = set.len(), "synthesized proxy shape");

        Ok(Arc::new(ProxyShape {
            set_id: set.id().clone(),
            handler_type,
            members,
        }))
    }
}

/// Memoizing decorator around a shape generator
///
/// Keyed by (capability set identity, handler type identity). Concurrent
/// first-use for the same key is single-flight: the map shard stays locked
/// while the inner generator runs, so synthesis happens at most once per
/// key and every caller observes the same `Arc`. A failed generation
/// inserts nothing and does not poison other keys.
pub struct CachedShapeGenerator<G: ShapeGenerator> {
    inner: G,
    shapes: DashMap<ShapeKey, Arc<ProxyShape>>,
}

impl<G: ShapeGenerator> CachedShapeGenerator<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            shapes: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn contains(&self, set: &CapabilitySetId, handler: HandlerTypeId) -> bool {
        self.shapes.contains_key(&ShapeKey {
            set: set.clone(),
            handler,
        })
    }

    /// Drop every cached shape
    pub fn clear(&self) {
        self.shapes.clear();
    }
}

impl<G: ShapeGenerator> ShapeGenerator for CachedShapeGenerator<G> {
    fn generate(&self, set: &CapabilitySet, handler_type: HandlerTypeId) -> Result<Arc<ProxyShape>> {
        let key = ShapeKey {
            set: set.id().clone(),
            handler: handler_type,
        };

        match self.shapes.entry(key) {
            Entry::Occupied(occupied) => {
                trace!(set = %set.id(), handler = %handler_type, "shape cache hit");
                Ok(Arc::clone(occupied.get()))
            }
            Entry::Vacant(vacant) => {
                let shape = self.inner.generate(set, handler_type)?;
                Ok(Arc::clone(&*vacant.insert(shape)))
            }
        }
    }
}

static GLOBAL_SHAPES: Lazy<Arc<CachedShapeGenerator<ForwardingShapeGenerator>>> =
    Lazy::new(|| Arc::new(ForwardingShapeGenerator.into_cached()));

/// Process-wide shape cache shared by default interceptor instances
///
/// Explicitly injectable: interceptors accept any [`ShapeGenerator`], so
/// tests substitute a fresh cache instead of relying on this one.
pub fn global_shape_cache() -> Arc<CachedShapeGenerator<ForwardingShapeGenerator>> {
    Arc::clone(&GLOBAL_SHAPES)
}
