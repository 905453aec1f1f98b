// src/interception/capability.rs
//! Capability sets and target conformance
//!
//! A capability set is the named collection of operations a target (and any
//! proxy standing in for it) exposes. Conformance is duck-typed: any value
//! implementing [`Capability`] can be intercepted, regardless of its
//! concrete type. The set's identity is a first-class comparable value
//! because it participates in generation-cache keys.

use crate::interception::handler::Handler;
use crate::utils::errors::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Stable identity of a capability set
///
/// Participates in shape-cache keys, so two descriptors with equal ids are
/// treated as describing the same forwarding surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CapabilitySetId(String);

impl CapabilitySetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CapabilitySetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilitySetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CapabilitySetId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// The shape class of a member operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    /// Plain callable operation
    Method,
    /// Property read (arity 0)
    PropertyGet,
    /// Property write (arity 1)
    PropertySet,
    /// Event raise
    Event,
}

/// Identity of one operation on a capability set
///
/// Two descriptors denote the same member when name, kind, and arity match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberDescriptor {
    /// Member name
    pub name: String,

    /// Member shape class
    pub kind: MemberKind,

    /// Number of arguments the member takes
    pub arity: usize,

    /// Whether a subtype may override this member
    pub overridable: bool,
}

impl MemberDescriptor {
    /// Describe a method member
    pub fn method(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
            arity,
            overridable: true,
        }
    }

    /// Describe a property getter
    pub fn property_get(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::PropertyGet,
            arity: 0,
            overridable: true,
        }
    }

    /// Describe a property setter
    pub fn property_set(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::PropertySet,
            arity: 1,
            overridable: true,
        }
    }

    /// Describe an event member
    pub fn event(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Event,
            arity,
            overridable: true,
        }
    }

    /// Mark the member as not overridable by subtype synthesis
    pub fn sealed(mut self) -> Self {
        self.overridable = false;
        self
    }

    /// True when `other` denotes the same operation
    pub fn same_operation(&self, other: &MemberDescriptor) -> bool {
        self.name == other.name && self.kind == other.kind && self.arity == other.arity
    }
}

impl fmt::Display for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:?}({})", self.name, self.kind, self.arity)
    }
}

/// A named set of operations a target or proxy exposes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitySet {
    id: CapabilitySetId,
    members: Vec<MemberDescriptor>,
}

impl CapabilitySet {
    /// Create an empty capability set with the given stable identity
    pub fn new(id: impl Into<CapabilitySetId>) -> Self {
        Self {
            id: id.into(),
            members: Vec::new(),
        }
    }

    /// Add an arbitrary member descriptor
    pub fn with_member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    /// Add a method member
    pub fn method(self, name: impl Into<String>, arity: usize) -> Self {
        self.with_member(MemberDescriptor::method(name, arity))
    }

    /// Add a property (both getter and setter)
    pub fn property(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.with_member(MemberDescriptor::property_get(name.clone()))
            .with_member(MemberDescriptor::property_set(name))
    }

    /// Add an event member
    pub fn event(self, name: impl Into<String>, arity: usize) -> Self {
        self.with_member(MemberDescriptor::event(name, arity))
    }

    pub fn id(&self) -> &CapabilitySetId {
        &self.id
    }

    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// First member with the given name, regardless of kind
    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Member with the given name and kind
    pub fn member_of_kind(&self, name: &str, kind: MemberKind) -> Option<&MemberDescriptor> {
        self.members
            .iter()
            .find(|m| m.name == name && m.kind == kind)
    }

    /// True when this set exposes every operation `other` declares
    ///
    /// This is the conformance check behind the proxy invariant: a proxy's
    /// exposed capability set must be covered by the target's actual set.
    pub fn is_superset_of(&self, other: &CapabilitySet) -> bool {
        other
            .members
            .iter()
            .all(|needed| self.members.iter().any(|have| have.same_operation(needed)))
    }
}

/// Duck-typed conformance surface every interceptable target implements
///
/// `dispatch` is the literal real-target operation: the terminal fallback
/// the pipeline reaches when every handler proceeds to the end of the chain.
#[async_trait::async_trait]
pub trait Capability: Send + Sync {
    /// The set of operations this target actually exposes
    fn capability_set(&self) -> &CapabilitySet;

    /// Invoke one member with the given arguments
    async fn dispatch(&self, member: &MemberDescriptor, args: &[Value]) -> Result<Value>;

    /// Declarative per-member handler associations carried by the target
    /// type, if any. Consulted by the fully-dynamic strategy after the
    /// handler registry and before the globally supplied handler.
    fn member_metadata(&self) -> Option<&MemberMetadata> {
        None
    }
}

/// Type-shaped target for subtype synthesis
///
/// Describes a capability set and constructs fresh instances. The original
/// target's own construction path is bypassed; handlers that need state
/// from a pre-existing instance must source it themselves.
pub trait CapabilityType: Send + Sync {
    /// The capability set instances of this type expose
    fn capability_set(&self) -> &CapabilitySet;

    /// Construct a fresh instance to back a synthesized proxy
    fn construct(&self) -> Arc<dyn Capability>;
}

/// Static per-member handler associations a target type carries
///
/// The declarative analogue of runtime registry entries: the same
/// member-to-handler association, read from the target instead of from a
/// registry consulted at dispatch time.
#[derive(Default, Clone)]
pub struct MemberMetadata {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl MemberMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a handler with one member name
    pub fn with(mut self, member: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.handlers.insert(member.into(), handler);
        self
    }

    /// Handler annotated on the given member, if any
    pub fn handler_for(&self, member: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(member).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for MemberMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("MemberMetadata")
            .field("members", &names)
            .finish()
    }
}
