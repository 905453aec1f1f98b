// src/interception/context.rs
//! Per-call invocation context
//!
//! Exactly one [`InvocationContext`] exists per call attempt through a
//! proxy. It carries the immutable description of the call (target, member
//! identity, call id) plus the mutable state the handler chain works on
//! (arguments, result slot, proceeded flag). Contexts are never reused or
//! shared across calls; the context is destroyed when the call returns.

use crate::interception::capability::{Capability, MemberDescriptor};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use ulid::Ulid;

/// Mutable description of one call attempt through the pipeline
pub struct InvocationContext {
    /// Unique id for this call attempt, carried through log events
    call_id: Ulid,

    /// The real object behind the proxy
    target: Arc<dyn Capability>,

    /// Identity of the invoked operation
    member: MemberDescriptor,

    /// Ordered argument values; handlers may rewrite these before proceeding
    arguments: Vec<Value>,

    /// Result slot, unset until the target (or a handler) produces a value
    result: Option<Value>,

    /// Whether the real target's implementation has run
    proceeded: bool,
}

impl InvocationContext {
    /// Create a fresh context for one call attempt
    pub fn new(target: Arc<dyn Capability>, member: MemberDescriptor, arguments: Vec<Value>) -> Self {
        Self {
            call_id: Ulid::new(),
            target,
            member,
            arguments,
            result: None,
            proceeded: false,
        }
    }

    pub fn call_id(&self) -> Ulid {
        self.call_id
    }

    /// The real object behind the proxy (the pre-interception instance)
    pub fn target(&self) -> &Arc<dyn Capability> {
        &self.target
    }

    pub fn member(&self) -> &MemberDescriptor {
        &self.member
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Mutable access so handlers can rewrite arguments before proceeding
    pub fn arguments_mut(&mut self) -> &mut Vec<Value> {
        &mut self.arguments
    }

    /// Current result value, if one has been produced
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    /// Overwrite the result slot
    pub fn set_result(&mut self, value: Value) {
        self.result = Some(value);
    }

    /// Consume the result slot; `Null` when no handler or target set one
    pub fn take_result(&mut self) -> Value {
        self.result.take().unwrap_or(Value::Null)
    }

    /// Whether the real target's implementation ran for this call
    pub fn proceeded(&self) -> bool {
        self.proceeded
    }

    /// Record that the real target produced this value
    pub(crate) fn complete(&mut self, value: Value) {
        self.result = Some(value);
        self.proceeded = true;
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("call_id", &self.call_id)
            .field("member", &self.member)
            .field("arguments", &self.arguments.len())
            .field("has_result", &self.result.is_some())
            .field("proceeded", &self.proceeded)
            .finish()
    }
}
