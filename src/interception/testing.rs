// src/interception/testing.rs
//! Shared test fixtures for the interception pipeline
//!
//! `InstrumentedTarget` is a small in-memory target whose dispatch counter
//! lets tests assert exactly how many times the real implementation ran.

use crate::interception::capability::{Capability, CapabilitySet, MemberDescriptor, MemberKind};
use crate::utils::errors::{InterceptError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Instrumented capability target used across pipeline tests
///
/// Members:
/// - `add(a, b)`: returns the integer sum
/// - `flaky()`: fails `fail_remaining` times, then succeeds with `"ok"`
/// - `boom()`: always fails with a chain failure
/// - `slow()`: sleeps `slow_delay` before returning `"done"`
/// - `balance` property: backed by an in-memory store
/// - `changed(value)` event: accepted and ignored
pub(crate) struct InstrumentedTarget {
    set: CapabilitySet,
    calls: AtomicU64,
    fail_remaining: AtomicU64,
    slow_delay: Duration,
    state: RwLock<HashMap<String, Value>>,
}

impl InstrumentedTarget {
    pub fn new() -> Self {
        Self {
            set: Self::ledger_set(),
            calls: AtomicU64::new(0),
            fail_remaining: AtomicU64::new(0),
            slow_delay: Duration::from_millis(200),
            state: RwLock::new(HashMap::new()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Target whose `flaky` member fails the first `n` dispatches
    pub fn failing_first(n: u64) -> Arc<Self> {
        let target = Self::new();
        target.fail_remaining.store(n, Ordering::Relaxed);
        Arc::new(target)
    }

    /// Target whose `slow` member takes the given duration
    pub fn with_slow_delay(delay: Duration) -> Arc<Self> {
        let mut target = Self::new();
        target.slow_delay = delay;
        Arc::new(target)
    }

    /// Total dispatches observed on the real implementation
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn stored_balance(&self) -> Value {
        self.state
            .read()
            .get("balance")
            .cloned()
            .unwrap_or(json!(0))
    }

    pub fn ledger_set() -> CapabilitySet {
        CapabilitySet::new("tests/ledger")
            .method("add", 2)
            .method("flaky", 0)
            .method("boom", 0)
            .method("slow", 0)
            .property("balance")
            .event("changed", 1)
    }
}

#[async_trait]
impl Capability for InstrumentedTarget {
    fn capability_set(&self) -> &CapabilitySet {
        &self.set
    }

    async fn dispatch(&self, member: &MemberDescriptor, args: &[Value]) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        match (member.name.as_str(), member.kind) {
            ("add", MemberKind::Method) => {
                let a = args.first().and_then(Value::as_i64).unwrap_or(0);
                let b = args.get(1).and_then(Value::as_i64).unwrap_or(0);
                Ok(json!(a + b))
            }
            ("flaky", MemberKind::Method) => {
                if self.fail_remaining.load(Ordering::Relaxed) > 0 {
                    self.fail_remaining.fetch_sub(1, Ordering::Relaxed);
                    Err(InterceptError::Chain("flaky".to_string()))
                } else {
                    Ok(json!("ok"))
                }
            }
            ("boom", MemberKind::Method) => Err(InterceptError::Chain("boom".to_string())),
            ("slow", MemberKind::Method) => {
                tokio::time::sleep(self.slow_delay).await;
                Ok(json!("done"))
            }
            ("balance", MemberKind::PropertyGet) => Ok(self.stored_balance()),
            ("balance", MemberKind::PropertySet) => {
                let value = args.first().cloned().unwrap_or(Value::Null);
                self.state.write().insert("balance".to_string(), value);
                Ok(Value::Null)
            }
            ("changed", MemberKind::Event) => Ok(Value::Null),
            _ => Err(InterceptError::UnknownMember {
                member: member.name.clone(),
            }),
        }
    }
}
