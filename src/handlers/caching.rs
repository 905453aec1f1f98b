// src/handlers/caching.rs
//! Caching handler
//!
//! Before proceeding, computes a key from the member identity and the
//! argument values. A still-valid prior result (within the configured
//! time-to-live) is returned without reaching the real target; otherwise
//! the call proceeds and the fresh result is stored under the key.

use crate::interception::context::InvocationContext;
use crate::interception::generator::HandlerTypeId;
use crate::interception::handler::{Continuation, Handler};
use crate::utils::errors::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

struct CachedEntry {
    value: Value,
    stored_at: Instant,
}

/// TTL'd in-memory memoization of invocation results
pub struct CachingHandler {
    ttl: Duration,
    store: DashMap<String, CachedEntry>,
}

impl CachingHandler {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            store: DashMap::new(),
        }
    }

    /// Number of entries currently stored (valid or expired)
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Drop entries past their time-to-live
    pub fn purge_expired(&self) {
        self.store
            .retain(|_, entry| entry.stored_at.elapsed() <= self.ttl);
    }

    fn cache_key(ctx: &InvocationContext) -> String {
        let args = serde_json::to_string(ctx.arguments())
            .unwrap_or_else(|_| format!("{:?}", ctx.arguments()));
        format!("{}|{}", ctx.member(), args)
    }
}

#[async_trait]
impl Handler for CachingHandler {
    async fn handle(&self, ctx: &mut InvocationContext, next: Continuation<'_>) -> Result<()> {
        let key = Self::cache_key(ctx);

        let valid = self.store.get(&key).and_then(|entry| {
            (entry.stored_at.elapsed() <= self.ttl).then(|| entry.value.clone())
        });

        if let Some(value) = valid {
            debug!(%key, "cache hit, short-circuiting");
            ctx.set_result(value);
            return Ok(());
        }

        trace!(%key, "cache miss");
        next.proceed(ctx).await?;

        if let Some(value) = ctx.result() {
            self.store.insert(
                key,
                CachedEntry {
                    value: value.clone(),
                    stored_at: Instant::now(),
                },
            );
        }

        Ok(())
    }

    fn handler_type(&self) -> HandlerTypeId {
        HandlerTypeId::of::<Self>()
    }
}
