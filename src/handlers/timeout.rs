// src/handlers/timeout.rs
//! Timeout handler
//!
//! Runs `proceed` under an enforced maximum duration. On expiry the wait
//! is abandoned and a timeout failure raised; work already delegated to
//! the real target is not forcibly cancelled beyond dropping this call's
//! future.

use crate::interception::context::InvocationContext;
use crate::interception::generator::HandlerTypeId;
use crate::interception::handler::{Continuation, Handler};
use crate::utils::config::WeaveConfig;
use crate::utils::errors::{InterceptError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Bounds an invocation by a maximum duration
pub struct TimeoutHandler {
    limit: Duration,
}

impl TimeoutHandler {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub fn from_config(cfg: &WeaveConfig) -> Self {
        Self::new(Duration::from_secs(cfg.pipeline.default_timeout_secs))
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }
}

#[async_trait]
impl Handler for TimeoutHandler {
    async fn handle(&self, ctx: &mut InvocationContext, next: Continuation<'_>) -> Result<()> {
        let outcome = tokio::time::timeout(self.limit, next.proceed(ctx)).await;

        match outcome {
            Ok(result) => result,
            Err(_elapsed) => {
                warn!(member = %ctx.member(), limit = ?self.limit, "invocation timed out");
                Err(InterceptError::Timeout {
                    member: ctx.member().name.clone(),
                    limit: self.limit,
                })
            }
        }
    }

    fn handler_type(&self) -> HandlerTypeId {
        HandlerTypeId::of::<Self>()
    }
}
