// src/handlers/access.rs
//! Access control handler
//!
//! Checks an authorization predicate before proceeding. A denied call
//! raises an authorization failure and the real target is never reached.

use crate::interception::context::InvocationContext;
use crate::interception::generator::HandlerTypeId;
use crate::interception::handler::{Continuation, Handler};
use crate::utils::errors::{InterceptError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Authorization predicate over the invocation context
pub type AccessPredicate = Arc<dyn Fn(&InvocationContext) -> bool + Send + Sync>;

/// Denies invocations failing an authorization predicate
pub struct AccessControlHandler {
    policy: String,
    predicate: AccessPredicate,
}

impl AccessControlHandler {
    pub fn new(
        policy: impl Into<String>,
        predicate: impl Fn(&InvocationContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            policy: policy.into(),
            predicate: Arc::new(predicate),
        }
    }
}

#[async_trait]
impl Handler for AccessControlHandler {
    async fn handle(&self, ctx: &mut InvocationContext, next: Continuation<'_>) -> Result<()> {
        if !(self.predicate)(ctx) {
            warn!(member = %ctx.member(), policy = %self.policy, "authorization denied");
            return Err(InterceptError::Authorization(format!(
                "member '{}' denied by policy '{}'",
                ctx.member().name,
                self.policy
            )));
        }

        next.proceed(ctx).await
    }

    fn handler_type(&self) -> HandlerTypeId {
        HandlerTypeId::of::<Self>()
    }
}
