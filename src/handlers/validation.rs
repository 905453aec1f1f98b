// src/handlers/validation.rs
//! Validation handler
//!
//! Checks target state and arguments against declared rules before
//! proceeding. Any violated rule raises a validation failure and the real
//! target is never reached, so the call has no side effects.

use crate::interception::context::InvocationContext;
use crate::interception::generator::HandlerTypeId;
use crate::interception::handler::{Continuation, Handler};
use crate::utils::errors::{InterceptError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// A named predicate over the invocation context
pub type ValidationRule = Arc<dyn Fn(&InvocationContext) -> bool + Send + Sync>;

/// Rejects invocations violating declared rules
#[derive(Default)]
pub struct ValidationHandler {
    rules: Vec<(String, ValidationRule)>,
}

impl ValidationHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a rule; the description becomes the failure message
    pub fn rule(
        mut self,
        description: impl Into<String>,
        predicate: impl Fn(&InvocationContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.rules.push((description.into(), Arc::new(predicate)));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[async_trait]
impl Handler for ValidationHandler {
    async fn handle(&self, ctx: &mut InvocationContext, next: Continuation<'_>) -> Result<()> {
        for (description, predicate) in &self.rules {
            if !predicate(ctx) {
                warn!(member = %ctx.member(), rule = %description, "validation rejected invocation");
                return Err(InterceptError::Validation(description.clone()));
            }
        }

        next.proceed(ctx).await
    }

    fn handler_type(&self) -> HandlerTypeId {
        HandlerTypeId::of::<Self>()
    }
}
