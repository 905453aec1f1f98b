// src/handlers/transform.rs
//! Result transformation handler
//!
//! After `proceed` returns, replaces the context result with a derived
//! value.

use crate::interception::context::InvocationContext;
use crate::interception::generator::HandlerTypeId;
use crate::interception::handler::{Continuation, Handler};
use crate::utils::errors::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Derives a replacement for the invocation result
pub type ResultTransform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Replaces the result with a derived value after proceeding
pub struct TransformHandler {
    transform: ResultTransform,
}

impl TransformHandler {
    pub fn new(transform: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        Self {
            transform: Arc::new(transform),
        }
    }
}

#[async_trait]
impl Handler for TransformHandler {
    async fn handle(&self, ctx: &mut InvocationContext, next: Continuation<'_>) -> Result<()> {
        next.proceed(ctx).await?;

        let current = ctx.take_result();
        ctx.set_result((self.transform)(current));
        Ok(())
    }

    fn handler_type(&self) -> HandlerTypeId {
        HandlerTypeId::of::<Self>()
    }
}
