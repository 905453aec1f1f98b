// src/handlers/retry.rs
//! Retry handler
//!
//! Re-runs `proceed` on failure, up to a configured number of attempts
//! with a fixed delay between them. After the final failed attempt the
//! last failure is re-raised unchanged.

use crate::interception::context::InvocationContext;
use crate::interception::generator::HandlerTypeId;
use crate::interception::handler::{Continuation, Handler};
use crate::utils::errors::{InterceptError, Result};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

/// Retries a failing invocation a fixed number of times
pub struct RetryHandler {
    /// Total attempts, including the first (minimum 1)
    attempts: usize,

    /// Delay between attempts
    delay: Duration,

    /// Add up to 50% random extra delay per wait
    jitter: bool,
}

impl RetryHandler {
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
            jitter: false,
        }
    }

    /// Spread delays with random jitter to avoid synchronized retries
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    fn next_delay(&self) -> Duration {
        if self.jitter {
            self.delay + self.delay.mul_f64(rand::thread_rng().gen::<f64>() * 0.5)
        } else {
            self.delay
        }
    }
}

#[async_trait]
impl Handler for RetryHandler {
    async fn handle(&self, ctx: &mut InvocationContext, next: Continuation<'_>) -> Result<()> {
        let mut last_failure = None;

        for attempt in 1..=self.attempts {
            match next.proceed(ctx).await {
                Ok(()) => {
                    if attempt > 1 {
                        debug!(
                            member = %ctx.member(),
                            attempt,
                            "invocation succeeded after retry"
                        );
                    }
                    return Ok(());
                }
                Err(failure) => {
                    warn!(
                        member = %ctx.member(),
                        attempt,
                        error = %failure,
                        "invocation attempt failed"
                    );
                    last_failure = Some(failure);

                    if attempt < self.attempts {
                        tokio::time::sleep(self.next_delay()).await;
                    }
                }
            }
        }

        Err(last_failure
            .unwrap_or_else(|| InterceptError::Chain("retry attempts exhausted".to_string())))
    }

    fn handler_type(&self) -> HandlerTypeId {
        HandlerTypeId::of::<Self>()
    }
}
