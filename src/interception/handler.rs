// src/interception/handler.rs
//! Handlers, chains, and the `proceed` continuation
//!
//! A handler is one cross-cutting behavior wrapped around a call. Handlers
//! receive the invocation context together with an explicit
//! [`Continuation`]; calling [`Continuation::proceed`] advances to the next
//! handler or, at the end of the chain, to the real target's
//! implementation. A handler that never proceeds short-circuits the call:
//! the real target is never reached.
//!
//! The continuation is an explicit value, not hidden call-stack control
//! flow, so handlers can proceed zero times (short-circuit), once (the
//! common case), or several times (retry).

use crate::interception::context::InvocationContext;
use crate::interception::generator::HandlerTypeId;
use crate::utils::errors::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::trace;

/// One cross-cutting behavior around a call
///
/// Implementations may mutate arguments before proceeding, inspect or
/// overwrite the context result after proceeding, translate or suppress a
/// failure raised during `proceed`, or raise their own failure to abort
/// the chain.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &mut InvocationContext, next: Continuation<'_>) -> Result<()>;

    /// Concrete type identity, part of the shape-cache key
    ///
    /// Implementations return `HandlerTypeId::of::<Self>()`.
    fn handler_type(&self) -> HandlerTypeId;
}

/// Terminal step of a continuation: what runs when the handlers are
/// exhausted. For the pipeline root this is the real-target invocation;
/// for a nested chain it is the enclosing chain's remainder.
pub(crate) trait Terminal: Send + Sync {
    fn invoke<'a>(&'a self, ctx: &'a mut InvocationContext) -> BoxFuture<'a, Result<()>>;
}

/// The remainder of a handler chain, ending in the real target
///
/// Cheap to copy; borrows the chain it was created from.
#[derive(Clone, Copy)]
pub struct Continuation<'a> {
    handlers: &'a [Arc<dyn Handler>],
    tail: &'a (dyn Terminal + 'a),
}

impl<'a> Continuation<'a> {
    pub(crate) fn new(handlers: &'a [Arc<dyn Handler>], tail: &'a (dyn Terminal + 'a)) -> Self {
        Self { handlers, tail }
    }

    /// Invoke the next handler, or the terminal step when none remain
    ///
    /// May be called any number of times; each call runs the remainder of
    /// the chain against the (possibly mutated) context.
    pub fn proceed<'b>(&self, ctx: &'b mut InvocationContext) -> BoxFuture<'b, Result<()>>
    where
        'a: 'b,
    {
        let cont = *self;
        Box::pin(async move {
            match cont.handlers.split_first() {
                Some((head, rest)) => {
                    trace!(remaining = rest.len(), "advancing handler chain");
                    head.handle(
                        ctx,
                        Continuation {
                            handlers: rest,
                            tail: cont.tail,
                        },
                    )
                    .await
                }
                None => cont.tail.invoke(ctx).await,
            }
        })
    }

    /// Number of handlers left before the terminal step
    pub fn remaining(&self) -> usize {
        self.handlers.len()
    }
}

/// Pipeline root terminal: invoke the real target and store its result
pub(crate) struct TargetTerminal;

impl Terminal for TargetTerminal {
    fn invoke<'a>(&'a self, ctx: &'a mut InvocationContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let target = Arc::clone(ctx.target());
            let member = ctx.member().clone();
            let args = ctx.arguments().to_vec();
            let value = target.dispatch(&member, &args).await?;
            ctx.complete(value);
            Ok(())
        })
    }
}

/// Run one invocation context through a handler, terminating in the real
/// target's implementation
pub(crate) async fn run_pipeline(
    handler: &Arc<dyn Handler>,
    ctx: &mut InvocationContext,
) -> Result<()> {
    let terminal = TargetTerminal;
    Continuation::new(std::slice::from_ref(handler), &terminal)
        .proceed(ctx)
        .await
}

/// Ordered composition of handlers presented as a single handler
///
/// Members execute in insertion order. A chain nested inside another chain
/// behaves exactly like its members spliced in place.
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<Arc<dyn Handler>>,
}

/// Tail used when a chain runs inside an enclosing continuation
struct ChainTail<'n> {
    next: Continuation<'n>,
}

impl<'n> Terminal for ChainTail<'n> {
    fn invoke<'a>(&'a self, ctx: &'a mut InvocationContext) -> BoxFuture<'a, Result<()>> {
        self.next.proceed(ctx)
    }
}

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler; insertion order is execution order
    pub fn append(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn push(&mut self, handler: Arc<dyn Handler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl Handler for HandlerChain {
    async fn handle(&self, ctx: &mut InvocationContext, next: Continuation<'_>) -> Result<()> {
        let tail = ChainTail { next };
        Continuation::new(&self.handlers, &tail).proceed(ctx).await
    }

    fn handler_type(&self) -> HandlerTypeId {
        HandlerTypeId::of::<Self>()
    }
}

/// Identity handler: proceeds once and changes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughHandler;

#[async_trait]
impl Handler for PassthroughHandler {
    async fn handle(&self, ctx: &mut InvocationContext, next: Continuation<'_>) -> Result<()> {
        next.proceed(ctx).await
    }

    fn handler_type(&self) -> HandlerTypeId {
        HandlerTypeId::of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interception::capability::MemberDescriptor;
    use crate::interception::testing::InstrumentedTarget;
    use crate::utils::errors::InterceptError;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use serde_json::json;

    /// Records its label when invoked, then proceeds
    struct OrderHandler {
        label: usize,
        log: Arc<Mutex<Vec<usize>>>,
    }

    #[async_trait]
    impl Handler for OrderHandler {
        async fn handle(&self, ctx: &mut InvocationContext, next: Continuation<'_>) -> Result<()> {
            self.log.lock().push(self.label);
            next.proceed(ctx).await
        }

        fn handler_type(&self) -> HandlerTypeId {
            HandlerTypeId::of::<Self>()
        }
    }

    /// Never proceeds; leaves a fixed result
    struct ShortCircuitHandler;

    #[async_trait]
    impl Handler for ShortCircuitHandler {
        async fn handle(&self, ctx: &mut InvocationContext, _next: Continuation<'_>) -> Result<()> {
            ctx.set_result(json!("intercepted"));
            Ok(())
        }

        fn handler_type(&self) -> HandlerTypeId {
            HandlerTypeId::of::<Self>()
        }
    }

    fn add_ctx(target: Arc<InstrumentedTarget>) -> InvocationContext {
        InvocationContext::new(target, MemberDescriptor::method("add", 2), vec![json!(2), json!(3)])
    }

    #[tokio::test]
    async fn test_passthrough_reaches_target() {
        let target = InstrumentedTarget::shared();
        let mut ctx = add_ctx(Arc::clone(&target));
        let handler: Arc<dyn Handler> = Arc::new(PassthroughHandler);

        run_pipeline(&handler, &mut ctx).await.unwrap();

        assert!(ctx.proceeded());
        assert_eq!(ctx.take_result(), json!(5));
        assert_eq!(target.calls(), 1);
    }

    #[tokio::test]
    async fn test_short_circuit_never_reaches_target() {
        let target = InstrumentedTarget::shared();
        let mut ctx = add_ctx(Arc::clone(&target));
        let handler: Arc<dyn Handler> = Arc::new(ShortCircuitHandler);

        run_pipeline(&handler, &mut ctx).await.unwrap();

        assert!(!ctx.proceeded());
        assert_eq!(ctx.take_result(), json!("intercepted"));
        assert_eq!(target.calls(), 0);
    }

    #[tokio::test]
    async fn test_chain_runs_in_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = HandlerChain::new()
            .append(Arc::new(OrderHandler { label: 1, log: Arc::clone(&log) }))
            .append(Arc::new(OrderHandler { label: 2, log: Arc::clone(&log) }))
            .append(Arc::new(OrderHandler { label: 3, log: Arc::clone(&log) }));

        let target = InstrumentedTarget::shared();
        let mut ctx = add_ctx(target);
        let handler: Arc<dyn Handler> = Arc::new(chain);

        run_pipeline(&handler, &mut ctx).await.unwrap();
        assert_eq!(*log.lock(), vec![1, 2, 3]);
        assert_eq!(ctx.take_result(), json!(5));
    }

    #[tokio::test]
    async fn test_nested_chain_splices_in_place() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner = HandlerChain::new()
            .append(Arc::new(OrderHandler { label: 2, log: Arc::clone(&log) }))
            .append(Arc::new(OrderHandler { label: 3, log: Arc::clone(&log) }));
        let outer = HandlerChain::new()
            .append(Arc::new(OrderHandler { label: 1, log: Arc::clone(&log) }))
            .append(Arc::new(inner))
            .append(Arc::new(OrderHandler { label: 4, log: Arc::clone(&log) }));

        let target = InstrumentedTarget::shared();
        let mut ctx = add_ctx(Arc::clone(&target));
        let handler: Arc<dyn Handler> = Arc::new(outer);

        run_pipeline(&handler, &mut ctx).await.unwrap();
        assert_eq!(*log.lock(), vec![1, 2, 3, 4]);
        assert_eq!(target.calls(), 1);
    }

    /// Rewrites the second argument before proceeding
    struct ArgRewriteHandler;

    #[async_trait]
    impl Handler for ArgRewriteHandler {
        async fn handle(&self, ctx: &mut InvocationContext, next: Continuation<'_>) -> Result<()> {
            ctx.arguments_mut()[1] = json!(100);
            next.proceed(ctx).await
        }

        fn handler_type(&self) -> HandlerTypeId {
            HandlerTypeId::of::<Self>()
        }
    }

    #[tokio::test]
    async fn test_handler_can_rewrite_arguments() {
        let target = InstrumentedTarget::shared();
        let mut ctx = add_ctx(Arc::clone(&target));
        let handler: Arc<dyn Handler> = Arc::new(ArgRewriteHandler);

        run_pipeline(&handler, &mut ctx).await.unwrap();

        // Target saw the rewritten arguments: 2 + 100, not 2 + 3.
        assert_eq!(ctx.take_result(), json!(102));
    }

    #[tokio::test]
    async fn test_failure_propagates_unwrapped() {
        let target = InstrumentedTarget::shared();
        let mut ctx = InvocationContext::new(
            target,
            MemberDescriptor::method("boom", 0),
            vec![],
        );
        let handler: Arc<dyn Handler> = Arc::new(PassthroughHandler);

        let err = run_pipeline(&handler, &mut ctx).await.unwrap_err();
        assert_eq!(err, InterceptError::Chain("boom".to_string()));
    }

    #[tokio::test]
    async fn test_empty_chain_falls_through_to_target() {
        let target = InstrumentedTarget::shared();
        let mut ctx = add_ctx(Arc::clone(&target));
        let handler: Arc<dyn Handler> = Arc::new(HandlerChain::new());

        run_pipeline(&handler, &mut ctx).await.unwrap();
        assert_eq!(ctx.take_result(), json!(5));
        assert_eq!(target.calls(), 1);
    }

    proptest! {
        #[test]
        fn prop_chain_order_matches_insertion(n in 1usize..16) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            rt.block_on(async {
                let log = Arc::new(Mutex::new(Vec::new()));
                let mut chain = HandlerChain::new();
                for label in 0..n {
                    chain.push(Arc::new(OrderHandler { label, log: Arc::clone(&log) }));
                }

                let target = InstrumentedTarget::shared();
                let mut ctx = add_ctx(target);
                let handler: Arc<dyn Handler> = Arc::new(chain);
                run_pipeline(&handler, &mut ctx).await.unwrap();

                let seen = log.lock().clone();
                let expected: Vec<usize> = (0..n).collect();
                assert_eq!(seen, expected);
            });
        }
    }
}
