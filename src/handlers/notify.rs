// src/handlers/notify.rs
//! Change notification handler
//!
//! Raises a "changing" event before a property write proceeds and a
//! "changed" event after it completes. Non-property members pass through
//! without notifications.

use crate::interception::capability::MemberKind;
use crate::interception::context::InvocationContext;
use crate::interception::generator::HandlerTypeId;
use crate::interception::handler::{Continuation, Handler};
use crate::utils::errors::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

/// Which side of the mutation an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePhase {
    /// The write is about to proceed
    Changing,
    /// The write completed
    Changed,
}

/// Notification payload delivered to listeners
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Property member being written
    pub member: String,

    pub phase: ChangePhase,

    /// The value being written
    pub value: Value,
}

/// Listener invoked synchronously around property writes
pub type ChangeListener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Raises changing/changed events around property writes
#[derive(Default)]
pub struct ChangeNotificationHandler {
    listeners: RwLock<Vec<ChangeListener>>,
}

impl ChangeNotificationHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a listener; listeners run in subscription order
    pub fn subscribe(&self, listener: ChangeListener) {
        self.listeners.write().push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn emit(&self, event: &ChangeEvent) {
        trace!(member = %event.member, phase = ?event.phase, "emitting change event");
        for listener in self.listeners.read().iter() {
            listener(event);
        }
    }
}

#[async_trait]
impl Handler for ChangeNotificationHandler {
    async fn handle(&self, ctx: &mut InvocationContext, next: Continuation<'_>) -> Result<()> {
        if ctx.member().kind != MemberKind::PropertySet {
            return next.proceed(ctx).await;
        }

        let member = ctx.member().name.clone();
        let value = ctx.arguments().first().cloned().unwrap_or(Value::Null);

        self.emit(&ChangeEvent {
            member: member.clone(),
            phase: ChangePhase::Changing,
            value: value.clone(),
        });

        next.proceed(ctx).await?;

        self.emit(&ChangeEvent {
            member,
            phase: ChangePhase::Changed,
            value,
        });

        Ok(())
    }

    fn handler_type(&self) -> HandlerTypeId {
        HandlerTypeId::of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interception::capability::{Capability, MemberDescriptor};
    use crate::interception::handler::run_pipeline;
    use crate::interception::testing::InstrumentedTarget;
    use parking_lot::Mutex;
    use serde_json::json;

    fn recording_listener() -> (ChangeListener, Arc<Mutex<Vec<(ChangePhase, Value)>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let listener: ChangeListener =
            Arc::new(move |event| sink.lock().push((event.phase, event.value.clone())));
        (listener, log)
    }

    #[tokio::test]
    async fn test_property_write_raises_both_events() {
        let target = InstrumentedTarget::shared();
        let notify = ChangeNotificationHandler::new();
        let (listener, log) = recording_listener();
        notify.subscribe(listener);

        let mut ctx = InvocationContext::new(
            Arc::clone(&target) as Arc<dyn Capability>,
            MemberDescriptor::property_set("balance"),
            vec![json!(250)],
        );
        let handler: Arc<dyn Handler> = Arc::new(notify);

        run_pipeline(&handler, &mut ctx).await.unwrap();

        let events = log.lock().clone();
        assert_eq!(
            events,
            vec![
                (ChangePhase::Changing, json!(250)),
                (ChangePhase::Changed, json!(250)),
            ]
        );
        assert_eq!(target.stored_balance(), json!(250));
    }

    #[tokio::test]
    async fn test_failed_write_skips_changed_event() {
        let target = InstrumentedTarget::shared();
        let notify = ChangeNotificationHandler::new();
        let (listener, log) = recording_listener();
        notify.subscribe(listener);

        // "boom" declared as a setter so the handler engages, but the
        // target fails the write.
        let mut ctx = InvocationContext::new(
            Arc::clone(&target) as Arc<dyn Capability>,
            MemberDescriptor {
                name: "boom".to_string(),
                kind: MemberKind::PropertySet,
                arity: 1,
                overridable: true,
            },
            vec![json!(1)],
        );
        let handler: Arc<dyn Handler> = Arc::new(notify);

        assert!(run_pipeline(&handler, &mut ctx).await.is_err());

        let events = log.lock().clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, ChangePhase::Changing);
    }

    #[tokio::test]
    async fn test_non_property_member_emits_nothing() {
        let target = InstrumentedTarget::shared();
        let notify = ChangeNotificationHandler::new();
        let (listener, log) = recording_listener();
        notify.subscribe(listener);

        let mut ctx = InvocationContext::new(
            Arc::clone(&target) as Arc<dyn Capability>,
            MemberDescriptor::method("add", 2),
            vec![json!(1), json!(2)],
        );
        let handler: Arc<dyn Handler> = Arc::new(notify);

        run_pipeline(&handler, &mut ctx).await.unwrap();
        assert!(log.lock().is_empty());
    }
}
