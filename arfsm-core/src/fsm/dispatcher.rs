//! Action Dispatcher (C3, §4.2): maps `(state, action-type)` — in practice
//! just the action's `module` routing key — to a handler, and records
//! metrics on every dispatch.
//!
//! Handlers implement [`Action`] against a capability interface
//! (§9 design note): given the triggering event and a read-only view of the
//! context, produce the next events to enqueue and a context delta for the
//! dispatcher to apply. An action never mutates the context directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::events::EventEnvelope;
use crate::store::StoreClient;

use super::context::{ContextDelta, FsmContext};

/// An event to enqueue after the current action returns, with a delay
/// matching §4.2's "short asynchronous delay" pacing.
#[derive(Debug, Clone)]
pub struct NextEvent {
    pub name: String,
    pub payload: Value,
    pub delay_ms: u64,
}

impl NextEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self { name: name.into(), payload, delay_ms: 0 }
    }

    pub fn after(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// What an action produces: events to enqueue and a context delta, applied
/// by the dispatcher on the event-queue worker.
#[derive(Debug, Clone, Default)]
pub struct ActionOutcome {
    pub next_events: Vec<NextEvent>,
    pub context_delta: ContextDelta,
}

impl ActionOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn emit(name: impl Into<String>, payload: Value) -> Self {
        Self { next_events: vec![NextEvent::new(name, payload)], context_delta: ContextDelta::empty() }
    }
}

#[async_trait]
pub trait Action: Send + Sync {
    async fn execute(
        &self,
        event: &EventEnvelope,
        params: &HashMap<String, Value>,
        context: &FsmContext,
    ) -> Result<ActionOutcome>;
}

/// Rolling dispatcher metrics persisted under the agent's activity keys
/// (§4.2): `events_processed`, `last_activity`, and
/// `average_state_time_seconds`.
pub struct DispatcherMetrics {
    events_processed: AtomicU64,
    total_state_time_ms: AtomicU64,
}

impl DispatcherMetrics {
    pub fn new() -> Self {
        Self { events_processed: AtomicU64::new(0), total_state_time_ms: AtomicU64::new(0) }
    }

    pub fn record(&self, state_duration_ms: u64) -> (u64, f64) {
        let count = self.events_processed.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.total_state_time_ms.fetch_add(state_duration_ms, Ordering::SeqCst) + state_duration_ms;
        (count, total as f64 / count as f64 / 1000.0)
    }
}

impl Default for DispatcherMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Module name -> handler registry, resolved at engine construction (§4.2).
/// Unknown modules are logged and skipped — never fatal.
pub struct ActionDispatcher {
    actions: HashMap<String, Arc<dyn Action>>,
    metrics: DispatcherMetrics,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self { actions: HashMap::new(), metrics: DispatcherMetrics::new() }
    }

    pub fn register(&mut self, module: impl Into<String>, action: Arc<dyn Action>) {
        self.actions.insert(module.into(), action);
    }

    pub async fn dispatch(
        &self,
        module: &str,
        event: &EventEnvelope,
        params: &HashMap<String, Value>,
        context: &FsmContext,
        state_duration_ms: u64,
        store: &dyn StoreClient,
        agent_id: &str,
    ) -> Result<ActionOutcome> {
        let outcome = match self.actions.get(module) {
            Some(action) => action.execute(event, params, context).await?,
            None => {
                warn!(module, "action module not found, treating as no-op");
                ActionOutcome::empty()
            }
        };

        let (processed, average_state_time_seconds) = self.metrics.record(state_duration_ms);
        let _ = store
            .set(&format!("fsm:{agent_id}:metrics:events_processed"), &processed.to_string())
            .await;
        let _ = store
            .set(&format!("fsm:{agent_id}:metrics:last_activity"), &Utc::now().to_rfc3339())
            .await;
        let _ = store
            .set(
                &format!("fsm:{agent_id}:metrics:average_state_time_seconds"),
                &average_state_time_seconds.to_string(),
            )
            .await;

        Ok(outcome)
    }
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    struct Echo;

    #[async_trait]
    impl Action for Echo {
        async fn execute(&self, _event: &EventEnvelope, _params: &HashMap<String, Value>, _context: &FsmContext) -> Result<ActionOutcome> {
            Ok(ActionOutcome::emit("ingest_ok", Value::Null))
        }
    }

    #[tokio::test]
    async fn dispatch_runs_registered_action_and_updates_metrics() {
        let mut dispatcher = ActionDispatcher::new();
        dispatcher.register("ingest", Arc::new(Echo));
        let store = MemoryStore::new();
        let event = EventEnvelope::new("input_received", "bus", Value::Null);
        let ctx = FsmContext::new();

        let outcome = dispatcher
            .dispatch("ingest", &event, &HashMap::new(), &ctx, 120, &store, "agent-1")
            .await
            .unwrap();
        assert_eq!(outcome.next_events.len(), 1);
        assert_eq!(outcome.next_events[0].name, "ingest_ok");

        let processed = store.get("fsm:agent-1:metrics:events_processed").await.unwrap();
        assert_eq!(processed, Some("1".to_string()));
    }

    #[tokio::test]
    async fn unknown_module_is_logged_and_treated_as_noop() {
        let dispatcher = ActionDispatcher::new();
        let store = MemoryStore::new();
        let event = EventEnvelope::new("input_received", "bus", Value::Null);
        let ctx = FsmContext::new();

        let outcome = dispatcher
            .dispatch("nonexistent", &event, &HashMap::new(), &ctx, 0, &store, "agent-1")
            .await
            .unwrap();
        assert!(outcome.next_events.is_empty());
    }
}
