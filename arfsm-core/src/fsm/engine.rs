//! FSM Engine (C5) and Event Queue (C1), §4.1.
//!
//! A single authoritative mutator of `(current_state, context)` — the
//! event-queue worker — processes events popped off a durable FIFO. A
//! timer worker and one subscription worker per bus subject only ever
//! enqueue; they never touch `context` directly (§5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::config::FsmConfig;
use crate::error::{Error, Result};
use crate::events::{EventEnvelope, TransitionRecord};
use crate::store::{EventBus, StoreClient};

use super::context::{FsmContext, StateSnapshot};
use super::dispatcher::ActionDispatcher;
use super::guards::{GuardInput, GuardRegistry};

const TRANSITION_SUBJECT: &str = "agi.events.fsm.transition";

struct EngineState {
    current_state: String,
    context: FsmContext,
    state_entered_at: chrono::DateTime<Utc>,
}

/// A queued event: the raw envelope plus the transition-table event name it
/// was filed under.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct QueuedEvent {
    name: String,
    event: EventEnvelope,
}

pub struct FsmEngine {
    config: FsmConfig,
    store: Arc<dyn StoreClient>,
    bus: Arc<dyn EventBus>,
    dispatcher: ActionDispatcher,
    guards: GuardRegistry,
    agent_id: String,
    state: Mutex<EngineState>,
    running: watch::Sender<bool>,
}

impl FsmEngine {
    pub fn new(
        config: FsmConfig,
        store: Arc<dyn StoreClient>,
        bus: Arc<dyn EventBus>,
        dispatcher: ActionDispatcher,
        guards: GuardRegistry,
        agent_id: impl Into<String>,
    ) -> Self {
        let initial_state = config.initial_state.clone();
        let (running, _) = watch::channel(false);
        Self {
            config,
            store,
            bus,
            dispatcher,
            guards,
            agent_id: agent_id.into(),
            state: Mutex::new(EngineState {
                current_state: initial_state,
                context: FsmContext::new(),
                state_entered_at: Utc::now(),
            }),
            running,
        }
    }

    fn queue_key(&self) -> String {
        self.config
            .store_key("queue", &self.agent_id)
            .unwrap_or_else(|| format!("fsm:{}:queue", self.agent_id))
    }

    fn state_key(&self) -> String {
        self.config
            .store_key("state", &self.agent_id)
            .unwrap_or_else(|| format!("fsm:{}:state", self.agent_id))
    }

    /// Restore state from the store at startup. Parse failure or a missing
    /// key starts at the configured initial state with a warning — never a
    /// crash (§4.1).
    pub async fn restore(&self) {
        match self.store.get(&self.state_key()).await {
            Ok(Some(text)) => match serde_json::from_str::<StateSnapshot>(&text) {
                Ok(snapshot) => {
                    let mut state = self.state.lock().await;
                    state.current_state = snapshot.state;
                    state.context = snapshot.context;
                    state.state_entered_at = snapshot.updated;
                    info!(state = %state.current_state, "restored FSM state from store");
                }
                Err(e) => warn!(error = %e, "failed to parse persisted FSM state, starting at initial state"),
            },
            Ok(None) => debug!("no persisted FSM state found, starting at initial state"),
            Err(e) => warn!(error = %e, "failed to read persisted FSM state, starting at initial state"),
        }
    }

    /// `Start()`: subscribes to every event's bus subject, launches the
    /// periodic timer loop, launches the main event loop. Idempotent only
    /// after `Stop()`.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        self.restore().await;
        self.running.send_replace(true);

        for event in self.config.events.clone() {
            let mut rx = self.bus.subscribe(&event.bus_subject).await?;
            let engine = Arc::clone(self);
            let mut running = self.running.subscribe();
            let event_name = event.name.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = running.changed() => {
                            if !*running.borrow() {
                                break;
                            }
                        }
                        msg = rx.recv() => {
                            let Some(msg) = msg else { break };
                            let payload: Value = serde_json::from_str(&msg.payload).unwrap_or(Value::Null);
                            engine.handle_event(&event_name, payload).await;
                        }
                    }
                }
            });

            if let Some(interval) = event.interval_seconds {
                let engine = Arc::clone(self);
                let mut running = self.running.subscribe();
                let event_name = event.name.clone();
                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
                    loop {
                        tokio::select! {
                            _ = running.changed() => {
                                if !*running.borrow() {
                                    break;
                                }
                            }
                            _ = ticker.tick() => {
                                engine.handle_event(&event_name, Value::Null).await;
                            }
                        }
                    }
                });
            }
        }

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.event_loop().await;
        });

        Ok(())
    }

    /// `Stop()`: cancels subscriptions (via the running flag) and persists
    /// state one last time.
    pub async fn stop(&self) {
        self.running.send_replace(false);
        let state = self.state.lock().await;
        let _ = self.persist(&state).await;
    }

    /// `handleEvent(name, payload)`: parse into the canonical envelope,
    /// enqueue `{name, event, ts}`.
    pub async fn handle_event(&self, name: &str, payload: Value) {
        let envelope = EventEnvelope::new(name, format!("fsm:{}", self.agent_id), payload);
        let queued = QueuedEvent { name: name.to_string(), event: envelope };
        if let Ok(text) = serde_json::to_string(&queued) {
            if let Err(e) = self.store.list_push(&self.queue_key(), &text).await {
                warn!(error = %e, "failed to enqueue event");
            }
        }
    }

    /// The event-loop worker: blocks up to 1s per pop, processes at most
    /// `max_events_per_cycle` per iteration, sleeps `post_processing_sleep_ms`
    /// between events and `idle_sleep_ms` when idle (§4.1).
    async fn event_loop(&self) {
        let perf = self.config.performance.clone();
        loop {
            if !*self.running.subscribe().borrow() {
                break;
            }
            let mut processed_this_cycle = 0usize;
            while processed_this_cycle < perf.max_events_per_cycle {
                match self.store.list_pop(&self.queue_key(), Duration::from_secs(1)).await {
                    Ok(Some(text)) => {
                        if let Ok(queued) = serde_json::from_str::<QueuedEvent>(&text) {
                            self.process_event(&queued.name, queued.event).await;
                        } else {
                            warn!("dropping malformed queued event");
                        }
                        processed_this_cycle += 1;
                        tokio::time::sleep(perf.post_processing_sleep()).await;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "event queue pop failed");
                        break;
                    }
                }
            }
            if processed_this_cycle == 0 {
                tokio::time::sleep(perf.idle_sleep()).await;
            }
        }
    }

    /// `processEvent(name, event)`: resolves the current state's `on[name]`;
    /// no-op if absent; evaluates the guard if one is specified; transitions
    /// if allowed.
    pub async fn process_event(&self, name: &str, event: EventEnvelope) {
        let (current_state, entered_at) = {
            let state = self.state.lock().await;
            (state.current_state.clone(), state.state_entered_at)
        };

        let Some(state_config) = self.config.state(&current_state) else {
            warn!(state = %current_state, "current state not found in config");
            return;
        };
        let Some(transition) = state_config.on.get(name) else {
            debug!(state = %current_state, event = name, "no transition for event in current state, ignoring");
            return;
        };

        if let Some(guard_name) = &transition.guard {
            let context = self.state.lock().await.context.clone();
            let duration_seconds = state_config.timeout_ms.map(|ms| ms / 1000).unwrap_or(0);
            let guard_input = GuardInput {
                context: &context,
                state_entered_at: entered_at,
                state_duration_seconds: duration_seconds,
            };
            match self.guards.evaluate(guard_name, &guard_input).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(guard = guard_name, "guard blocked transition");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, guard = guard_name, "guard evaluation failed, blocking transition");
                    return;
                }
            }
        }

        self.transition(&current_state, &transition.next_state, name, &event).await;
    }

    /// The transition protocol (§4.1): record entry time, run entry
    /// actions in order, persist, publish, throttle.
    async fn transition(&self, from: &str, to: &str, reason: &str, triggering_event: &EventEnvelope) {
        {
            let mut state = self.state.lock().await;
            state.current_state = to.to_string();
            state.state_entered_at = Utc::now();
        }

        if let Some(state_config) = self.config.state(to) {
            for action_config in state_config.entry_actions.clone() {
                let (context_snapshot, duration_ms) = {
                    let state = self.state.lock().await;
                    let ms = Utc::now().signed_duration_since(state.state_entered_at).num_milliseconds().max(0) as u64;
                    (state.context.clone(), ms)
                };
                debug!(module = %action_config.module, action_type = %action_config.action_type, "dispatching entry action");
                match self
                    .dispatcher
                    .dispatch(
                        &action_config.module,
                        triggering_event,
                        &action_config.params,
                        &context_snapshot,
                        duration_ms,
                        self.store.as_ref(),
                        &self.agent_id,
                    )
                    .await
                {
                    Ok(outcome) => {
                        let mut state = self.state.lock().await;
                        state.context.apply(outcome.context_delta);
                        drop(state);
                        for next in outcome.next_events {
                            let engine_queue_key = self.queue_key();
                            let store = Arc::clone(&self.store);
                            let agent_id = self.agent_id.clone();
                            tokio::spawn(async move {
                                if next.delay_ms > 0 {
                                    tokio::time::sleep(Duration::from_millis(next.delay_ms)).await;
                                }
                                let envelope = EventEnvelope::new(next.name.clone(), format!("fsm:{agent_id}"), next.payload);
                                let queued = QueuedEvent { name: next.name, event: envelope };
                                if let Ok(text) = serde_json::to_string(&queued) {
                                    let _ = store.list_push(&engine_queue_key, &text).await;
                                }
                            });
                        }
                    }
                    Err(e) => warn!(error = %e, module = %action_config.module, "entry action failed"),
                }
            }
        }

        let (snapshot_text, context_for_record) = {
            let state = self.state.lock().await;
            let snapshot = StateSnapshot { state: state.current_state.clone(), context: state.context.clone(), updated: Utc::now() };
            (serde_json::to_string(&snapshot).ok(), state.context.extra.clone())
        };
        if let Some(text) = snapshot_text {
            if let Err(e) = self.store.set(&self.state_key(), &text).await {
                warn!(error = %e, "failed to persist FSM state");
            }
        }

        let record = TransitionRecord {
            agent_id: self.agent_id.clone(),
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
            context: context_for_record,
        };
        if let Ok(text) = serde_json::to_string(&record) {
            let _ = self.bus.publish(TRANSITION_SUBJECT, &text).await;
        }

        tokio::time::sleep(self.config.performance.state_transition_delay()).await;
    }

    async fn persist(&self, state: &EngineState) -> Result<()> {
        let snapshot = StateSnapshot { state: state.current_state.clone(), context: state.context.clone(), updated: Utc::now() };
        let text = serde_json::to_string(&snapshot).map_err(Error::from)?;
        self.store.set(&self.state_key(), &text).await
    }

    pub async fn current_state(&self) -> String {
        self.state.lock().await.current_state.clone()
    }

    pub async fn context(&self) -> FsmContext {
        self.state.lock().await.context.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryBus, MemoryStore};

    fn config_json() -> &'static str {
        r#"{
            "initial_state": "idle",
            "states": [
                { "name": "idle", "on": { "wake": { "next_state": "thinking" } } },
                { "name": "thinking", "timeout_ms": 1000, "on": { "timeout": { "next_state": "idle", "guard": "timeout_checker" } } }
            ],
            "guards": ["timeout_checker", "input_validator", "work_checker"],
            "store_keys": { "state": "fsm:%s:state", "queue": "fsm:%s:queue" },
            "performance": { "state_transition_delay_ms": 0, "idle_sleep_ms": 10, "post_processing_sleep_ms": 0 }
        }"#
    }

    #[tokio::test]
    async fn process_event_transitions_and_persists_state() {
        let config = FsmConfig::from_json(config_json()).unwrap();
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(InMemoryBus::new());
        let engine = Arc::new(FsmEngine::new(config, store.clone(), bus, ActionDispatcher::new(), GuardRegistry::with_defaults(), "agent-1"));

        let event = EventEnvelope::new("wake", "bus", Value::Null);
        engine.process_event("wake", event).await;

        assert_eq!(engine.current_state().await, "thinking");
        let persisted = store.get("fsm:agent-1:state").await.unwrap().unwrap();
        let snapshot: StateSnapshot = serde_json::from_str(&persisted).unwrap();
        assert_eq!(snapshot.state, "thinking");
    }

    #[tokio::test]
    async fn unknown_event_for_current_state_is_a_noop() {
        let config = FsmConfig::from_json(config_json()).unwrap();
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(InMemoryBus::new());
        let engine = Arc::new(FsmEngine::new(config, store, bus, ActionDispatcher::new(), GuardRegistry::with_defaults(), "agent-1"));

        let event = EventEnvelope::new("unrelated_event", "bus", Value::Null);
        engine.process_event("unrelated_event", event).await;
        assert_eq!(engine.current_state().await, "idle");
    }

    #[tokio::test]
    async fn handle_event_enqueues_and_event_loop_drains_it() {
        let config = FsmConfig::from_json(config_json()).unwrap();
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(InMemoryBus::new());
        let engine = Arc::new(FsmEngine::new(config, store.clone(), bus, ActionDispatcher::new(), GuardRegistry::with_defaults(), "agent-1"));

        engine.handle_event("wake", Value::Null).await;
        assert_eq!(store.list_len("fsm:agent-1:queue").await.unwrap(), 1);

        let popped = store.list_pop("fsm:agent-1:queue", Duration::from_millis(10)).await.unwrap().unwrap();
        let queued: QueuedEvent = serde_json::from_str(&popped).unwrap();
        assert_eq!(queued.name, "wake");
    }
}
