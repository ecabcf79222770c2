//! `GoalOutcomeAction`: the dispatcher (C3) action module bound to
//! `goal_completed`/`goal_failed` transitions in the FSM config, wiring the
//! event-driven state machine to [`handle_goal_outcome`] (§4.7).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::events::EventEnvelope;
use crate::fsm::{Action, ActionOutcome, ContextDelta, FsmContext, NextEvent};
use crate::reasoning::{CuriosityGoal, GoalStatus, Hypothesis, ReasoningTrace};
use crate::store::StoreClient;

use super::outcome::handle_goal_outcome;

async fn load_list<T: for<'de> serde::Deserialize<'de>>(store: &dyn StoreClient, key: &str) -> Vec<T> {
    store.get(key).await.ok().flatten().and_then(|raw| serde_json::from_str(&raw).ok()).unwrap_or_default()
}

/// Filters a domain-wide list down to the entries a goal actually named in
/// `targets`; falls back to the full list when nothing matches, since a
/// goal with no explicit targets (e.g. an anchor or exploration goal) still
/// deserves feedback over whatever the domain produced meanwhile.
fn filter_by_targets<T>(items: Vec<T>, targets: &[String], id_of: impl Fn(&T) -> &str) -> Vec<T> {
    if targets.is_empty() {
        return items;
    }
    let matched: Vec<T> = items.into_iter().filter(|item| targets.iter().any(|t| t == id_of(item))).collect();
    matched
}

/// Bound to the `goal_completed`/`goal_failed` FSM events (§4.7 preamble).
/// `event.payload` carries `{goal_id, domain}`; whether the goal succeeded
/// is read off its persisted status rather than trusted from the event.
pub struct GoalOutcomeAction {
    store: Arc<dyn StoreClient>,
}

impl GoalOutcomeAction {
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Action for GoalOutcomeAction {
    async fn execute(&self, event: &EventEnvelope, _params: &HashMap<String, Value>, _context: &FsmContext) -> Result<ActionOutcome> {
        let Some(goal_id) = event.payload.get("goal_id").and_then(|v| v.as_str()) else {
            warn!("goal outcome event missing goal_id, skipping");
            return Ok(ActionOutcome::empty());
        };
        let Some(domain) = event.payload.get("domain").and_then(|v| v.as_str()) else {
            warn!(goal_id, "goal outcome event missing domain, skipping");
            return Ok(ActionOutcome::empty());
        };

        let goals: Vec<CuriosityGoal> = load_list(self.store.as_ref(), &format!("reasoning:curiosity_goals:{domain}")).await;
        let Some(goal) = goals.iter().find(|g| g.id == goal_id) else {
            warn!(goal_id, domain, "goal outcome fired for an unknown goal, skipping");
            return Ok(ActionOutcome::empty());
        };
        let goal_achieved = goal.status == GoalStatus::Completed || event.event_type == "goal_completed";

        let hypotheses: Vec<Hypothesis> = load_list(self.store.as_ref(), &format!("reasoning:hypotheses:{domain}")).await;
        let traces: Vec<ReasoningTrace> = load_list(self.store.as_ref(), &format!("reasoning:traces:{domain}")).await;
        let hypotheses = filter_by_targets(hypotheses, &goal.targets, |h| h.id.as_str());
        let traces = filter_by_targets(traces, &goal.targets, |t| t.id.as_str());

        let feedback = handle_goal_outcome(self.store.as_ref(), domain, goal_id, goal_achieved, &hypotheses, &traces).await;

        let outcome_payload = serde_json::json!({
            "goal_id": goal_id,
            "domain": domain,
            "accuracy": feedback.accuracy,
            "quality": feedback.quality,
            "alignment": feedback.alignment,
        });
        Ok(ActionOutcome {
            next_events: vec![NextEvent::new("goal_feedback_processed", outcome_payload)],
            context_delta: ContextDelta::empty(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::GoalType;
    use crate::store::MemoryStore;

    fn completed_event(goal_id: &str, domain: &str) -> EventEnvelope {
        EventEnvelope::new("goal_completed", "fsm:test", serde_json::json!({ "goal_id": goal_id, "domain": domain }))
    }

    #[tokio::test]
    async fn processes_feedback_for_a_known_completed_goal() {
        let store = Arc::new(MemoryStore::new());
        let mut goal = CuriosityGoal::new(GoalType::HypothesisTesting, "does caching help", "systems", 5);
        goal.status = GoalStatus::Completed;
        let goal_id = goal.id.clone();
        let serialized = serde_json::to_string(&vec![goal]).unwrap();
        store.set("reasoning:curiosity_goals:systems", &serialized).await.unwrap();

        let action = GoalOutcomeAction::new(store.clone());
        let event = completed_event(&goal_id, "systems");
        let outcome = action.execute(&event, &HashMap::new(), &FsmContext::new()).await.unwrap();
        assert_eq!(outcome.next_events.len(), 1);
        assert_eq!(outcome.next_events[0].name, "goal_feedback_processed");
    }

    #[tokio::test]
    async fn unknown_goal_is_skipped_without_error() {
        let store = Arc::new(MemoryStore::new());
        let action = GoalOutcomeAction::new(store);
        let event = completed_event("nonexistent", "systems");
        let outcome = action.execute(&event, &HashMap::new(), &FsmContext::new()).await.unwrap();
        assert!(outcome.next_events.is_empty());
    }
}
