//! `HandleGoalOutcome`: the single entry point the FSM dispatcher calls
//! when a goal transitions to `completed` or `failed` (§4.7 preamble).
//! Wires the per-goal evaluation pass to the domain's rolling stats and
//! the three learning parameters it feeds.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::reasoning::{GoalCompletionFeedback, Hypothesis, ReasoningTrace};
use crate::store::StoreClient;

use super::evaluation::{load_feedback, run_feedback};
use super::heuristics::{
    record_inference_adjustment, update_confidence_scaling, update_exploration_heuristics,
    update_inference_weighting, ConfidenceScaling, ExplorationHeuristics,
};

/// `explanation_learning:stats:<domain>` (§6): rolling means of the three
/// overall feedback scores, updated with a simple incremental average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainFeedbackStats {
    pub count: u64,
    pub avg_accuracy: f64,
    pub avg_quality: f64,
    pub avg_alignment: f64,
}

impl Default for DomainFeedbackStats {
    fn default() -> Self {
        Self { count: 0, avg_accuracy: 0.5, avg_quality: 0.5, avg_alignment: 0.5 }
    }
}

impl DomainFeedbackStats {
    fn fold_in(mut self, feedback: &GoalCompletionFeedback) -> Self {
        let n = self.count as f64;
        self.avg_accuracy = (self.avg_accuracy * n + feedback.accuracy) / (n + 1.0);
        self.avg_quality = (self.avg_quality * n + feedback.quality) / (n + 1.0);
        self.avg_alignment = (self.avg_alignment * n + feedback.alignment) / (n + 1.0);
        self.count += 1;
        self
    }
}

async fn load_json<T: for<'de> Deserialize<'de> + Default>(store: &dyn StoreClient, key: &str) -> T {
    store.get(key).await.ok().flatten().and_then(|raw| serde_json::from_str(&raw).ok()).unwrap_or_default()
}

async fn store_json<T: Serialize>(store: &dyn StoreClient, key: &str, value: &T) {
    if let Ok(serialized) = serde_json::to_string(value) {
        let _ = store.set(key, &serialized).await;
    }
}

/// Full §4.7 pipeline for one goal outcome: evaluate hypotheses and traces,
/// persist the feedback record (idempotent per `goal_id`), fold the
/// outcome into the domain's rolling stats, and update the three learning
/// parameters. Returns the feedback record for the caller to log or
/// forward as an event.
pub async fn handle_goal_outcome(
    store: &dyn StoreClient,
    domain: &str,
    goal_id: &str,
    goal_achieved: bool,
    hypotheses: &[Hypothesis],
    traces: &[ReasoningTrace],
) -> GoalCompletionFeedback {
    // INV-6: a duplicate completed/failed transition for a goal already
    // evaluated must not re-fold its outcome into the domain's rolling
    // stats or nudge the learning parameters a second time.
    let already_processed = load_feedback(store, goal_id).await.is_some();
    let feedback = run_feedback(store, domain, goal_id, goal_achieved, hypotheses, traces).await;
    if already_processed {
        return feedback;
    }

    let stats_key = format!("explanation_learning:stats:{domain}");
    let stats: DomainFeedbackStats = load_json(store, &stats_key).await;
    let stats = stats.fold_in(&feedback);
    store_json(store, &stats_key, &stats).await;

    if let Some(adjustment) = update_inference_weighting(feedback.accuracy) {
        record_inference_adjustment(store, domain, adjustment).await;
    }

    let scaling_key = format!("explanation_learning:confidence_scaling:{domain}");
    let scaling: ConfidenceScaling = load_json(store, &scaling_key).await;
    let scaling = update_confidence_scaling(scaling, &feedback);
    store_json(store, &scaling_key, &scaling).await;

    let heuristics_key = format!("explanation_learning:exploration_heuristics:{domain}");
    let heuristics: ExplorationHeuristics = load_json(store, &heuristics_key).await;
    let heuristics = update_exploration_heuristics(heuristics, &feedback);
    store_json(store, &heuristics_key, &heuristics).await;

    info!(
        domain,
        goal_id,
        accuracy = feedback.accuracy,
        quality = feedback.quality,
        alignment = feedback.alignment,
        "goal outcome processed by explanation-learning feedback"
    );

    feedback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn hypothesis(confidence: f64) -> Hypothesis {
        let mut h = Hypothesis::new("caching reduces latency under sustained load", "systems");
        h.confidence = confidence;
        h
    }

    #[tokio::test]
    async fn low_accuracy_outcome_lowers_calibration_and_records_inference_adjustment() {
        // §8 scenario 5's shape: a goal with low overall accuracy and poor
        // confidence calibration should shrink calibration_factor by 0.05
        // and record a -0.1 inference adjustment.
        let store = MemoryStore::new();
        let hypotheses: Vec<Hypothesis> = (0..5).map(|_| hypothesis(0.9)).collect();
        let feedback = handle_goal_outcome(&store, "systems", "g42", false, &hypotheses, &[]).await;
        assert_eq!(feedback.accuracy, 0.0);

        let scaling: ConfidenceScaling = load_json(&store, "explanation_learning:confidence_scaling:systems").await;
        assert!((scaling.calibration_factor - 0.95).abs() < 1e-9);

        let raw = store.get("explanation_learning:inference_adjustments:systems").await.unwrap().unwrap();
        let history: Vec<f64> = serde_json::from_str(&raw).unwrap();
        assert_eq!(*history.last().unwrap(), -0.1);
    }

    #[tokio::test]
    async fn repeated_outcome_for_same_goal_does_not_double_count_stats() {
        let store = MemoryStore::new();
        let h = hypothesis(0.9);
        handle_goal_outcome(&store, "systems", "g1", true, std::slice::from_ref(&h), &[]).await;
        handle_goal_outcome(&store, "systems", "g1", true, std::slice::from_ref(&h), &[]).await;
        let stats: DomainFeedbackStats = load_json(&store, "explanation_learning:stats:systems").await;
        assert_eq!(stats.count, 1);
    }
}
