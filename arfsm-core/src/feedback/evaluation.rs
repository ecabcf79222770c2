//! Per-hypothesis and per-trace evaluation (§4.7 steps 3-5) and the
//! `run_feedback` entry point that ties evaluation to persistence.

use crate::reasoning::{
    cap_front, caps, GoalCompletionFeedback, Hypothesis, HypothesisEvaluation, ReasoningTrace,
    TraceEvaluation,
};
use crate::store::StoreClient;

const RISK_KEYWORDS: &[&str] = &["risk", "fail", "error"];

fn mentions_risk_keyword(description: &str) -> bool {
    let lower = description.to_lowercase();
    RISK_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// `WasCorrect` plus the derived accuracy/quality/alignment/confidence-error
/// fields for a single hypothesis, evaluated against the terminal outcome
/// of the goal it belongs to (§4.7 step 3).
pub fn evaluate_hypothesis(hypothesis: &Hypothesis, goal_achieved: bool) -> HypothesisEvaluation {
    let was_correct = if goal_achieved {
        hypothesis.confidence > 0.5
    } else {
        hypothesis.confidence < 0.5 || mentions_risk_keyword(&hypothesis.description)
    };

    let accuracy = if was_correct { 1.0 } else { 0.0 };

    let mut quality = 0.5;
    if !hypothesis.facts.is_empty() {
        quality += 0.2;
    }
    if hypothesis.uncertainty.is_some() {
        quality += 0.2;
    }
    if !hypothesis.counterfactual_actions.is_empty() {
        quality += 0.1;
    }
    let quality = quality.min(1.0);

    let alignment = if was_correct { hypothesis.confidence } else { 1.0 - hypothesis.confidence };
    let confidence_error = if was_correct { (1.0 - hypothesis.confidence).abs() } else { hypothesis.confidence };

    let mut improvement_areas = Vec::new();
    if confidence_error > 0.3 {
        improvement_areas.push("confidence_calibration".to_string());
    }
    if quality < 0.6 {
        improvement_areas.push("explanation_depth".to_string());
    }
    if !was_correct && hypothesis.facts.is_empty() {
        improvement_areas.push("evidence_gathering".to_string());
    }

    HypothesisEvaluation {
        hypothesis_id: hypothesis.id.clone(),
        was_correct,
        accuracy,
        quality,
        alignment,
        confidence_error,
        improvement_areas,
    }
}

/// `evaluate_trace` (§4.7 step 4).
pub fn evaluate_trace(trace: &ReasoningTrace, goal_achieved: bool) -> TraceEvaluation {
    let step_count = trace.steps.len();
    let quality = 0.5 + (step_count as f64 / 10.0).min(0.3) + (trace.evidence.len() as f64 / 5.0).min(0.2);
    let coherence = if step_count > 1 { 0.7 } else { 0.5 };
    let decision_quality = if step_count == 0 {
        0.0
    } else {
        trace.steps.iter().map(|s| s.confidence).sum::<f64>() / step_count as f64
    };
    let calibration = if goal_achieved { trace.confidence } else { 1.0 - trace.confidence };
    let outcome_correlation = if goal_achieved { quality } else { 1.0 - quality };

    TraceEvaluation {
        trace_id: trace.id.clone(),
        quality: quality.min(1.0),
        coherence,
        decision_quality,
        calibration,
        outcome_correlation,
    }
}

fn mean(values: impl Iterator<Item = f64> + Clone, default: f64) -> f64 {
    let count = values.clone().count();
    if count == 0 {
        default
    } else {
        values.sum::<f64>() / count as f64
    }
}

fn feedback_key(goal_id: &str) -> String {
    format!("explanation_learning:feedback:{goal_id}")
}

/// Load a previously persisted feedback record, if any — the idempotence
/// check backing INV-6 (a goal's completed/failed transition triggers
/// exactly one feedback record, even across duplicate transitions).
pub async fn load_feedback(store: &dyn StoreClient, goal_id: &str) -> Option<GoalCompletionFeedback> {
    let raw = store.get(&feedback_key(goal_id)).await.ok().flatten()?;
    serde_json::from_str(&raw).ok()
}

/// The full per-goal evaluation pass (§4.7 steps 1-5): evaluate every
/// hypothesis and trace, roll them into overall accuracy/quality/alignment,
/// and persist the result. Idempotent: a second call for the same
/// `goal_id` returns the already-persisted record without recomputing or
/// re-writing it.
pub async fn run_feedback(
    store: &dyn StoreClient,
    domain: &str,
    goal_id: &str,
    goal_achieved: bool,
    hypotheses: &[Hypothesis],
    traces: &[ReasoningTrace],
) -> GoalCompletionFeedback {
    if let Some(existing) = load_feedback(store, goal_id).await {
        return existing;
    }

    let mut hypotheses = hypotheses.to_vec();
    cap_front(&mut hypotheses, 100);
    let mut traces = traces.to_vec();
    cap_front(&mut traces, caps::TRACES);

    let hypothesis_evaluations: Vec<HypothesisEvaluation> =
        hypotheses.iter().map(|h| evaluate_hypothesis(h, goal_achieved)).collect();
    let trace_evaluations: Vec<TraceEvaluation> =
        traces.iter().map(|t| evaluate_trace(t, goal_achieved)).collect();

    let accuracy = mean(hypothesis_evaluations.iter().map(|e| e.accuracy), 0.5);
    let alignment = mean(hypothesis_evaluations.iter().map(|e| e.alignment), 0.5);
    let quality = mean(
        hypothesis_evaluations.iter().map(|e| e.quality).chain(trace_evaluations.iter().map(|e| e.quality)),
        0.5,
    );

    let feedback = GoalCompletionFeedback {
        goal_id: goal_id.to_string(),
        domain: domain.to_string(),
        hypothesis_evaluations,
        trace_evaluations,
        accuracy,
        quality,
        alignment,
        created_at: chrono::Utc::now(),
    };

    if let Ok(serialized) = serde_json::to_string(&feedback) {
        let _ = store.set(&feedback_key(goal_id), &serialized).await;
    }

    feedback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::UncertaintyModel;
    use crate::store::MemoryStore;

    fn hypothesis(confidence: f64, description: &str) -> Hypothesis {
        let mut h = Hypothesis::new(description, "systems");
        h.confidence = confidence;
        h
    }

    #[test]
    fn achieved_goal_with_high_confidence_is_correct() {
        let h = hypothesis(0.8, "caching reduces latency under load");
        let eval = evaluate_hypothesis(&h, true);
        assert!(eval.was_correct);
        assert_eq!(eval.accuracy, 1.0);
        assert_eq!(eval.alignment, 0.8);
    }

    #[test]
    fn failed_goal_with_risk_keyword_is_correct_even_at_high_confidence() {
        let h = hypothesis(0.9, "this change risks breaking downstream consumers");
        let eval = evaluate_hypothesis(&h, false);
        assert!(eval.was_correct);
        assert_eq!(eval.alignment, 0.9);
    }

    #[test]
    fn quality_reflects_facts_uncertainty_and_counterfactuals() {
        let mut h = hypothesis(0.6, "gradient clipping limits exploding gradients");
        h.facts.push("observed divergence in 3 runs".into());
        h.uncertainty = Some(UncertaintyModel::new(0.6, 0.2, 0.1, 1.0));
        h.counterfactual_actions.push("what evidence would change confidence".into());
        let eval = evaluate_hypothesis(&h, true);
        assert!((eval.quality - 1.0).abs() < 1e-9);
    }

    #[test]
    fn incorrect_hypothesis_without_facts_flags_evidence_gathering() {
        let h = hypothesis(0.8, "this will definitely work");
        let eval = evaluate_hypothesis(&h, false);
        assert!(!eval.was_correct);
        assert!(eval.improvement_areas.contains(&"evidence_gathering".to_string()));
    }

    #[test]
    fn trace_coherence_requires_more_than_one_step() {
        let mut trace = ReasoningTrace::new("g1", "systems");
        trace.push("query", "q", "r", "reasoning", 0.6);
        let single = evaluate_trace(&trace, true);
        assert_eq!(single.coherence, 0.5);
        trace.push("infer", "q2", "r2", "reasoning2", 0.8);
        let multi = evaluate_trace(&trace, true);
        assert_eq!(multi.coherence, 0.7);
        assert!((multi.decision_quality - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn run_feedback_is_idempotent_per_goal() {
        let store = MemoryStore::new();
        let h = hypothesis(0.9, "caching reduces latency under load");
        let first = run_feedback(&store, "systems", "g42", true, std::slice::from_ref(&h), &[]).await;
        let mut h2 = h.clone();
        h2.confidence = 0.1; // would change the outcome if recomputed
        let second = run_feedback(&store, "systems", "g42", true, std::slice::from_ref(&h2), &[]).await;
        assert_eq!(first, second);
    }
}
