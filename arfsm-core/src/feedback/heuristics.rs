//! The three learning parameters the explanation-learning loop adjusts
//! after every goal outcome (§4.7 step 6): inference weighting, confidence
//! scaling, and exploration heuristics. Each is a small rolling scalar (or
//! pair of scalars) persisted per domain; callers load the previous value,
//! pass it through the corresponding `update_*` function, and persist the
//! result.

use serde::{Deserialize, Serialize};

use crate::reasoning::GoalCompletionFeedback;
use crate::store::StoreClient;

const INFERENCE_ADJUSTMENTS_CAP: usize = 50;

/// `explanation_learning:confidence_scaling:<domain>` (§6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScaling {
    pub calibration_factor: f64,
}

impl Default for ConfidenceScaling {
    fn default() -> Self {
        Self { calibration_factor: 1.0 }
    }
}

/// `explanation_learning:exploration_heuristics:<domain>` (§6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplorationHeuristics {
    pub exploration_rate: f64,
    pub exploitation_rate: f64,
    pub curiosity_bonus: f64,
}

impl Default for ExplorationHeuristics {
    fn default() -> Self {
        Self { exploration_rate: 0.1, exploitation_rate: 0.9, curiosity_bonus: 0.1 }
    }
}

/// Average confidence error across a feedback record's hypothesis
/// evaluations (used by both confidence scaling and the inference-weight
/// accuracy check needs its own separate accuracy average, kept on
/// `GoalCompletionFeedback.accuracy` directly).
fn average_confidence_error(feedback: &GoalCompletionFeedback) -> f64 {
    if feedback.hypothesis_evaluations.is_empty() {
        return 0.0;
    }
    let sum: f64 = feedback.hypothesis_evaluations.iter().map(|e| e.confidence_error).sum();
    sum / feedback.hypothesis_evaluations.len() as f64
}

/// `Inference weighting` (§4.7 step 6, first bullet): a ±0.1 adjustment
/// recorded (not applied to any live weight here — the core's knowledge
/// growth pipeline decides how to fold the adjustment in) whenever overall
/// accuracy crosses either extreme. Returns `None` when accuracy is in the
/// neutral band and nothing is recorded.
pub fn update_inference_weighting(overall_accuracy: f64) -> Option<f64> {
    if overall_accuracy > 0.7 {
        Some(0.1)
    } else if overall_accuracy < 0.3 {
        Some(-0.1)
    } else {
        None
    }
}

/// Persist an inference-weight adjustment into the capped rolling list at
/// `explanation_learning:inference_adjustments:<domain>` (§8 scenario 5:
/// "the last slot" is always the most recently appended value).
pub async fn record_inference_adjustment(store: &dyn StoreClient, domain: &str, adjustment: f64) {
    let key = format!("explanation_learning:inference_adjustments:{domain}");
    let mut history: Vec<f64> = store
        .get(&key)
        .await
        .ok()
        .flatten()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();
    history.push(adjustment);
    if history.len() > INFERENCE_ADJUSTMENTS_CAP {
        let overflow = history.len() - INFERENCE_ADJUSTMENTS_CAP;
        history.drain(0..overflow);
    }
    if let Ok(serialized) = serde_json::to_string(&history) {
        let _ = store.set(&key, &serialized).await;
    }
}

/// `Confidence scaling` (§4.7 step 6, second bullet): the calibration
/// factor used by [`crate::reasoning::UncertaintyModel`] (INV-5) shrinks
/// when the domain's predictions are poorly calibrated and grows back
/// when they are well calibrated, clamped to `[0.5, 1.5]`.
pub fn update_confidence_scaling(current: ConfidenceScaling, feedback: &GoalCompletionFeedback) -> ConfidenceScaling {
    let error = average_confidence_error(feedback);
    let factor = if error > 0.3 {
        (current.calibration_factor - 0.05).max(0.5)
    } else if error < 0.1 {
        (current.calibration_factor + 0.05).min(1.5)
    } else {
        current.calibration_factor
    };
    ConfidenceScaling { calibration_factor: factor }
}

/// `Exploration heuristics` (§4.7 step 6, third bullet): low-quality
/// outcomes push the agent to explore more, high-quality outcomes let it
/// exploit more; the curiosity bonus nudges independently off alignment.
pub fn update_exploration_heuristics(current: ExplorationHeuristics, feedback: &GoalCompletionFeedback) -> ExplorationHeuristics {
    let exploration_rate = if feedback.quality < 0.5 {
        (current.exploration_rate + 0.02).min(0.3)
    } else if feedback.quality > 0.8 {
        (current.exploration_rate - 0.01).max(0.05)
    } else {
        current.exploration_rate
    };

    let curiosity_bonus = if feedback.alignment > 0.7 {
        (current.curiosity_bonus + 0.01).clamp(0.05, 0.2)
    } else if feedback.alignment < 0.4 {
        (current.curiosity_bonus - 0.01).clamp(0.05, 0.2)
    } else {
        current.curiosity_bonus.clamp(0.05, 0.2)
    };

    ExplorationHeuristics {
        exploration_rate,
        exploitation_rate: 1.0 - exploration_rate,
        curiosity_bonus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn feedback(accuracy: f64, quality: f64, alignment: f64, confidence_error: f64) -> GoalCompletionFeedback {
        use crate::reasoning::HypothesisEvaluation;
        GoalCompletionFeedback {
            goal_id: "g42".into(),
            domain: "systems".into(),
            hypothesis_evaluations: vec![HypothesisEvaluation {
                hypothesis_id: "h1".into(),
                was_correct: accuracy > 0.5,
                accuracy,
                quality,
                alignment,
                confidence_error,
                improvement_areas: Vec::new(),
            }],
            trace_evaluations: Vec::new(),
            accuracy,
            quality,
            alignment,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn inference_weighting_fires_only_at_extremes() {
        assert_eq!(update_inference_weighting(0.2), Some(-0.1));
        assert_eq!(update_inference_weighting(0.8), Some(0.1));
        assert_eq!(update_inference_weighting(0.5), None);
    }

    #[test]
    fn confidence_scaling_decreases_on_poor_calibration() {
        let fb = feedback(0.2, 0.5, 0.5, 0.4);
        let updated = update_confidence_scaling(ConfidenceScaling::default(), &fb);
        assert!((updated.calibration_factor - 0.95).abs() < 1e-9);
    }

    #[test]
    fn confidence_scaling_floors_at_half() {
        let fb = feedback(0.1, 0.5, 0.5, 0.9);
        let mut scaling = ConfidenceScaling { calibration_factor: 0.52 };
        scaling = update_confidence_scaling(scaling, &fb);
        assert!((scaling.calibration_factor - 0.5).abs() < 1e-9);
    }

    #[test]
    fn exploration_rate_unchanged_when_quality_is_mid_range_scenario_5() {
        // §8 scenario 5: accuracy 0.2, confidence error 0.4 -> quality here
        // held at a mid value (not itself < 0.5) leaves exploration_rate alone.
        let fb = feedback(0.2, 0.6, 0.5, 0.4);
        let updated = update_exploration_heuristics(ExplorationHeuristics::default(), &fb);
        assert_eq!(updated.exploration_rate, ExplorationHeuristics::default().exploration_rate);
    }

    #[test]
    fn exploration_rate_rises_on_low_quality() {
        let fb = feedback(0.2, 0.3, 0.5, 0.4);
        let updated = update_exploration_heuristics(ExplorationHeuristics::default(), &fb);
        assert!((updated.exploration_rate - 0.12).abs() < 1e-9);
        assert!((updated.exploitation_rate - 0.88).abs() < 1e-9);
    }

    #[test]
    fn curiosity_bonus_clamped_to_range() {
        let fb = feedback(0.9, 0.9, 0.9, 0.05);
        let mut heuristics = ExplorationHeuristics { exploration_rate: 0.1, exploitation_rate: 0.9, curiosity_bonus: 0.2 };
        heuristics = update_exploration_heuristics(heuristics, &fb);
        assert_eq!(heuristics.curiosity_bonus, 0.2);
    }

    #[tokio::test]
    async fn inference_adjustment_history_caps_and_keeps_last_slot() {
        let store = MemoryStore::new();
        for i in 0..60 {
            let adj = if i % 2 == 0 { 0.1 } else { -0.1 };
            record_inference_adjustment(&store, "systems", adj).await;
        }
        let raw = store.get("explanation_learning:inference_adjustments:systems").await.unwrap().unwrap();
        let history: Vec<f64> = serde_json::from_str(&raw).unwrap();
        assert_eq!(history.len(), INFERENCE_ADJUSTMENTS_CAP);
        assert_eq!(*history.last().unwrap(), -0.1);
    }
}
