//! Explanation-Learning Feedback (C10, §4.7): post-hoc evaluation of
//! hypotheses and reasoning traces against a goal's outcome, rolled up
//! into three slowly-adapting learning parameters (inference weighting,
//! confidence scaling, exploration heuristics).
//!
//! This runs once per goal termination (`completed` or `failed`), never
//! inline with the autonomy cycle that produced the goal — it is a
//! separate, idempotent trigger (INV-6).

mod action;
mod evaluation;
mod heuristics;
mod outcome;

pub use action::GoalOutcomeAction;
pub use evaluation::{evaluate_hypothesis, evaluate_trace, load_feedback, run_feedback};
pub use heuristics::{
    record_inference_adjustment, update_confidence_scaling, update_exploration_heuristics,
    update_inference_weighting, ConfidenceScaling, ExplorationHeuristics,
};
pub use outcome::{handle_goal_outcome, DomainFeedbackStats};
