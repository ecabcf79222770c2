//! Reasoning and knowledge data model (§3) plus the Reasoning Engine (C6,
//! §4.3): querying existing beliefs, inferring new ones from rules, and
//! generating curiosity goals.
//!
//! A reasoning episode is a flat, ordered list of [`types::Step`]s rather
//! than a decision tree: beliefs, hypotheses, and curiosity goals are
//! independent records keyed by ID and persisted in the shared store (§6),
//! not nodes in an in-memory graph.

mod belief_query;
mod goals;
mod inference_rules;
mod trace;
mod types;

pub use belief_query::{query_beliefs, HdnNoveltyAssessor, NoveltyAssessment, NoveltyAssessor};
pub use goals::{cleanup_old_goals, generate_curiosity_goals, generate_news_driven_goals, is_generic_goal};
pub use inference_rules::{default_rules, infer_new_beliefs, load_rules, InferenceRule, RuleKind};
pub use trace::{TraceAnalyzer, TraceStats};
pub use types::{
    cap_front, caps, Belief, BeliefSource, CausalType, ConceptDiscovery, CuriosityGoal,
    GoalCompletionFeedback, GoalStatus, GoalType, Hypothesis, HypothesisEvaluation,
    HypothesisStatus, ReasoningTrace, Step, TraceEvaluation, UncertaintyModel,
};
