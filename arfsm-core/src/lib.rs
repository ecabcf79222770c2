//! # arfsm-core
//!
//! An autonomous reasoning agent built as a configuration-driven finite
//! state machine: a durable event queue and guard-gated transition engine
//! (§4.1) wrapped around a self-directed reasoning and knowledge-growth
//! pipeline (§3) that generates its own curiosity goals, tests them, and
//! learns from the outcomes.
//!
//! ## Core components
//!
//! - **[`fsm`]**: the event queue, action dispatcher, guard evaluator, and
//!   engine (C1, C3, C4, C5) that drive one agent through its configured
//!   states.
//! - **[`autonomy`]**: the timer-triggered cycle (C9) that selects and
//!   dispatches curiosity goals.
//! - **[`reasoning`]**: the belief/hypothesis/goal data model (§3) and the
//!   reasoning engine (C6) that queries, infers, and proposes goals over it.
//! - **[`knowledge`]**: concept growth (C7) and domain/fact/hypothesis
//!   integration (C8).
//! - **[`feedback`]**: explanation-learning feedback (C10) — post-hoc
//!   evaluation of a completed or failed goal, rolled into calibration and
//!   exploration parameters.
//! - **[`active_learning`]**: the active learning loop (C11) that turns
//!   high-uncertainty concepts into ranked data-acquisition plans.
//! - **[`hdn`]**: HTTP clients for the external knowledge/execution service
//!   and the principles gate (§6).
//! - **[`store`]**: the shared store abstraction backing every module
//!   above, with a Redis-backed production client and an in-memory test
//!   double.
//! - **[`config`]** and **[`error`]**: the FSM/runtime configuration layers
//!   (C2) and the crate-wide error taxonomy (§7).

pub mod active_learning;
pub mod autonomy;
pub mod config;
pub mod error;
pub mod events;
pub mod feedback;
pub mod fsm;
pub mod hdn;
pub mod knowledge;
pub mod rate_limit;
pub mod reasoning;
pub mod store;

pub use active_learning::{
    convert_plans_to_curiosity_goals, generate_data_acquisition_plans, identify_high_uncertainty_concepts,
    prioritize_experiments, DataAcquisitionPlan, PlanStep, UncertainConcept,
};
pub use autonomy::{run_cycle, score_goal, seed_is_eligible, AutonomyCycleConfig, AutonomyCycleDeps, GoalScoringContext};
pub use config::{ActionConfig, EventConfig, FsmConfig, PerformanceConfig, RuntimeConfig, StateConfig, TransitionConfig};
pub use error::{Error, Result};
pub use events::{ActivityCategory, ActivityLogEntry, EventEnvelope, SecurityMetadata, ThoughtMetadata, ThoughtRecord, ThoughtType, TransitionRecord};
pub use feedback::{
    evaluate_hypothesis, evaluate_trace, handle_goal_outcome, load_feedback, record_inference_adjustment,
    run_feedback, update_confidence_scaling, update_exploration_heuristics, update_inference_weighting,
    ConfidenceScaling, DomainFeedbackStats, ExplorationHeuristics, GoalOutcomeAction,
};
pub use fsm::{
    Action, ActionDispatcher, ActionOutcome, ContextDelta, FsmContext, FsmEngine, Guard, GuardInput,
    GuardRegistry, InputValidator, NextEvent, StateSnapshot, TimeoutChecker, WorkChecker,
};
pub use hdn::{
    BootstrapRequest, ExecuteResponse, GraphClient, GraphRow, HdnClient, HdnTimeouts, InterpretResponse,
    McpFallbackGraphClient, PrinciplesClient, PrinciplesDecision, PrinciplesMetrics, QueryResponse, SearchResponse,
};
pub use knowledge::{
    admit_concept, classify_domain, counterfactual_actions, discover_new_concepts, extract_facts,
    find_knowledge_gaps, generate_hypotheses, grow_knowledge_base, intervention_goals, is_generic_concept_name,
    validate_knowledge_consistency, AdmissionDecision, CausalClassifier, ConceptCandidate, FactCandidate,
    KeywordCausalClassifier,
};
pub use rate_limit::RateLimiter;
pub use reasoning::{
    cap_front, caps, cleanup_old_goals, default_rules, generate_curiosity_goals, generate_news_driven_goals,
    infer_new_beliefs, is_generic_goal, load_rules, query_beliefs, Belief, BeliefSource, CausalType,
    ConceptDiscovery, CuriosityGoal, GoalCompletionFeedback, GoalStatus, GoalType, HdnNoveltyAssessor,
    Hypothesis, HypothesisEvaluation, HypothesisStatus, InferenceRule, NoveltyAssessment, NoveltyAssessor,
    ReasoningTrace, RuleKind, Step, TraceAnalyzer, TraceEvaluation, TraceStats, UncertaintyModel,
};
pub use store::{BusMessage, EventBus, InMemoryBus, MemoryStore, RedisBus, RedisStore, StoreClient};
