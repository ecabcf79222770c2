//! Core reasoning/knowledge data model (§3).
//!
//! Beliefs, hypotheses, curiosity goals, and traces are independent value
//! records linked only by string IDs, matched against the store's flat
//! key/hash layout (§6) rather than an in-memory graph structure. The FSM's
//! in-memory context is the only mutable cross-component scratchpad; these
//! types are what gets mirrored into it and serialized to the store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Per-domain and per-entity caps enforced wherever a list is written back
/// to the store (INV-3).
pub mod caps {
    pub const BELIEFS: usize = 200;
    pub const HYPOTHESES: usize = 200;
    pub const CURIOSITY_GOALS: usize = 200;
    pub const TRACES: usize = 20;
    pub const EPISODES: usize = 100;
    pub const ACTIVITY_LOG: usize = 200;
    pub const GOAL_OUTCOMES_BY_TYPE: usize = 200;
    pub const GOAL_OUTCOMES_ALL: usize = 1000;
    pub const EXPLANATIONS: usize = 50;
}

/// Truncate `items` to at most `cap` entries, keeping the most recent
/// (front of the vec, matching a left-push + trim store write — §5).
pub fn cap_front<T>(items: &mut Vec<T>, cap: usize) {
    if items.len() > cap {
        items.truncate(cap);
    }
}

/// Where a [`Belief`] came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BeliefSource {
    KnowledgeQuery,
    InferenceRule,
    #[serde(rename = "autonomy.scan")]
    AutonomyScan,
    HypothesisConfirmed,
}

/// An asserted or inferred statement (§3).
///
/// Invariant: `confidence` is calibrated — when `uncertainty` is present,
/// `confidence == uncertainty.calibrated_confidence`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Belief {
    pub id: String,
    pub statement: String,
    pub confidence: f64,
    pub source: BeliefSource,
    pub domain: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<UncertaintyModel>,
}

impl Belief {
    pub fn new(
        statement: impl Into<String>,
        domain: impl Into<String>,
        confidence: f64,
        source: BeliefSource,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            statement: statement.into(),
            confidence: confidence.clamp(0.0, 1.0),
            source,
            domain: domain.into(),
            evidence: Vec::new(),
            properties: HashMap::new(),
            created_at: now,
            last_updated: now,
            uncertainty: None,
        }
    }

    /// Attach an uncertainty model, syncing `confidence` to its calibrated
    /// value per the invariant in §3.
    pub fn with_uncertainty(mut self, model: UncertaintyModel) -> Self {
        self.confidence = model.calibrated_confidence;
        self.uncertainty = Some(model);
        self
    }

    /// INV-5-adjacent check: confidence matches the attached uncertainty
    /// model's calibrated value, if any is attached.
    pub fn confidence_is_calibrated(&self) -> bool {
        match &self.uncertainty {
            Some(u) => (self.confidence - u.calibrated_confidence).abs() < 1e-9,
            None => true,
        }
    }
}

/// Lifecycle status of a [`Hypothesis`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisStatus {
    Proposed,
    Testing,
    Confirmed,
    Refuted,
    Inconclusive,
    Failed,
}

/// Causal strength classification (§4.5.1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CausalType {
    ObservationalRelation,
    InferredCausalCandidate,
    ExperimentallyTestableRelation,
}

/// A proposed causal or associative claim (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hypothesis {
    pub id: String,
    pub description: String,
    pub domain: String,
    pub status: HypothesisStatus,
    #[serde(default)]
    pub facts: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causal_type: Option<CausalType>,
    #[serde(default)]
    pub counterfactual_actions: Vec<String>,
    #[serde(default)]
    pub intervention_goals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<UncertaintyModel>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Hypothesis {
    pub fn new(description: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            domain: domain.into(),
            status: HypothesisStatus::Proposed,
            facts: Vec::new(),
            constraints: Vec::new(),
            causal_type: None,
            counterfactual_actions: Vec::new(),
            intervention_goals: Vec::new(),
            uncertainty: None,
            confidence: 0.5,
            parent_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_uncertainty(mut self, model: UncertaintyModel) -> Self {
        self.confidence = model.calibrated_confidence;
        self.uncertainty = Some(model);
        self
    }

    pub fn child(&self, description: impl Into<String>) -> Self {
        let mut child = Self::new(description, self.domain.clone());
        child.parent_id = Some(self.id.clone());
        child.facts = self.facts.clone();
        child
    }
}

/// Formal decomposition of a claim's uncertainty (§3).
///
/// Invariant: `calibrated_confidence == base * (1 - epistemic) *
/// (1 - aleatoric) * domain_calibration_factor` (INV-5, up to a small
/// epsilon for floating-point rounding).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UncertaintyModel {
    pub base_confidence: f64,
    pub epistemic_uncertainty: f64,
    pub aleatoric_uncertainty: f64,
    pub domain_calibration_factor: f64,
    pub calibrated_confidence: f64,
}

impl UncertaintyModel {
    /// Construct a model, deriving `calibrated_confidence` from the other
    /// four fields per the §3 invariant.
    pub fn new(base: f64, epistemic: f64, aleatoric: f64, calibration_factor: f64) -> Self {
        let base = base.clamp(0.0, 1.0);
        let epistemic = epistemic.clamp(0.0, 1.0);
        let aleatoric = aleatoric.clamp(0.0, 1.0);
        let calibration_factor = calibration_factor.clamp(0.0, 2.0);
        let calibrated = (base * (1.0 - epistemic) * (1.0 - aleatoric) * calibration_factor)
            .clamp(0.0, 1.0);
        Self {
            base_confidence: base,
            epistemic_uncertainty: epistemic,
            aleatoric_uncertainty: aleatoric,
            domain_calibration_factor: calibration_factor,
            calibrated_confidence: calibrated,
        }
    }

    /// `UncertaintyReductionPotential` from §4.8: epistemic weighted by how
    /// much of the remaining uncertainty is reducible vs. irreducible.
    pub fn reduction_potential(&self) -> f64 {
        self.epistemic_uncertainty * (1.0 - self.aleatoric_uncertainty)
    }

    /// INV-5 check against a (possibly updated) domain calibration factor.
    pub fn respects_invariant(&self, calibration_factor: f64, epsilon: f64) -> bool {
        let bound = self.base_confidence
            * (1.0 - self.epistemic_uncertainty)
            * (1.0 - self.aleatoric_uncertainty)
            * calibration_factor;
        self.calibrated_confidence <= bound + epsilon
    }
}

/// Exploration task type (§3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    GapFilling,
    ConceptExploration,
    ContradictionResolution,
    NewsAnalysis,
    HypothesisTesting,
    AnchorCuriosity,
    ActiveLearning,
    Exploration,
    KnowledgeBuilding,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Pending,
    Active,
    Completed,
    Failed,
}

/// A pending exploration task self-generated by the autonomy loop (§3).
///
/// Invariant: at most one goal per domain has `status == Active`
/// (single-active invariant, INV-2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CuriosityGoal {
    pub id: String,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    pub description: String,
    pub domain: String,
    pub priority: u8,
    pub status: GoalStatus,
    #[serde(default)]
    pub targets: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<UncertaintyModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl CuriosityGoal {
    pub fn new(goal_type: GoalType, description: impl Into<String>, domain: impl Into<String>, priority: u8) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            goal_type,
            description: description.into(),
            domain: domain.into(),
            priority: priority.clamp(1, 10),
            status: GoalStatus::Pending,
            targets: Vec::new(),
            created_at: Utc::now(),
            uncertainty: None,
            value: None,
        }
    }

    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.targets = targets;
        self
    }

    /// Stable dedup key: `(type, targets[0] | description)` lowercased, per
    /// the `createDedupKey` round-trip law in §8.
    pub fn dedup_key(&self) -> String {
        let target = self
            .targets
            .first()
            .map(|s| s.as_str())
            .unwrap_or(self.description.as_str());
        format!("{:?}:{}", self.goal_type, target.to_lowercase())
    }
}

/// A single step within a reasoning episode's ordered trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    pub number: u32,
    pub action: String,
    pub query: String,
    pub result: String,
    pub reasoning: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// An append-only, capped audit record of a reasoning episode (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReasoningTrace {
    pub id: String,
    pub goal: String,
    pub domain: String,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub evidence: Vec<String>,
    pub conclusion: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl ReasoningTrace {
    pub fn new(goal: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            goal: goal.into(),
            domain: domain.into(),
            steps: Vec::new(),
            evidence: Vec::new(),
            conclusion: String::new(),
            confidence: 0.0,
            created_at: Utc::now(),
        }
    }

    pub fn push(
        &mut self,
        action: impl Into<String>,
        query: impl Into<String>,
        result: impl Into<String>,
        reasoning: impl Into<String>,
        confidence: f64,
    ) {
        let number = self.steps.len() as u32 + 1;
        self.steps.push(Step {
            number,
            action: action.into(),
            query: query.into(),
            result: result.into(),
            reasoning: reasoning.into(),
            confidence,
            timestamp: Utc::now(),
        });
    }

    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }
}

/// Per-hypothesis evaluation produced by the explanation-learning loop (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HypothesisEvaluation {
    pub hypothesis_id: String,
    pub was_correct: bool,
    pub accuracy: f64,
    pub quality: f64,
    pub alignment: f64,
    pub confidence_error: f64,
    #[serde(default)]
    pub improvement_areas: Vec<String>,
}

/// Per-trace evaluation produced by the explanation-learning loop (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEvaluation {
    pub trace_id: String,
    pub quality: f64,
    pub coherence: f64,
    pub decision_quality: f64,
    pub calibration: f64,
    pub outcome_correlation: f64,
}

/// Produced by C10 when a goal terminates; drives calibration updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalCompletionFeedback {
    pub goal_id: String,
    pub domain: String,
    pub hypothesis_evaluations: Vec<HypothesisEvaluation>,
    pub trace_evaluations: Vec<TraceEvaluation>,
    pub accuracy: f64,
    pub quality: f64,
    pub alignment: f64,
    pub created_at: DateTime<Utc>,
}

/// A candidate concept extracted from an episode (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConceptDiscovery {
    pub name: String,
    pub domain: String,
    pub definition: String,
    pub confidence: f64,
    pub source: String,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub relations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ConceptDiscovery {
    pub fn new(name: impl Into<String>, domain: impl Into<String>, definition: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            definition: definition.into(),
            confidence: confidence.clamp(0.0, 1.0),
            source: String::new(),
            properties: HashMap::new(),
            constraints: Vec::new(),
            examples: Vec::new(),
            relations: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn belief_confidence_is_clamped() {
        let belief = Belief::new("water boils at 100C at sea level", "chemistry", 1.4, BeliefSource::KnowledgeQuery);
        assert_eq!(belief.confidence, 1.0);
    }

    #[test]
    fn belief_with_uncertainty_is_calibrated() {
        let model = UncertaintyModel::new(0.9, 0.2, 0.1, 1.0);
        let belief = Belief::new("x relates to y", "physics", 0.9, BeliefSource::InferenceRule)
            .with_uncertainty(model);
        assert!(belief.confidence_is_calibrated());
        assert_eq!(belief.confidence, model.calibrated_confidence);
    }

    #[test]
    fn uncertainty_model_respects_inv5() {
        let model = UncertaintyModel::new(0.9, 0.3, 0.1, 1.0);
        assert!(model.respects_invariant(1.0, 1e-9));
        // base * (1-0.3) * (1-0.1) * 1.0 = 0.567
        assert!((model.calibrated_confidence - 0.567).abs() < 1e-9);
    }

    #[test]
    fn uncertainty_model_clamps_out_of_range_inputs() {
        let model = UncertaintyModel::new(1.5, -0.5, -0.5, 1.0);
        assert_eq!(model.base_confidence, 1.0);
        assert_eq!(model.epistemic_uncertainty, 0.0);
    }

    #[test]
    fn reduction_potential_matches_active_learning_example() {
        // §8 scenario 6: epistemic 0.8, aleatoric 0.1 -> potential ~0.72
        let x = UncertaintyModel::new(1.0, 0.8, 0.1, 1.0);
        assert!((x.reduction_potential() - 0.72).abs() < 1e-9);
        let y = UncertaintyModel::new(1.0, 0.6, 0.4, 1.0);
        assert!((y.reduction_potential() - 0.36).abs() < 1e-9);
    }

    #[test]
    fn reasoning_trace_numbers_steps_in_order() {
        let mut trace = ReasoningTrace::new("investigate gap", "physics");
        trace.push("query_beliefs", "what do we know about X", "3 beliefs found", "starting broad", 0.4);
        trace.push("infer", "combine beliefs", "new hypothesis H1", "beliefs jointly imply H1", 0.6);
        assert_eq!(trace.steps.len(), 2);
        assert_eq!(trace.steps[0].number, 1);
        assert_eq!(trace.steps[1].number, 2);
        assert_eq!(trace.last().unwrap().result, "new hypothesis H1");
    }

    #[test]
    fn curiosity_goal_starts_pending_with_clamped_priority() {
        let goal = CuriosityGoal::new(GoalType::GapFilling, "investigate gap in thermodynamics", "physics", 15);
        assert_eq!(goal.status, GoalStatus::Pending);
        assert_eq!(goal.priority, 10);
    }

    #[test]
    fn dedup_key_prefers_first_target_over_description() {
        let a = CuriosityGoal::new(GoalType::NewsAnalysis, "desc a", "AI", 5)
            .with_targets(vec!["OpenAI".into(), "Acme".into()]);
        let b = CuriosityGoal::new(GoalType::NewsAnalysis, "desc b", "AI", 7)
            .with_targets(vec!["openai".into()]);
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn cap_front_truncates_in_place() {
        let mut items: Vec<i32> = (0..250).collect();
        cap_front(&mut items, caps::BELIEFS);
        assert_eq!(items.len(), caps::BELIEFS);
    }
}
