//! Autonomy Cycle (C9, §4.6): the timer-triggered loop that selects one
//! curiosity goal per tick, activates it under the single-active
//! invariant, and dispatches the work it implies.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::active_learning::{
    convert_plans_to_curiosity_goals, generate_data_acquisition_plans, identify_high_uncertainty_concepts,
    prioritize_experiments,
};
use crate::error::Result;
use crate::fsm::NextEvent;
use crate::hdn::{BootstrapRequest, GraphClient, HdnClient};
use crate::reasoning::{
    cap_front, caps, generate_curiosity_goals, infer_new_beliefs, query_beliefs, Belief, CuriosityGoal, GoalStatus,
    GoalType, Hypothesis, NoveltyAssessor,
};
use crate::store::StoreClient;

use super::scoring::{score_goal, seed_is_eligible, GoalScoringContext};

const TOP_CANDIDATES: usize = 5;
const MAX_ANALYSIS_TASKS_PER_CYCLE: usize = 3;
const BELIEF_WATERMARK_THRESHOLD: f64 = 0.75;
/// Below this many heuristically-generated candidates, the cycle tops up
/// with active-learning goals rather than falling straight to the anchor
/// (§4.6 step 2: the timer tick "may invoke C11").
const ACTIVE_LEARNING_TOPUP_THRESHOLD: usize = 2;
const ACTIVE_LEARNING_UNCERTAINTY_THRESHOLD: f64 = 0.5;
const ACTIVE_LEARNING_MAX_PLANS: usize = 2;

async fn active_learning_topup(store: &dyn StoreClient, domain: &str, existing: &[CuriosityGoal]) -> Vec<CuriosityGoal> {
    let beliefs: Vec<Belief> = store
        .get(&format!("reasoning:beliefs:{domain}"))
        .await
        .ok()
        .flatten()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();
    let hypotheses: Vec<Hypothesis> = store
        .get(&format!("reasoning:hypotheses:{domain}"))
        .await
        .ok()
        .flatten()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();
    let concepts = identify_high_uncertainty_concepts(&beliefs, &hypotheses, existing, ACTIVE_LEARNING_UNCERTAINTY_THRESHOLD);
    if concepts.is_empty() {
        return Vec::new();
    }
    let mut plans = generate_data_acquisition_plans(&concepts, ACTIVE_LEARNING_MAX_PLANS);
    prioritize_experiments(&mut plans);
    convert_plans_to_curiosity_goals(&plans, domain)
}

#[derive(Debug, Clone)]
pub struct AutonomyCycleConfig {
    pub max_active_goals: usize,
    pub max_concurrent_hypothesis_tests: usize,
    pub disable_llm_goal_selection: bool,
    pub bootstrap_max_depth: u32,
    pub bootstrap_max_nodes: u32,
    pub bootstrap_rpm: u32,
    pub bootstrap_min_confidence: f64,
    pub bootstrap_cooldown: Duration,
}

impl Default for AutonomyCycleConfig {
    fn default() -> Self {
        Self {
            max_active_goals: 1,
            max_concurrent_hypothesis_tests: 1,
            disable_llm_goal_selection: false,
            bootstrap_max_depth: 1,
            bootstrap_max_nodes: 100,
            bootstrap_rpm: 12,
            bootstrap_min_confidence: 0.7,
            bootstrap_cooldown: Duration::from_secs(24 * 3600),
        }
    }
}

/// Everything a cycle run needs, bundled so `run_cycle`'s signature stays
/// manageable. Cheap to clone (all `Arc`), so a single instance can be
/// shared across ticks by the action registered with the dispatcher.
#[derive(Clone)]
pub struct AutonomyCycleDeps {
    pub graph: Arc<dyn GraphClient>,
    pub store: Arc<dyn StoreClient>,
    pub hdn: Arc<HdnClient>,
    pub novelty: Arc<dyn NoveltyAssessor>,
    pub config: AutonomyCycleConfig,
}

async fn active_goal_count(store: &dyn StoreClient, domain: &str, goals: &[CuriosityGoal]) -> usize {
    let _ = store;
    goals.iter().filter(|g| g.domain == domain && g.status == GoalStatus::Active).count()
}

async fn persisted_goals(store: &dyn StoreClient, domain: &str) -> Vec<CuriosityGoal> {
    let key = format!("reasoning:curiosity_goals:{domain}");
    match store.get(&key).await {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_default(),
        _ => Vec::new(),
    }
}

async fn persist_goals(store: &dyn StoreClient, domain: &str, goals: &[CuriosityGoal]) {
    let key = format!("reasoning:curiosity_goals:{domain}");
    if let Ok(serialized) = serde_json::to_string(goals) {
        let _ = store.set(&key, &serialized).await;
    }
}

async fn anchor_goal(store: &dyn StoreClient, domain: &str) -> Option<CuriosityGoal> {
    let raw = store.get(&format!("autonomy:anchor_goal:{domain}")).await.ok().flatten()?;
    Some(CuriosityGoal::new(GoalType::AnchorCuriosity, raw, domain, 9))
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    selected_goal_id: String,
    #[serde(default)]
    #[allow(dead_code)]
    reason: String,
}

/// LLM re-rank of the top heuristic candidates (§4.6 step 6). Falls back
/// to the top heuristic candidate on any failure, a missing id, or when
/// disabled via config.
async fn rerank_with_llm(hdn: &HdnClient, config: &AutonomyCycleConfig, candidates: &[CuriosityGoal]) -> usize {
    if config.disable_llm_goal_selection || candidates.is_empty() {
        return 0;
    }
    let schema_prompt = format!(
        "Candidates: {}\n\nSelect the single best goal to pursue next. Respond with JSON: {{\"selected_goal_id\": str, \"reason\": str, \"scores\": [float]}}",
        candidates
            .iter()
            .map(|g| format!("{{id: {}, description: {}}}", g.id, g.description))
            .collect::<Vec<_>>()
            .join("; ")
    );
    let response = match hdn.interpret(&schema_prompt, None, None).await {
        Ok(r) => r,
        Err(_) => return 0,
    };
    let Some(json) = response.extract_json() else { return 0 };
    let Ok(decoded) = serde_json::from_value::<RerankResponse>(json) else { return 0 };
    candidates.iter().position(|c| c.id == decoded.selected_goal_id).unwrap_or(0)
}

async fn bootstrap_seed(deps: &AutonomyCycleDeps, goal: &CuriosityGoal, consecutive_empty_cycles: u32) {
    let domain = goal.domain.clone();
    let seed = goal.targets.first().cloned().unwrap_or_else(|| goal.description.clone());
    let depth = if consecutive_empty_cycles >= 2 { deps.config.bootstrap_max_depth * 2 } else { deps.config.bootstrap_max_depth };
    let req = BootstrapRequest {
        seeds: vec![seed.clone()],
        max_depth: depth,
        max_nodes: deps.config.bootstrap_max_nodes,
        rpm: deps.config.bootstrap_rpm,
        domain: domain.clone(),
        jitter_ms: 250,
        min_confidence: deps.config.bootstrap_min_confidence,
    };
    let hdn = deps.hdn.clone();
    let store = deps.store.clone();
    let cooldown = deps.config.bootstrap_cooldown;
    tokio::spawn(async move {
        match hdn.bootstrap(&req).await {
            Ok(()) => {
                let _ = store.set_add(&format!("autonomy:bootstrap:seeds:{domain}"), &seed).await;
                let _ = store
                    .set_ex(&format!("autonomy:bootstrap:cooldown:{seed}"), &Utc::now().to_rfc3339(), cooldown)
                    .await;
                let event = serde_json::json!({ "seed": seed, "domain": domain, "status": "bootstrapped" });
                if let Ok(payload) = serde_json::to_string(&event) {
                    let _ = store.publish("agi.events.input", &payload).await;
                }
            }
            Err(e) => warn!(seed, domain, error = %e, "bootstrap invocation failed"),
        }
    });
}

async fn post_stitch(graph: Arc<dyn GraphClient>, domain: String) {
    tokio::spawn(async move {
        let concepts = match graph.query("all concepts", &domain).await {
            Ok(c) => c,
            Err(_) => return,
        };
        for (i, a) in concepts.iter().enumerate() {
            if a.name.is_empty() {
                continue;
            }
            for b in concepts.iter().skip(i + 1) {
                if b.name.is_empty() {
                    continue;
                }
                let shared = a
                    .definition
                    .split_whitespace()
                    .filter(|w| w.len() > 3)
                    .filter(|w| b.definition.to_lowercase().contains(&w.to_lowercase()))
                    .count();
                if shared >= 3 {
                    debug!(a = %a.name, b = %b.name, "post-stitch candidate relation");
                }
            }
        }
    });
}

/// `RunAutonomyCycle(domain)` (§4.6): the full eleven-step tick, returning
/// events the FSM engine should enqueue next.
pub async fn run_cycle(deps: &AutonomyCycleDeps, domain: &str, consecutive_empty_cycles: u32) -> Result<Vec<NextEvent>> {
    // Step 1: pause guard.
    if deps.store.get("auto_executor:paused").await.ok().flatten().as_deref() == Some("1") {
        return Ok(Vec::new());
    }

    // Step 2: generate, top up with active learning, or fall back to an anchor goal.
    let mut candidates = generate_curiosity_goals(deps.graph.as_ref(), deps.store.as_ref(), domain).await;
    if candidates.len() < ACTIVE_LEARNING_TOPUP_THRESHOLD {
        candidates.extend(active_learning_topup(deps.store.as_ref(), domain, &candidates).await);
    }
    if candidates.is_empty() {
        match anchor_goal(deps.store.as_ref(), domain).await {
            Some(anchor) => candidates.push(anchor),
            None => return Ok(Vec::new()),
        }
    }

    // Step 3: capacity guards.
    let existing = persisted_goals(deps.store.as_ref(), domain).await;
    if active_goal_count(deps.store.as_ref(), domain, &existing).await >= deps.config.max_active_goals {
        return Ok(Vec::new());
    }
    let testing_count = existing
        .iter()
        .filter(|g| g.domain == domain && g.goal_type == GoalType::HypothesisTesting && g.status == GoalStatus::Active)
        .count();
    if testing_count >= deps.config.max_concurrent_hypothesis_tests {
        candidates.retain(|g| g.goal_type != GoalType::HypothesisTesting);
    }
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    // Step 4: score; step 5: filter to eligible top 5.
    let mut scored: Vec<(f64, CuriosityGoal)> = candidates
        .into_iter()
        .filter(|g| {
            let is_seed_type = matches!(g.goal_type, GoalType::GapFilling | GoalType::ConceptExploration);
            if !is_seed_type {
                return true;
            }
            seed_is_eligible(false, None) // bootstrap-already-done / cooldown checked again at dispatch time
        })
        .map(|g| {
            let ctx = GoalScoringContext::default();
            let score = score_goal(&g, &ctx);
            (score, g)
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(TOP_CANDIDATES);
    let top_candidates: Vec<CuriosityGoal> = scored.into_iter().map(|(_, g)| g).collect();
    if top_candidates.is_empty() {
        return Ok(Vec::new());
    }

    // Step 6: LLM re-rank.
    let chosen_index = rerank_with_llm(&deps.hdn, &deps.config, &top_candidates).await;
    let mut selected = top_candidates[chosen_index].clone();
    selected.status = GoalStatus::Active;

    // Step 7: persist and activate, enforcing the single-active invariant.
    let mut persisted = existing;
    let mut seen_keys: HashSet<String> = persisted.iter().map(|g| format!("{:?}:{}", g.goal_type, g.description.to_lowercase())).collect();
    for candidate in top_candidates.iter() {
        let key = format!("{:?}:{}", candidate.goal_type, candidate.description.to_lowercase());
        if seen_keys.insert(key) {
            persisted.push(candidate.clone());
        }
    }
    for goal in persisted.iter_mut() {
        if goal.domain == domain {
            goal.status = if goal.id == selected.id { GoalStatus::Active } else if goal.status == GoalStatus::Active { GoalStatus::Pending } else { goal.status };
        }
    }
    cap_front(&mut persisted, caps::CURIOSITY_GOALS);
    persist_goals(deps.store.as_ref(), domain, &persisted).await;

    let mut next_events = vec![NextEvent::new("goal_selected", serde_json::json!({ "goal_id": selected.id, "domain": domain }))];

    // Step 8: dispatch branching.
    match selected.goal_type {
        GoalType::HypothesisTesting => {
            let hypothesis_id = selected.targets.first().cloned().unwrap_or_default();
            next_events.push(NextEvent::new(
                "hypothesis_testing_requested",
                serde_json::json!({ "hypothesis_id": hypothesis_id, "domain": domain }),
            ));
        }
        GoalType::GapFilling | GoalType::ConceptExploration => {
            bootstrap_seed(deps, &selected, consecutive_empty_cycles).await;
            post_stitch(deps.graph.clone(), domain.to_string()).await;
        }
        _ => {}
    }

    // Step 9: belief query against the goal's first target (or description).
    let query = selected.targets.first().cloned().unwrap_or_else(|| selected.description.clone());
    let beliefs = query_beliefs(deps.graph.as_ref(), deps.novelty.as_ref(), &query, domain).await.unwrap_or_default();
    let mut fired = 0usize;
    for belief in &beliefs {
        if belief.confidence < BELIEF_WATERMARK_THRESHOLD || fired >= MAX_ANALYSIS_TASKS_PER_CYCLE {
            continue;
        }
        let watermark_key = format!("autonomy:beliefs:seen:{domain}");
        let is_new = deps.store.set_add(&watermark_key, &belief.id).await.unwrap_or(false);
        if is_new {
            next_events.push(NextEvent::new("belief_new", serde_json::json!({ "belief_id": belief.id, "domain": domain })));
            fired += 1;
        }
    }
    let mut stored_beliefs: Vec<_> = beliefs;
    cap_front(&mut stored_beliefs, caps::BELIEFS);
    if let Ok(serialized) = serde_json::to_string(&stored_beliefs) {
        let _ = deps.store.set(&format!("reasoning:beliefs:{domain}"), &serialized).await;
    }
    let empty_cycle_key = format!("autonomy:empty_cycles:{domain}");
    if stored_beliefs.is_empty() {
        let current: u32 = deps.store.get(&empty_cycle_key).await.ok().flatten().and_then(|v| v.parse().ok()).unwrap_or(0);
        let _ = deps.store.set(&empty_cycle_key, &(current + 1).to_string()).await;
    } else {
        let _ = deps.store.set(&empty_cycle_key, "0").await;
    }

    // Step 10: inference.
    let mut inferred = infer_new_beliefs(deps.graph.as_ref(), deps.store.as_ref(), domain).await.unwrap_or_default();
    cap_front(&mut inferred, caps::BELIEFS);
    if let Ok(serialized) = serde_json::to_string(&inferred) {
        let _ = deps.store.set(&format!("reasoning:beliefs:inferred:{domain}"), &serialized).await;
    }

    // Step 11: advance.
    next_events.push(NextEvent::new("curiosity_goals_generated", serde_json::json!({ "domain": domain })).after(200));

    Ok(next_events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdn::graph::tests::FakeGraphClient;
    use crate::reasoning::HdnNoveltyAssessor;
    use crate::store::MemoryStore;

    fn deps() -> AutonomyCycleDeps {
        AutonomyCycleDeps {
            graph: Arc::new(FakeGraphClient { rows: vec![] }),
            store: Arc::new(MemoryStore::new()),
            hdn: Arc::new(HdnClient::new("http://localhost:1")),
            novelty: Arc::new(HdnNoveltyAssessor::new(Arc::new(HdnClient::new("http://localhost:1")))),
            config: AutonomyCycleConfig { disable_llm_goal_selection: true, ..Default::default() },
        }
    }

    #[tokio::test]
    async fn pause_guard_short_circuits_the_cycle() {
        let d = deps();
        d.store.set("auto_executor:paused", "1").await.unwrap();
        let events = run_cycle(&d, "physics", 0).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn empty_domain_emits_seed_goal_selection() {
        let d = deps();
        let events = run_cycle(&d, "physics", 0).await.unwrap();
        assert!(events.iter().any(|e| e.name == "goal_selected"));
        assert!(events.iter().any(|e| e.name == "curiosity_goals_generated"));
    }

    #[tokio::test]
    async fn stored_high_uncertainty_beliefs_top_up_sparse_candidates_with_active_learning_goals() {
        use crate::reasoning::{BeliefSource, UncertaintyModel};
        let d = deps();
        let belief = Belief::new("Gradient Boosting improves accuracy", "physics", 0.9, BeliefSource::KnowledgeQuery)
            .with_uncertainty(UncertaintyModel::new(1.0, 0.8, 0.1, 1.0));
        let serialized = serde_json::to_string(&vec![belief]).unwrap();
        d.store.set("reasoning:beliefs:physics", &serialized).await.unwrap();

        let goals = active_learning_topup(d.store.as_ref(), "physics", &[]).await;
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].goal_type, GoalType::ActiveLearning);
    }

    #[tokio::test]
    async fn capacity_guard_blocks_when_already_at_max_active_goals() {
        let d = deps();
        let existing = vec![CuriosityGoal {
            status: GoalStatus::Active,
            ..CuriosityGoal::new(GoalType::Exploration, "existing active goal", "physics", 5)
        }];
        persist_goals(d.store.as_ref(), "physics", &existing).await;
        let events = run_cycle(&d, "physics", 0).await.unwrap();
        assert!(events.is_empty());
    }
}
