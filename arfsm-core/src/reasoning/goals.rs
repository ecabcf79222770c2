//! `GenerateCuriosityGoals` (§4.3, third piece of C6): self-generated
//! exploration tasks, the generic-goal filter (§4.3.1), and news-driven
//! goal generation.
//!
//! This module only *proposes* goals — persisting the winner and enforcing
//! the single-active invariant is the autonomy cycle's job (§4.6 step 7).
//! The one side effect here is old-goal cleanup, since nothing downstream
//! else owns it.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::hdn::GraphClient;
use crate::store::StoreClient;

use super::types::{cap_front, caps, CuriosityGoal, GoalStatus, GoalType};

const SEED_GOAL_COOLDOWN_SECONDS: i64 = 120;
const OLD_GOAL_MAX_AGE_HOURS: i64 = 24;
const MAX_CANDIDATES: usize = 10;

const GENERIC_EXPLORATION_DESCRIPTION: &str = "Explore new concepts and relationships in the domain";
const GENERIC_CONTRADICTION_DESCRIPTION: &str = "Resolve any contradictions in the knowledge base";

const HYPOTHESIS_GENERIC_PHRASES: &[&str] = &[
    "apply insights from system state",
    "improve our general approach",
    "improve general performance",
    "optimize the ai capability control system",
    "if we apply insights",
    "we can improve",
    "learn to discover new",
    "discover new general opportunities",
    "investigate system state",
];

/// The generic-goal filter (§4.3.1): default placeholder text that carries
/// no domain-specific value gets dropped once richer candidates exist.
pub fn is_generic_goal(goal: &CuriosityGoal) -> bool {
    if goal.description == GENERIC_EXPLORATION_DESCRIPTION || goal.description == GENERIC_CONTRADICTION_DESCRIPTION {
        return true;
    }
    if goal.goal_type == GoalType::HypothesisTesting {
        let lower = goal.description.to_lowercase();
        if HYPOTHESIS_GENERIC_PHRASES.iter().any(|p| lower.contains(p)) {
            return true;
        }
        if goal.description.matches(':').count() > 2 {
            return true;
        }
        if goal.description.len() < 30 {
            return true;
        }
    }
    false
}

fn important_technical_term(term: &str) -> bool {
    const TERMS: &[&str] = &["ai", "machine learning", "neural", "algorithm", "data", "security", "cryptography", "blockchain", "quantum"];
    let lower = term.to_lowercase();
    TERMS.iter().any(|t| lower.contains(t))
}

fn gap_filling_goals(graph_rows: &[crate::hdn::GraphRow], domain: &str) -> Vec<CuriosityGoal> {
    let mut goals = Vec::new();
    for row in graph_rows {
        if row.name.is_empty() {
            continue;
        }
        let base_priority = if important_technical_term(&row.name) { 8 } else { 6 };
        if row.relations.is_empty() {
            goals.push(
                CuriosityGoal::new(GoalType::GapFilling, format!("Fill relation gap for {}", row.name), domain, base_priority)
                    .with_targets(vec![row.name.clone()]),
            );
        }
        if row.definition.is_empty() {
            goals.push(
                CuriosityGoal::new(GoalType::GapFilling, format!("Fill definition gap for {}", row.name), domain, base_priority)
                    .with_targets(vec![row.name.clone()]),
            );
        }
    }
    goals
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct NewsRelation {
    head: String,
    relation: String,
    tail: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct NewsAlert {
    headline: String,
    impact: String,
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

async fn unseen_news_items<T: for<'de> Deserialize<'de>>(
    store: &dyn StoreClient,
    list_key: &str,
    processed_set_key: &str,
    canonical: impl Fn(&T) -> String,
) -> Vec<T> {
    let raw_items = store.list_range(list_key, 0, -1).await.unwrap_or_default();
    let mut unseen = Vec::new();
    for raw in raw_items {
        let Ok(item) = serde_json::from_str::<T>(&raw) else { continue };
        let hash = sha256_hex(&canonical(&item));
        let seen = store.set_is_member(processed_set_key, &hash).await.unwrap_or(false);
        if seen {
            continue;
        }
        let _ = store.set_add(processed_set_key, &hash).await;
        unseen.push(item);
    }
    unseen
}

/// News-driven goal generation (§4.3 "News-driven goals").
pub async fn generate_news_driven_goals(store: &dyn StoreClient, domain: &str) -> Vec<CuriosityGoal> {
    let mut goals = Vec::new();

    let relations = unseen_news_items::<NewsRelation>(
        store,
        "reasoning:news_relations:recent",
        "reasoning:news_relations:recent:processed",
        |r| format!("{}|{}|{}", r.head, r.relation, r.tail),
    )
    .await;
    for relation in relations {
        goals.push(
            CuriosityGoal::new(
                GoalType::NewsAnalysis,
                format!("Analyze news relation: {} {} {}", relation.head, relation.relation, relation.tail),
                domain,
                6,
            )
            .with_targets(vec![relation.head]),
        );
    }

    let alerts = unseen_news_items::<NewsAlert>(
        store,
        "reasoning:news_alerts:recent",
        "reasoning:news_alerts:recent:processed",
        |a| format!("{}|{}", a.headline, a.impact),
    )
    .await;
    for alert in alerts {
        let priority = match alert.impact.to_lowercase().as_str() {
            "high" => 9,
            "medium" => 7,
            _ => 5,
        };
        goals.push(
            CuriosityGoal::new(GoalType::NewsAnalysis, format!("Analyze news alert: {}", alert.headline), domain, priority)
                .with_targets(vec![alert.headline]),
        );
    }

    goals
}

async fn seed_cooldown_elapsed(store: &dyn StoreClient, domain: &str) -> bool {
    let key = format!("autonomy:seed_goals:{domain}:last_emitted_at");
    match store.get(&key).await {
        Ok(Some(raw)) => match DateTime::parse_from_rfc3339(&raw) {
            Ok(ts) => Utc::now().signed_duration_since(ts) >= ChronoDuration::seconds(SEED_GOAL_COOLDOWN_SECONDS),
            Err(_) => true,
        },
        _ => true,
    }
}

async fn record_seed_emission(store: &dyn StoreClient, domain: &str) {
    let key = format!("autonomy:seed_goals:{domain}:last_emitted_at");
    let _ = store.set(&key, &Utc::now().to_rfc3339()).await;
}

/// Remove completed/failed goals and goals older than
/// [`OLD_GOAL_MAX_AGE_HOURS`] from the persisted curiosity-goal list.
pub async fn cleanup_old_goals(store: &dyn StoreClient, domain: &str) {
    let key = format!("reasoning:curiosity_goals:{domain}");
    let Ok(Some(raw)) = store.get(&key).await else { return };
    let Ok(mut goals) = serde_json::from_str::<Vec<CuriosityGoal>>(&raw) else { return };
    let cutoff = Utc::now() - ChronoDuration::hours(OLD_GOAL_MAX_AGE_HOURS);
    goals.retain(|g| !matches!(g.status, GoalStatus::Completed | GoalStatus::Failed) && g.created_at >= cutoff);
    if let Ok(serialized) = serde_json::to_string(&goals) {
        let _ = store.set(&key, &serialized).await;
    }
}

async fn existing_goal_descriptions(store: &dyn StoreClient, domain: &str) -> Vec<String> {
    let key = format!("reasoning:curiosity_goals:{domain}");
    match store.get(&key).await {
        Ok(Some(raw)) => serde_json::from_str::<Vec<CuriosityGoal>>(&raw)
            .unwrap_or_default()
            .into_iter()
            .map(|g| g.description.to_lowercase())
            .collect(),
        _ => Vec::new(),
    }
}

/// `GenerateCuriosityGoals(domain)` (§4.3).
pub async fn generate_curiosity_goals(
    graph: &dyn GraphClient,
    store: &dyn StoreClient,
    domain: &str,
) -> Vec<CuriosityGoal> {
    let concepts = graph.query("all concepts", domain).await.unwrap_or_default();

    if concepts.is_empty() {
        if !seed_cooldown_elapsed(store, domain).await {
            return Vec::new();
        }
        record_seed_emission(store, domain).await;
        return vec![
            CuriosityGoal::new(GoalType::Exploration, GENERIC_EXPLORATION_DESCRIPTION, domain, 8),
            CuriosityGoal::new(GoalType::KnowledgeBuilding, "Build foundational knowledge for the domain", domain, 9),
        ];
    }

    let mut batch = gap_filling_goals(&concepts, domain);
    batch.push(CuriosityGoal::new(GoalType::ContradictionResolution, GENERIC_CONTRADICTION_DESCRIPTION, domain, 5));
    batch.push(CuriosityGoal::new(GoalType::ConceptExploration, GENERIC_EXPLORATION_DESCRIPTION, domain, 5));
    batch.extend(generate_news_driven_goals(store, domain).await);

    batch.retain(|g| !is_generic_goal(g));

    let existing_descriptions = existing_goal_descriptions(store, domain).await;
    let mut seen_descriptions: std::collections::HashSet<String> = existing_descriptions.into_iter().collect();
    batch.retain(|g| seen_descriptions.insert(g.description.to_lowercase()));

    batch.sort_by(|a, b| b.priority.cmp(&a.priority));
    cap_front(&mut batch, MAX_CANDIDATES.min(caps::CURIOSITY_GOALS));

    cleanup_old_goals(store, domain).await;

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdn::graph::tests::FakeGraphClient;
    use crate::hdn::GraphRow;
    use crate::store::MemoryStore;

    fn concept(name: &str, domain: &str) -> GraphRow {
        GraphRow { name: name.into(), domain: domain.into(), ..Default::default() }
    }

    #[tokio::test]
    async fn zero_concepts_emits_two_seed_goals_then_cools_down() {
        let graph = FakeGraphClient { rows: vec![] };
        let store = MemoryStore::new();
        let first = generate_curiosity_goals(&graph, &store, "physics").await;
        assert_eq!(first.len(), 2);
        assert!(first.iter().any(|g| g.goal_type == GoalType::Exploration));

        let second = generate_curiosity_goals(&graph, &store, "physics").await;
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn nonzero_concepts_filters_generic_sentinels() {
        let graph = FakeGraphClient { rows: vec![concept("thermodynamics", "physics")] };
        let store = MemoryStore::new();
        let goals = generate_curiosity_goals(&graph, &store, "physics").await;
        assert!(!goals.iter().any(|g| g.description == GENERIC_EXPLORATION_DESCRIPTION));
        assert!(!goals.iter().any(|g| g.description == GENERIC_CONTRADICTION_DESCRIPTION));
        // Gap-filling goals for the single concept (missing relations + definition) survive.
        assert!(goals.iter().any(|g| g.goal_type == GoalType::GapFilling));
    }

    #[test]
    fn hypothesis_testing_goal_with_generic_phrase_is_filtered() {
        let goal = CuriosityGoal::new(GoalType::HypothesisTesting, "we can improve our predictions here", "AI", 5);
        assert!(is_generic_goal(&goal));
    }

    #[test]
    fn hypothesis_testing_goal_with_specific_description_is_kept() {
        let goal = CuriosityGoal::new(
            GoalType::HypothesisTesting,
            "test whether gradient clipping reduces exploding gradients in transformer training",
            "AI",
            5,
        );
        assert!(!is_generic_goal(&goal));
    }

    #[tokio::test]
    async fn news_alert_priority_reflects_impact() {
        let store = MemoryStore::new();
        let alert = NewsAlert { headline: "Acme releases new model".into(), impact: "high".into() };
        store
            .list_push("reasoning:news_alerts:recent", &serde_json::to_string(&alert).unwrap())
            .await
            .unwrap();
        let goals = generate_news_driven_goals(&store, "AI").await;
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].priority, 9);
    }

    #[tokio::test]
    async fn news_items_are_deduplicated_by_hash() {
        let store = MemoryStore::new();
        let relation = NewsRelation { head: "Acme".into(), relation: "ACQUIRED".into(), tail: "Widgets Inc".into() };
        let encoded = serde_json::to_string(&relation).unwrap();
        store.list_push("reasoning:news_relations:recent", &encoded).await.unwrap();
        let first = generate_news_driven_goals(&store, "AI").await;
        assert_eq!(first.len(), 1);

        store.list_push("reasoning:news_relations:recent", &encoded).await.unwrap();
        let second = generate_news_driven_goals(&store, "AI").await;
        assert!(second.is_empty());
    }
}
