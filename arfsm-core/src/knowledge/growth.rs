//! Knowledge Growth Engine (C7, §4.4): turns reasoning-episode text into
//! new concepts, finds gaps in existing ones, and periodically validates
//! consistency.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::hdn::{GraphClient, HdnClient};
use crate::reasoning::{CuriosityGoal, GoalType, NoveltyAssessor};
use crate::store::StoreClient;

use super::generic_filter::is_generic_concept_name;

const VALIDATION_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

#[derive(Debug, Clone, Deserialize)]
struct RawDiscovery {
    name: String,
    definition: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    relevance: f64,
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    constraints: Vec<String>,
}

/// A concept worth considering for addition to the knowledge base.
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptCandidate {
    pub name: String,
    pub definition: String,
    pub confidence: f64,
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub constraints: Vec<String>,
}

/// Simple capitalised-word heuristic used when the LLM is unavailable
/// (§4.4 step 1 fallback): any run of capitalised words becomes a
/// low-confidence candidate with an empty definition.
fn capitalized_word_fallback(text: &str) -> Vec<ConceptCandidate> {
    let mut candidates = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for word in text.split_whitespace() {
        let clean = word.trim_matches(|c: char| !c.is_alphanumeric());
        let starts_upper = clean.chars().next().is_some_and(|c| c.is_uppercase());
        if starts_upper && clean.len() > 1 {
            current.push(clean);
        } else if !current.is_empty() {
            candidates.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        candidates.push(current.join(" "));
    }
    candidates
        .into_iter()
        .filter(|name| !is_generic_concept_name(name))
        .map(|name| ConceptCandidate {
            name,
            definition: String::new(),
            confidence: 0.4,
            properties: serde_json::Map::new(),
            constraints: Vec::new(),
        })
        .collect()
}

/// `DiscoverNewConcepts(episodes, domain)` (§4.4 step 1).
pub async fn discover_new_concepts(hdn: &HdnClient, episodes: &[String], domain: &str) -> Vec<ConceptCandidate> {
    let mut by_name: Vec<ConceptCandidate> = Vec::new();
    let mut seen_names: HashSet<String> = HashSet::new();

    for episode in episodes {
        let prompt = format!(
            "Domain: {domain}\nUser interests: general knowledge growth\nEpisode text:\n{episode}\n\nExtract new concepts as a JSON array: [{{\"name\": str, \"definition\": str, \"confidence\": float, \"relevance\": float, \"properties\": object, \"constraints\": [str]}}]"
        );
        let raw: Vec<RawDiscovery> = match hdn.interpret(&prompt, None, None).await {
            Ok(response) => response
                .extract_json()
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default(),
            Err(e) => {
                debug!(error = %e, "interpret failed during concept discovery, using heuristic fallback");
                Vec::new()
            }
        };

        let discoveries: Vec<ConceptCandidate> = if raw.is_empty() {
            capitalized_word_fallback(episode)
        } else {
            raw.into_iter()
                .filter(|d| d.relevance >= 0.4 && !is_generic_concept_name(&d.name))
                .map(|d| ConceptCandidate {
                    name: d.name,
                    definition: d.definition,
                    confidence: d.confidence,
                    properties: d.properties,
                    constraints: d.constraints,
                })
                .collect()
        };

        for candidate in discoveries {
            let key = candidate.name.to_lowercase();
            if seen_names.insert(key) {
                by_name.push(candidate);
            }
        }
    }

    by_name.retain(|c| c.confidence >= 0.6);
    by_name
}

/// Per-discovery admission decision for `GrowKnowledgeBase` step 2: whether
/// the candidate should be created, used to update an existing stub, or
/// skipped outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Create,
    UpdateStub,
    Skip,
}

pub async fn admit_concept(
    graph: &dyn GraphClient,
    novelty: &dyn NoveltyAssessor,
    domain: &str,
    candidate: &ConceptCandidate,
) -> Result<AdmissionDecision> {
    if candidate.definition.len() < 20 || is_generic_concept_name(&candidate.name) {
        return Ok(AdmissionDecision::Skip);
    }

    let assessment = novelty.assess(domain, &candidate.definition).await?;
    if !assessment.novel || !assessment.valuable {
        return Ok(AdmissionDecision::Skip);
    }

    match graph.get_concept(&candidate.name, domain).await? {
        Some(existing) if existing.definition.len() >= 20 => Ok(AdmissionDecision::Skip),
        Some(_) => Ok(AdmissionDecision::UpdateStub),
        None => Ok(AdmissionDecision::Create),
    }
}

/// `GrowKnowledgeBase(episodes, domain)` (§4.4): discover, admit, and
/// create/update concepts through the knowledge service.
pub async fn grow_knowledge_base(
    hdn: &HdnClient,
    graph: &dyn GraphClient,
    novelty: &dyn NoveltyAssessor,
    episodes: &[String],
    domain: &str,
) -> Result<Vec<ConceptCandidate>> {
    let candidates = discover_new_concepts(hdn, episodes, domain).await;
    let mut created = Vec::new();
    for candidate in candidates {
        match admit_concept(graph, novelty, domain, &candidate).await? {
            AdmissionDecision::Skip => continue,
            AdmissionDecision::Create | AdmissionDecision::UpdateStub => {
                let payload = serde_json::json!({
                    "name": candidate.name,
                    "domain": domain,
                    "definition": candidate.definition,
                    "confidence": candidate.confidence,
                    "properties": candidate.properties,
                    "constraints": candidate.constraints,
                });
                hdn.create_concept(&payload).await?;
                created.push(candidate);
            }
        }
    }
    Ok(created)
}

/// `FindKnowledgeGaps` (§4.4 step 3): missing relations (priority 6),
/// constraints (5), and examples (4) for each existing concept.
pub async fn find_knowledge_gaps(graph: &dyn GraphClient, domain: &str) -> Vec<CuriosityGoal> {
    let concepts = graph.query("all concepts", domain).await.unwrap_or_default();
    let mut gaps = Vec::new();
    for concept in &concepts {
        if concept.name.is_empty() {
            continue;
        }
        if concept.relations.is_empty() {
            gaps.push(
                CuriosityGoal::new(GoalType::GapFilling, format!("Find relations for {}", concept.name), domain, 6)
                    .with_targets(vec![concept.name.clone()]),
            );
        }
        if concept.constraints.is_empty() {
            gaps.push(
                CuriosityGoal::new(GoalType::GapFilling, format!("Find constraints for {}", concept.name), domain, 5)
                    .with_targets(vec![concept.name.clone()]),
            );
        }
        if concept.examples.is_empty() {
            gaps.push(
                CuriosityGoal::new(GoalType::GapFilling, format!("Find examples for {}", concept.name), domain, 4)
                    .with_targets(vec![concept.name.clone()]),
            );
        }
    }
    gaps
}

fn shared_definition_tokens(a: &str, b: &str) -> usize {
    let a_tokens: HashSet<&str> = a.split_whitespace().filter(|w| w.len() > 3).collect();
    b.split_whitespace().filter(|w| a_tokens.contains(w)).count()
}

/// `ValidateKnowledgeConsistency` (§4.4 step 4): flag contradiction pairs
/// (explicit negation of one concept's name in another's definition) and
/// missing-relationship candidates (concepts sharing >= 3 definition
/// tokens but carrying no relation between them).
pub async fn validate_knowledge_consistency(graph: &dyn GraphClient, store: &dyn StoreClient, domain: &str) {
    let concepts = graph.query("all concepts", domain).await.unwrap_or_default();
    let mut contradictions = 0usize;
    let mut missing_relationships = 0usize;
    const NEGATORS: &[&str] = &["not", "contrary to", "opposite of", "unlike"];

    for (i, a) in concepts.iter().enumerate() {
        if a.name.is_empty() {
            continue;
        }
        for b in concepts.iter().skip(i + 1) {
            if b.name.is_empty() {
                continue;
            }
            let a_def = a.definition.to_lowercase();
            let b_name = b.name.to_lowercase();
            if NEGATORS.iter().any(|n| a_def.contains(&format!("{n} {b_name}"))) {
                contradictions += 1;
            }
            if a.relations.is_empty() && b.relations.is_empty() && shared_definition_tokens(&a.definition, &b.definition) >= 3 {
                missing_relationships += 1;
            }
        }
    }

    let metrics = serde_json::json!({
        "contradiction_count": contradictions,
        "missing_relationship_count": missing_relationships,
        "checked_at": chrono::Utc::now().to_rfc3339(),
    });
    if let Ok(serialized) = serde_json::to_string(&metrics) {
        let _ = store.set_ex(&format!("knowledge:validation:{domain}"), &serialized, VALIDATION_TTL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdn::GraphRow;
    use crate::store::MemoryStore;

    struct FakeGraph {
        rows: Vec<GraphRow>,
    }

    #[async_trait::async_trait]
    impl GraphClient for FakeGraph {
        async fn query(&self, _cypher: &str, domain: &str) -> Result<Vec<GraphRow>> {
            Ok(self.rows.iter().filter(|r| r.domain == domain).cloned().collect())
        }
        async fn get_concept(&self, name: &str, domain: &str) -> Result<Option<GraphRow>> {
            Ok(self.rows.iter().find(|r| r.name == name && r.domain == domain).cloned())
        }
        async fn neighbors(&self, _name: &str, domain: &str) -> Result<Vec<GraphRow>> {
            Ok(self.rows.iter().filter(|r| r.domain == domain).cloned().collect())
        }
    }

    #[test]
    fn capitalized_word_fallback_extracts_multi_word_names() {
        let candidates = capitalized_word_fallback("We discussed Neural Network architectures and also gravity today");
        assert!(candidates.iter().any(|c| c.name == "Neural Network"));
        assert!(candidates.iter().all(|c| c.confidence == 0.4));
    }

    #[tokio::test]
    async fn find_knowledge_gaps_covers_relations_constraints_examples() {
        let graph = FakeGraph {
            rows: vec![GraphRow { name: "mitochondria".into(), domain: "biology".into(), ..Default::default() }],
        };
        let gaps = find_knowledge_gaps(&graph, "biology").await;
        assert_eq!(gaps.len(), 3);
        assert!(gaps.iter().any(|g| g.priority == 6));
        assert!(gaps.iter().any(|g| g.priority == 5));
        assert!(gaps.iter().any(|g| g.priority == 4));
    }

    #[tokio::test]
    async fn validate_knowledge_consistency_persists_metrics_with_ttl() {
        let graph = FakeGraph {
            rows: vec![
                GraphRow { name: "hot".into(), domain: "physics".into(), definition: "not cold by definition".into(), ..Default::default() },
                GraphRow { name: "cold".into(), domain: "physics".into(), definition: "low temperature state".into(), ..Default::default() },
            ],
        };
        let store = MemoryStore::new();
        validate_knowledge_consistency(&graph, &store, "physics").await;
        let raw = store.get("knowledge:validation:physics").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["contradiction_count"], 1);
    }
}
