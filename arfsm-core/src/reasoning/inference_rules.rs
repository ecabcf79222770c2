//! `InferNewBeliefs` (§4.3, second half of C6): a small default rule set
//! applied over a domain's known concepts. Rules are data (loadable from
//! the store per domain) rather than code, so new domains can carry their
//! own classification vocabulary without a redeploy.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hdn::GraphRow;
use crate::store::StoreClient;

use super::types::{cap_front, caps, Belief, BeliefSource};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum RuleKind {
    /// Definition contains one of `keywords` (case-insensitive) -> classify
    /// the concept under `relation`.
    KeywordClassification { keywords: Vec<String>, relation: String },
    /// Two distinct concept names in the same domain share a significant
    /// word -> they are similar.
    ConceptSimilarityByName,
    /// One concept's definition mentions another concept's name -> the two
    /// are related.
    CrossReferenceInDefinitions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceRule {
    pub name: String,
    pub confidence: f64,
    pub kind: RuleKind,
}

/// The five built-in rules (§4.3): academic-field and technology
/// classification, concept similarity, domain relationship by
/// cross-reference, and practical application.
pub fn default_rules() -> Vec<InferenceRule> {
    vec![
        InferenceRule {
            name: "academic_field_classification".into(),
            confidence: 0.85,
            kind: RuleKind::KeywordClassification {
                keywords: vec!["study".into(), "science".into(), "field".into(), "discipline".into()],
                relation: "ACADEMIC_FIELD".into(),
            },
        },
        InferenceRule {
            name: "technology_classification".into(),
            confidence: 0.85,
            kind: RuleKind::KeywordClassification {
                keywords: vec![
                    "technology".into(),
                    "software".into(),
                    "algorithm".into(),
                    "system".into(),
                    "platform".into(),
                ],
                relation: "TECHNOLOGY".into(),
            },
        },
        InferenceRule { name: "concept_similarity".into(), confidence: 0.70, kind: RuleKind::ConceptSimilarityByName },
        InferenceRule {
            name: "domain_relationship".into(),
            confidence: 0.60,
            kind: RuleKind::CrossReferenceInDefinitions,
        },
        InferenceRule {
            name: "practical_application".into(),
            confidence: 0.75,
            kind: RuleKind::KeywordClassification {
                keywords: vec!["used to".into(), "application".into(), "applied in".into(), "practice".into()],
                relation: "PRACTICAL_APPLICATION".into(),
            },
        },
    ]
}

/// Load a domain's rule overrides from the store, falling back to
/// [`default_rules`]. Store key: `reasoning:rules:<domain>`, a JSON array.
pub async fn load_rules(store: &dyn StoreClient, domain: &str) -> Vec<InferenceRule> {
    let key = format!("reasoning:rules:{domain}");
    match store.get(&key).await {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|_| default_rules()),
        _ => default_rules(),
    }
}

fn significant_words(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split_whitespace()
        .filter(|w| w.len() > 3)
        .map(|w| w.to_string())
        .collect()
}

fn apply_rule(rule: &InferenceRule, concepts: &[GraphRow], domain: &str) -> Vec<Belief> {
    let mut beliefs = Vec::new();
    match &rule.kind {
        RuleKind::KeywordClassification { keywords, relation } => {
            for concept in concepts {
                if concept.name.is_empty() || concept.definition.is_empty() {
                    continue;
                }
                let def = concept.definition.to_lowercase();
                if keywords.iter().any(|k| def.contains(k.as_str())) {
                    beliefs.push(Belief::new(
                        format!("{} is classified as {}", concept.name, relation),
                        domain,
                        rule.confidence,
                        BeliefSource::InferenceRule,
                    ));
                }
            }
        }
        RuleKind::ConceptSimilarityByName => {
            for (i, a) in concepts.iter().enumerate() {
                if a.name.is_empty() {
                    continue;
                }
                let a_words = significant_words(&a.name);
                for b in concepts.iter().skip(i + 1) {
                    if b.name.is_empty() || a.name.eq_ignore_ascii_case(&b.name) {
                        continue;
                    }
                    let b_words = significant_words(&b.name);
                    if a_words.iter().any(|w| b_words.contains(w)) {
                        beliefs.push(Belief::new(
                            format!("{} is similar to {}", a.name, b.name),
                            domain,
                            rule.confidence,
                            BeliefSource::InferenceRule,
                        ));
                    }
                }
            }
        }
        RuleKind::CrossReferenceInDefinitions => {
            for a in concepts {
                if a.name.is_empty() {
                    continue;
                }
                for b in concepts {
                    if b.name.is_empty() || a.name.eq_ignore_ascii_case(&b.name) {
                        continue;
                    }
                    if a.definition.to_lowercase().contains(&b.name.to_lowercase()) {
                        beliefs.push(Belief::new(
                            format!("{} is related to {}", a.name, b.name),
                            domain,
                            rule.confidence,
                            BeliefSource::InferenceRule,
                        ));
                    }
                }
            }
        }
    }
    beliefs
}

/// `InferNewBeliefs(domain)` (§4.3): scan the domain's known concepts
/// through every loaded rule and emit beliefs, capped at
/// [`caps::BELIEFS`].
pub async fn infer_new_beliefs(
    graph: &dyn crate::hdn::GraphClient,
    store: &dyn StoreClient,
    domain: &str,
) -> Result<Vec<Belief>> {
    let rules = load_rules(store, domain).await;
    let concepts = graph.query("all concepts", domain).await.unwrap_or_default();
    let mut beliefs = Vec::new();
    for rule in &rules {
        beliefs.extend(apply_rule(rule, &concepts, domain));
    }
    cap_front(&mut beliefs, caps::BELIEFS);
    Ok(beliefs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdn::graph::tests::FakeGraphClient;
    use crate::store::MemoryStore;

    fn row(name: &str, domain: &str, definition: &str) -> GraphRow {
        GraphRow { name: name.into(), domain: domain.into(), definition: definition.into(), ..Default::default() }
    }

    #[test]
    fn default_rules_has_five_entries_with_expected_confidences() {
        let rules = default_rules();
        assert_eq!(rules.len(), 5);
        assert_eq!(rules[0].confidence, 0.85);
        assert_eq!(rules[3].confidence, 0.60);
    }

    #[tokio::test]
    async fn academic_field_rule_fires_on_keyword_match() {
        let graph = FakeGraphClient {
            rows: vec![row("thermodynamics", "physics", "the study of heat and energy transfer")],
        };
        let store = MemoryStore::new();
        let beliefs = infer_new_beliefs(&graph, &store, "physics").await.unwrap();
        assert!(beliefs.iter().any(|b| b.statement.contains("ACADEMIC_FIELD")));
    }

    #[tokio::test]
    async fn cross_reference_rule_links_concepts_mentioned_in_each_other() {
        let graph = FakeGraphClient {
            rows: vec![
                row("neural network", "AI", "a model loosely inspired by the biological brain"),
                row("brain", "AI", "the organ responsible for cognition"),
            ],
        };
        let store = MemoryStore::new();
        let beliefs = infer_new_beliefs(&graph, &store, "AI").await.unwrap();
        assert!(beliefs.iter().any(|b| b.statement == "neural network is related to brain"));
    }

    #[tokio::test]
    async fn beliefs_are_capped() {
        let rows: Vec<GraphRow> = (0..250)
            .map(|i| row(&format!("concept{i}"), "big", "the study of concept numbering"))
            .collect();
        let graph = FakeGraphClient { rows };
        let store = MemoryStore::new();
        let beliefs = infer_new_beliefs(&graph, &store, "big").await.unwrap();
        assert!(beliefs.len() <= caps::BELIEFS);
    }
}
