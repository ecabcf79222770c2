//! `QueryBeliefs` (§4.3, first half of C6): translates a natural-language
//! query into a graph query, executes it, and maps results to [`Belief`]s
//! with confidence derived from data quality rather than the query itself.

use async_trait::async_trait;

use crate::error::Result;
use crate::hdn::{GraphClient, GraphRow, HdnClient};

use super::types::{Belief, BeliefSource};

/// Assesses whether a candidate belief/concept/fact is novel and worth
/// keeping, via one additional LLM call (§4.3 step 5, §4.4 step 2, §4.5
/// `ExtractFacts`). Kept as a trait so the reasoning engine doesn't depend
/// on a concrete LLM transport.
#[async_trait]
pub trait NoveltyAssessor: Send + Sync {
    async fn assess(&self, domain: &str, text: &str) -> Result<NoveltyAssessment>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoveltyAssessment {
    pub novel: bool,
    pub valuable: bool,
}

/// Production assessor: one `/interpret` call per candidate, rate-limited
/// by the caller via [`crate::rate_limit::RateLimiter`] (§4.4, §9).
pub struct HdnNoveltyAssessor {
    hdn: std::sync::Arc<HdnClient>,
}

impl HdnNoveltyAssessor {
    pub fn new(hdn: std::sync::Arc<HdnClient>) -> Self {
        Self { hdn }
    }
}

#[async_trait]
impl NoveltyAssessor for HdnNoveltyAssessor {
    async fn assess(&self, domain: &str, text: &str) -> Result<NoveltyAssessment> {
        let prompt = format!(
            "Domain: {domain}\nCandidate: {text}\n\nIs this candidate novel (not obvious/common knowledge) and valuable (worth learning)? Respond with JSON: {{\"novel\": bool, \"valuable\": bool}}"
        );
        let response = self.hdn.interpret(&prompt, None, None).await?;
        let Some(json) = response.extract_json() else {
            // LLM unavailable or response undecodable: default to keeping
            // the candidate rather than silently discarding it (§7 decode
            // errors degrade to an empty/neutral result, not a drop).
            return Ok(NoveltyAssessment { novel: true, valuable: true });
        };
        Ok(NoveltyAssessment {
            novel: json.get("novel").and_then(|v| v.as_bool()).unwrap_or(true),
            valuable: json.get("valuable").and_then(|v| v.as_bool()).unwrap_or(true),
        })
    }
}

/// What a natural-language query translates to (§4.3 step 1).
#[derive(Debug, Clone, PartialEq)]
enum TranslatedQuery {
    ExactConcept(String),
    Neighborhood(String),
    DomainScan,
    ContainsFilter(String),
}

fn translate_query(query: &str) -> TranslatedQuery {
    let lower = query.trim().to_lowercase();
    if let Some(rest) = lower.strip_prefix("what is ") {
        return TranslatedQuery::ExactConcept(rest.trim().to_string());
    }
    if let Some(rest) = lower.strip_prefix("related to ") {
        return TranslatedQuery::Neighborhood(rest.trim().to_string());
    }
    if lower == "all concepts" {
        return TranslatedQuery::DomainScan;
    }
    TranslatedQuery::ContainsFilter(query.to_string())
}

/// Confidence derived from data quality, not the query (§4.3 step 3):
/// unknown concept -> 0.3; existing concept with a definition -> 0.7-0.85,
/// scaled by definition length.
fn derive_confidence(row: &GraphRow, is_known_concept: bool) -> f64 {
    if !is_known_concept {
        return 0.3;
    }
    if row.definition.len() >= 20 {
        let ratio = ((row.definition.len() as f64 - 20.0) / 200.0).clamp(0.0, 1.0);
        0.70 + 0.15 * ratio
    } else {
        0.5
    }
}

fn belief_statement(row: &GraphRow, domain: &str) -> String {
    if row.name.is_empty() {
        format!("Unknown concept queried in {domain}")
    } else if row.definition.is_empty() {
        format!("{} is a concept in {}", row.name, domain)
    } else {
        format!("{}: {}", row.name, row.definition)
    }
}

/// `QueryBeliefs(query, domain)` (§4.3).
pub async fn query_beliefs(
    graph: &dyn GraphClient,
    novelty: &dyn NoveltyAssessor,
    query: &str,
    domain: &str,
) -> Result<Vec<Belief>> {
    let translated = translate_query(query);
    let mut rows: Vec<GraphRow> = match &translated {
        TranslatedQuery::ExactConcept(name) => graph.get_concept(name, domain).await?.into_iter().collect(),
        TranslatedQuery::Neighborhood(name) => graph.neighbors(name, domain).await?,
        TranslatedQuery::DomainScan => graph.query("all concepts", domain).await?,
        TranslatedQuery::ContainsFilter(text) => graph.query(text, domain).await?,
    };

    let mut fallback_used = false;
    if rows.is_empty() {
        // Fallback on empty result: broaden to a case-insensitive
        // contains-match in the same domain (§4.3 step 4).
        rows = graph.query(query, domain).await.unwrap_or_default();
        fallback_used = true;
    }

    let mut beliefs = Vec::with_capacity(rows.len());
    for row in rows {
        let is_known = !row.name.is_empty();
        let mut confidence = derive_confidence(&row, is_known);
        if fallback_used {
            confidence = confidence.min(0.7);
            if confidence < 0.7 {
                continue;
            }
        }

        let statement = belief_statement(&row, domain);
        let has_substantive_text = !row.definition.is_empty() && statement.len() > 20;

        if confidence >= 0.7 && has_substantive_text {
            // High-confidence, substantive beliefs get a second LLM pass
            // to screen out the obvious and low-value (§4.3 step 5).
            // Simple concept names (no definition) skip assessment.
            let assessment = novelty.assess(domain, &statement).await.unwrap_or(NoveltyAssessment { novel: true, valuable: true });
            if !assessment.novel || !assessment.valuable {
                continue;
            }
        }

        beliefs.push(Belief::new(statement, domain, confidence, BeliefSource::KnowledgeQuery));
    }
    Ok(beliefs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdn::graph::tests::FakeGraphClient;

    struct AlwaysNovel;
    #[async_trait]
    impl NoveltyAssessor for AlwaysNovel {
        async fn assess(&self, _domain: &str, _text: &str) -> Result<NoveltyAssessment> {
            Ok(NoveltyAssessment { novel: true, valuable: true })
        }
    }

    struct AlwaysObvious;
    #[async_trait]
    impl NoveltyAssessor for AlwaysObvious {
        async fn assess(&self, _domain: &str, _text: &str) -> Result<NoveltyAssessment> {
            Ok(NoveltyAssessment { novel: false, valuable: false })
        }
    }

    fn sample_row(name: &str, domain: &str, definition: &str) -> GraphRow {
        GraphRow { name: name.into(), domain: domain.into(), definition: definition.into(), ..Default::default() }
    }

    #[tokio::test]
    async fn unknown_concept_gets_low_confidence() {
        let graph = FakeGraphClient { rows: vec![] };
        let beliefs = query_beliefs(&graph, &AlwaysNovel, "what is quantum entanglement", "physics").await.unwrap();
        assert!(beliefs.is_empty() || beliefs[0].confidence <= 0.3);
    }

    #[tokio::test]
    async fn known_concept_with_definition_gets_high_confidence() {
        let graph = FakeGraphClient {
            rows: vec![sample_row(
                "neural network",
                "AI",
                "a computational model inspired by biological neural networks used for pattern recognition",
            )],
        };
        let beliefs = query_beliefs(&graph, &AlwaysNovel, "what is neural network", "AI").await.unwrap();
        assert_eq!(beliefs.len(), 1);
        assert!(beliefs[0].confidence >= 0.7);
    }

    #[tokio::test]
    async fn obvious_beliefs_are_screened_out() {
        let graph = FakeGraphClient {
            rows: vec![sample_row(
                "neural network",
                "AI",
                "a computational model inspired by biological neural networks used for pattern recognition",
            )],
        };
        let beliefs = query_beliefs(&graph, &AlwaysObvious, "what is neural network", "AI").await.unwrap();
        assert!(beliefs.is_empty());
    }

    #[tokio::test]
    async fn fallback_broadens_query_and_caps_confidence() {
        let graph = FakeGraphClient {
            rows: vec![sample_row(
                "deep learning",
                "AI",
                "a subset of machine learning using layered neural architectures",
            )],
        };
        // "what is gradient descent" finds nothing exact, falls back to the
        // contains-match which (in the fake) just filters by domain.
        let beliefs = query_beliefs(&graph, &AlwaysNovel, "what is gradient descent", "AI").await.unwrap();
        for belief in &beliefs {
            assert!(belief.confidence <= 0.7);
        }
    }
}
