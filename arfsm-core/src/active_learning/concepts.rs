//! `IdentifyHighUncertaintyConcepts` (§4.8): groups every belief,
//! hypothesis, and goal carrying an [`UncertaintyModel`] by a concept name
//! extracted from its text, keeps the highest-epistemic record per
//! concept, and ranks by `UncertaintyReductionPotential`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::reasoning::{Belief, CuriosityGoal, Hypothesis, UncertaintyModel};

/// A concept with its worst (highest-epistemic) known uncertainty, ready
/// to feed [`super::generate_data_acquisition_plans`].
#[derive(Debug, Clone, PartialEq)]
pub struct UncertainConcept {
    pub name: String,
    pub epistemic: f64,
    pub aleatoric: f64,
    pub reduction_potential: f64,
    pub evidence_count: usize,
    pub last_investigated: Option<DateTime<Utc>>,
}

/// Extract a stable concept key from free text: the leading run of
/// capitalized words if one exists (mirrors the capitalized-word heuristic
/// used for concept discovery in §4.4), otherwise the whole text
/// lowercased and trimmed to a short key.
fn extract_concept_name(text: &str) -> String {
    let mut words = Vec::new();
    for word in text.split_whitespace() {
        let clean = word.trim_matches(|c: char| !c.is_alphanumeric());
        if clean.chars().next().is_some_and(|c| c.is_uppercase()) && clean.len() > 1 {
            words.push(clean);
        } else if !words.is_empty() {
            break;
        }
    }
    if !words.is_empty() {
        return words.join(" ");
    }
    text.split_whitespace().take(4).collect::<Vec<_>>().join(" ").to_lowercase()
}

struct Candidate {
    epistemic: f64,
    aleatoric: f64,
    evidence_count: usize,
    investigated_at: DateTime<Utc>,
}

fn fold_candidate(best: &mut HashMap<String, Candidate>, name: String, model: &UncertaintyModel, evidence_count: usize, investigated_at: DateTime<Utc>) {
    let entry = best.entry(name).or_insert(Candidate {
        epistemic: model.epistemic_uncertainty,
        aleatoric: model.aleatoric_uncertainty,
        evidence_count,
        investigated_at,
    });
    if model.epistemic_uncertainty > entry.epistemic {
        entry.epistemic = model.epistemic_uncertainty;
        entry.aleatoric = model.aleatoric_uncertainty;
        entry.evidence_count = evidence_count;
        entry.investigated_at = investigated_at;
    } else if investigated_at > entry.investigated_at {
        entry.investigated_at = investigated_at;
    }
}

/// `IdentifyHighUncertaintyConcepts(domain, threshold)` (§4.8). `domain`
/// filtering is the caller's job (these slices are already per-domain, as
/// every list loaded from the store is); this scans whatever it is given.
pub fn identify_high_uncertainty_concepts(
    beliefs: &[Belief],
    hypotheses: &[Hypothesis],
    goals: &[CuriosityGoal],
    threshold: f64,
) -> Vec<UncertainConcept> {
    let mut best: HashMap<String, Candidate> = HashMap::new();

    for belief in beliefs {
        if let Some(model) = &belief.uncertainty {
            let name = extract_concept_name(&belief.statement);
            fold_candidate(&mut best, name, model, belief.evidence.len(), belief.last_updated);
        }
    }
    for hypothesis in hypotheses {
        if let Some(model) = &hypothesis.uncertainty {
            let name = extract_concept_name(&hypothesis.description);
            fold_candidate(&mut best, name, model, hypothesis.facts.len(), hypothesis.created_at);
        }
    }
    for goal in goals {
        if let Some(model) = &goal.uncertainty {
            let target = goal.targets.first().map(|s| s.as_str()).unwrap_or(&goal.description);
            let name = extract_concept_name(target);
            fold_candidate(&mut best, name, model, goal.targets.len(), goal.created_at);
        }
    }

    let mut concepts: Vec<UncertainConcept> = best
        .into_iter()
        .filter(|(_, c)| c.epistemic >= threshold)
        .map(|(name, c)| UncertainConcept {
            name,
            epistemic: c.epistemic,
            aleatoric: c.aleatoric,
            reduction_potential: c.epistemic * (1.0 - c.aleatoric),
            evidence_count: c.evidence_count,
            last_investigated: Some(c.investigated_at),
        })
        .collect();

    concepts.sort_by(|a, b| b.reduction_potential.partial_cmp(&a.reduction_potential).unwrap_or(std::cmp::Ordering::Equal));
    concepts
}
