//! Causal classification (§4.5.1): keyword heuristics over a hypothesis
//! description, plus the counterfactual-action and intervention-goal
//! generators that every surviving hypothesis gets enriched with.
//!
//! Exposed as a trait (§9 design note) so a future statistical classifier
//! can replace the heuristic without touching `GenerateHypotheses`.

use crate::reasoning::CausalType;

const CAUSAL_INDICATORS: &[&str] =
    &["if we", "causes", "leads to", "produces", "triggers", "enables", "affects"];
const EXPERIMENTAL_INDICATORS: &[&str] =
    &["test", "experiment", "trial", "measure", "verify", "control", "intervention"];
const OBSERVATIONAL_INDICATORS: &[&str] =
    &["related to", "associated with", "correlated with", "linked to"];
const MODAL_VERBS: &[&str] = &["can", "will"];

pub trait CausalClassifier: Send + Sync {
    fn classify(&self, description: &str) -> CausalType;
}

pub struct KeywordCausalClassifier;

impl CausalClassifier for KeywordCausalClassifier {
    fn classify(&self, description: &str) -> CausalType {
        let lower = description.to_lowercase();
        let has_causal = CAUSAL_INDICATORS.iter().any(|k| lower.contains(k));
        let has_experimental = EXPERIMENTAL_INDICATORS.iter().any(|k| lower.contains(k));
        let has_observational = OBSERVATIONAL_INDICATORS.iter().any(|k| lower.contains(k));
        let has_modal_if = lower.contains("if") && MODAL_VERBS.iter().any(|m| lower.contains(m));

        if has_causal && has_experimental {
            CausalType::ExperimentallyTestableRelation
        } else if has_causal || has_modal_if {
            CausalType::InferredCausalCandidate
        } else if has_observational {
            CausalType::ObservationalRelation
        } else {
            CausalType::ObservationalRelation
        }
    }
}

/// Counterfactual actions (§4.5.1): three are always present — what
/// would refute the hypothesis, what evidence would change confidence in
/// it, and what would happen in `domain` if the proposed approach in
/// `description` were withheld — plus class-specific probes.
pub fn counterfactual_actions(causal_type: CausalType, description: &str, domain: &str) -> Vec<String> {
    let mut actions = vec![
        "identify what outcome would refute this hypothesis".to_string(),
        "identify what evidence would change confidence in this hypothesis".to_string(),
        format!("What would happen if we did NOT apply this approach to {domain}?"),
    ];
    match causal_type {
        CausalType::ExperimentallyTestableRelation => {
            actions.push(format!("check whether reversing the proposed cause in \"{description}\" changes the effect"));
            actions.push("rule out confounding variables through controlled comparison".to_string());
        }
        CausalType::InferredCausalCandidate => {
            actions.push("consider whether the causal direction could be reversed".to_string());
            actions.push(format!("consider alternative explanations for \"{description}\""));
        }
        CausalType::ObservationalRelation => {
            actions.push("consider alternative explanations for the observed association".to_string());
        }
    }
    actions
}

/// Intervention goals (§4.5.1): proposed controlled experiments; for
/// observational relations, a path toward testability.
pub fn intervention_goals(causal_type: CausalType, description: &str) -> Vec<String> {
    let mut goals = Vec::new();
    match causal_type {
        CausalType::ExperimentallyTestableRelation => {
            goals.push(format!("design a controlled experiment for: {description}"));
            goals.push("run an A/B test comparing presence and absence of the proposed cause".to_string());
            goals.push("design a factorial experiment to isolate interacting factors".to_string());
        }
        CausalType::InferredCausalCandidate => {
            goals.push(format!("design a controlled experiment for: {description}"));
            goals.push("run an A/B test comparing presence and absence of the proposed cause".to_string());
        }
        CausalType::ObservationalRelation => {
            goals.push(format!("gather additional evidence to move \"{description}\" toward causal testability"));
        }
    }
    goals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn causal_and_experimental_keywords_classify_as_testable() {
        let classifier = KeywordCausalClassifier;
        let t = classifier.classify("if we increase batch size, it causes faster convergence; we should test this");
        assert_eq!(t, CausalType::ExperimentallyTestableRelation);
    }

    #[test]
    fn causal_keywords_alone_classify_as_inferred_candidate() {
        let classifier = KeywordCausalClassifier;
        let t = classifier.classify("higher temperature causes faster reactions");
        assert_eq!(t, CausalType::InferredCausalCandidate);
    }

    #[test]
    fn observational_keywords_classify_as_observational() {
        let classifier = KeywordCausalClassifier;
        let t = classifier.classify("inflation is correlated with unemployment");
        assert_eq!(t, CausalType::ObservationalRelation);
    }

    #[test]
    fn neutral_description_defaults_to_observational() {
        let classifier = KeywordCausalClassifier;
        let t = classifier.classify("concept A and concept B appear in the same domain");
        assert_eq!(t, CausalType::ObservationalRelation);
    }

    #[test]
    fn counterfactuals_always_include_the_base_probes() {
        let actions = counterfactual_actions(CausalType::ObservationalRelation, "A relates to B", "physics");
        assert!(actions[0].contains("refute"));
        assert!(actions[1].contains("evidence"));
        assert!(actions[2].contains("NOT apply this approach to physics"));
    }

    #[test]
    fn counterfactuals_include_the_scenario_3_probe_literal() {
        // §8 scenario 3: H = "If we optimize caching, we can improve latency", domain "systems".
        let actions = counterfactual_actions(
            CausalType::InferredCausalCandidate,
            "If we optimize caching, we can improve latency",
            "systems",
        );
        assert!(actions.contains(&"What would happen if we did NOT apply this approach to systems?".to_string()));
    }
}
