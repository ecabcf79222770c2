//! Knowledge Growth Engine (C7, §4.4) and Knowledge Integration (C8, §4.5):
//! discovering new concepts, finding gaps, classifying domains, extracting
//! facts, and generating causally-classified hypotheses.

mod causal;
mod generic_filter;
mod growth;
mod integration;

pub use causal::{counterfactual_actions, intervention_goals, CausalClassifier, KeywordCausalClassifier};
pub use generic_filter::is_generic_concept_name;
pub use growth::{
    admit_concept, discover_new_concepts, find_knowledge_gaps, grow_knowledge_base,
    validate_knowledge_consistency, AdmissionDecision, ConceptCandidate,
};
pub use integration::{classify_domain, extract_facts, generate_hypotheses, FactCandidate};
