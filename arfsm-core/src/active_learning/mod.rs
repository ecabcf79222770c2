//! Active Learning Loop (C11, §4.8): scans beliefs, hypotheses, and goals
//! for concepts carrying high epistemic uncertainty, turns the worst-known
//! ones into ranked data-acquisition plans, and converts those plans into
//! ordinary `active_learning` curiosity goals so the autonomy cycle (C9)
//! can dispatch them like any other goal.

mod concepts;
mod plans;

pub use concepts::{identify_high_uncertainty_concepts, UncertainConcept};
pub use plans::{
    convert_plans_to_curiosity_goals, generate_data_acquisition_plans, prioritize_experiments,
    DataAcquisitionPlan, PlanStep,
};
