//! `GenerateDataAcquisitionPlans`, `PrioritizeExperiments`, and
//! `ConvertPlansToCuriosityGoals` (§4.8).

use chrono::{Duration as ChronoDuration, Utc};

use crate::reasoning::{CuriosityGoal, GoalType, UncertaintyModel};

use super::concepts::UncertainConcept;

const STALE_AFTER: ChronoDuration = ChronoDuration::hours(24);

/// One step of a [`DataAcquisitionPlan`], with the reduction in epistemic
/// uncertainty it is expected to buy (§4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    pub action: String,
    pub expected_reduction: f64,
}

/// A ranked plan to reduce uncertainty about one concept.
#[derive(Debug, Clone, PartialEq)]
pub struct DataAcquisitionPlan {
    pub concept: String,
    pub steps: Vec<PlanStep>,
    pub priority: u8,
    pub estimated_minutes: u32,
    pub reduction_potential: f64,
}

fn build_steps(concept: &UncertainConcept) -> Vec<PlanStep> {
    let mut steps = vec![PlanStep { action: "query_knowledge_graph".to_string(), expected_reduction: 0.2 }];
    if concept.evidence_count > 0 {
        steps.push(PlanStep { action: "fetch_external_data".to_string(), expected_reduction: 0.3 });
    }
    if concept.epistemic > 0.5 {
        steps.push(PlanStep { action: "generate_and_test_hypothesis".to_string(), expected_reduction: 0.4 });
    }
    steps
}

fn is_stale_or_unvisited(concept: &UncertainConcept) -> bool {
    match concept.last_investigated {
        None => true,
        Some(ts) => Utc::now().signed_duration_since(ts) > STALE_AFTER,
    }
}

fn plan_priority(concept: &UncertainConcept) -> u8 {
    let mut priority = 1 + (9.0 * concept.reduction_potential).floor() as i32;
    if concept.evidence_count < 3 {
        priority += 2;
    }
    if is_stale_or_unvisited(concept) {
        priority += 1;
    }
    priority.clamp(1, 10) as u8
}

fn estimated_minutes(steps: &[PlanStep], concept: &UncertainConcept) -> u32 {
    let mut minutes = steps.len() as u32 * 5;
    if concept.evidence_count == 0 {
        minutes += 10;
    }
    minutes
}

/// `GenerateDataAcquisitionPlans(concepts, maxPlans)` (§4.8). `concepts`
/// is expected pre-sorted by reduction potential (as returned by
/// [`super::identify_high_uncertainty_concepts`]), so taking the first
/// `max_plans` already favours the worst-known concepts.
pub fn generate_data_acquisition_plans(concepts: &[UncertainConcept], max_plans: usize) -> Vec<DataAcquisitionPlan> {
    concepts
        .iter()
        .take(max_plans)
        .map(|concept| {
            let steps = build_steps(concept);
            let priority = plan_priority(concept);
            let estimated_minutes = estimated_minutes(&steps, concept);
            DataAcquisitionPlan {
                concept: concept.name.clone(),
                steps,
                priority,
                estimated_minutes,
                reduction_potential: concept.reduction_potential,
            }
        })
        .collect()
}

/// `PrioritizeExperiments` (§4.8): re-rank by efficiency (reduction
/// potential per hour, floored at a 0.1h minimum so a zero-length plan
/// doesn't divide by zero) with a 1.5x bonus above a 0.7 potential, then
/// overwrite each plan's `priority` to reflect the efficiency rank (most
/// efficient gets 10, descending, clamped at 1). Plan order is untouched —
/// only priority changes.
pub fn prioritize_experiments(plans: &mut [DataAcquisitionPlan]) {
    let mut ranked: Vec<(f64, usize)> = plans
        .iter()
        .enumerate()
        .map(|(index, plan)| {
            let hours = (plan.estimated_minutes as f64 / 60.0).max(0.1);
            let mut efficiency = plan.reduction_potential / hours;
            if plan.reduction_potential > 0.7 {
                efficiency *= 1.5;
            }
            (efficiency, index)
        })
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    for (rank, (_, index)) in ranked.into_iter().enumerate() {
        plans[index].priority = (10 - rank as i32).clamp(1, 10) as u8;
    }
}

/// `ConvertPlansToCuriosityGoals` (§4.8): each plan becomes an
/// `active_learning` goal whose description embeds the first step's
/// action and whose uncertainty model carries the reduction potential as
/// both the base confidence and the epistemic estimate.
pub fn convert_plans_to_curiosity_goals(plans: &[DataAcquisitionPlan], domain: &str) -> Vec<CuriosityGoal> {
    plans
        .iter()
        .map(|plan| {
            let first_action = plan.steps.first().map(|s| s.action.as_str()).unwrap_or("query_knowledge_graph");
            let description = format!("{first_action} to reduce uncertainty about {}", plan.concept);
            let uncertainty = UncertaintyModel::new(plan.reduction_potential, plan.reduction_potential, 0.0, 1.0);
            let mut goal = CuriosityGoal::new(GoalType::ActiveLearning, description, domain, plan.priority)
                .with_targets(vec![plan.concept.clone()]);
            goal.uncertainty = Some(uncertainty);
            goal.value = Some(plan.reduction_potential);
            goal
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept(name: &str, epistemic: f64, aleatoric: f64, evidence_count: usize) -> UncertainConcept {
        UncertainConcept {
            name: name.to_string(),
            epistemic,
            aleatoric,
            reduction_potential: epistemic * (1.0 - aleatoric),
            evidence_count,
            last_investigated: None,
        }
    }

    #[test]
    fn plan_steps_scale_with_evidence_and_epistemic_uncertainty() {
        let low = concept("sparse concept", 0.3, 0.1, 0);
        let rich = concept("well studied concept", 0.8, 0.1, 5);
        let plans = generate_data_acquisition_plans(&[low, rich], 2);
        assert_eq!(plans[0].steps.len(), 1); // no evidence, epistemic <= 0.5
        assert_eq!(plans[1].steps.len(), 3); // has evidence and epistemic > 0.5
    }

    #[test]
    fn priority_gets_bonuses_for_sparse_evidence_and_staleness() {
        let sparse_unvisited = concept("rarely discussed concept", 0.8, 0.1, 0);
        let plans = generate_data_acquisition_plans(&[sparse_unvisited], 1);
        // base = 1 + floor(9*0.72) = 1 + 6 = 7; +2 (evidence<3) +1 (never investigated) = 10, clamped.
        assert_eq!(plans[0].priority, 10);
    }

    #[test]
    fn max_plans_limits_output_and_preserves_caller_order() {
        let concepts = vec![concept("a", 0.9, 0.0, 5), concept("b", 0.5, 0.0, 5), concept("c", 0.1, 0.0, 5)];
        let plans = generate_data_acquisition_plans(&concepts, 2);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].concept, "a");
        assert_eq!(plans[1].concept, "b");
    }

    #[test]
    fn prioritize_experiments_favors_high_potential_low_effort_plans() {
        let mut plans = vec![
            DataAcquisitionPlan { concept: "slow".into(), steps: vec![], priority: 5, estimated_minutes: 120, reduction_potential: 0.5 },
            DataAcquisitionPlan { concept: "fast".into(), steps: vec![], priority: 5, estimated_minutes: 15, reduction_potential: 0.8 },
        ];
        prioritize_experiments(&mut plans);
        assert_eq!(plans[1].priority, 10);
        assert!(plans[0].priority < plans[1].priority);
    }

    #[test]
    fn converted_goal_description_embeds_first_step_and_carries_reduction_potential() {
        let plan = DataAcquisitionPlan {
            concept: "Gradient Boosting".into(),
            steps: vec![PlanStep { action: "query_knowledge_graph".into(), expected_reduction: 0.2 }],
            priority: 9,
            estimated_minutes: 5,
            reduction_potential: 0.72,
        };
        let goals = convert_plans_to_curiosity_goals(std::slice::from_ref(&plan), "AI");
        assert_eq!(goals.len(), 1);
        assert!(goals[0].description.contains("query_knowledge_graph"));
        assert!(goals[0].description.contains("Gradient Boosting"));
        let uncertainty = goals[0].uncertainty.unwrap();
        assert_eq!(uncertainty.base_confidence, 0.72);
        assert_eq!(uncertainty.epistemic_uncertainty, 0.72);
        assert_eq!(goals[0].goal_type, GoalType::ActiveLearning);
    }
}
