//! Goal scoring and eligibility (§4.6 steps 4-5): a heuristic score per
//! candidate goal, and the bootstrap-seed cooldown that makes a goal
//! ineligible regardless of score.

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::reasoning::{CuriosityGoal, GoalType};

const IMPORTANT_TECHNICAL_TERMS: &[&str] =
    &["ai", "machine learning", "neural", "algorithm", "data", "security", "cryptography", "blockchain", "quantum"];

fn mentions_important_term(text: &str) -> bool {
    let lower = text.to_lowercase();
    IMPORTANT_TECHNICAL_TERMS.iter().any(|t| lower.contains(t))
}

/// Historical and contextual signal a score needs, gathered by the caller
/// from the store (kept separate from `CuriosityGoal` since it's per-type
/// and per-domain, not per-goal).
#[derive(Debug, Clone, Copy, Default)]
pub struct GoalScoringContext {
    pub success_rate: f64,
    pub avg_value: f64,
    pub domain_failures_24h_for_type: u32,
    pub tried_recently: bool,
    pub failed_recently: bool,
}

fn linear_bonus(value: f64, max_bonus: f64) -> f64 {
    if value <= 0.5 {
        0.0
    } else {
        (((value - 0.5) / 0.5) * max_bonus).clamp(0.0, max_bonus)
    }
}

fn type_bonus(goal: &CuriosityGoal) -> f64 {
    match goal.goal_type {
        GoalType::NewsAnalysis => {
            let mut bonus = 2.0;
            bonus += match goal.priority {
                9 => 3.0,
                7 => 1.5,
                _ => 0.0,
            };
            let age = Utc::now().signed_duration_since(goal.created_at);
            bonus += if age < ChronoDuration::hours(1) {
                2.0
            } else if age < ChronoDuration::hours(6) {
                1.0
            } else {
                0.0
            };
            bonus
        }
        GoalType::GapFilling => {
            let target = goal.targets.first().map(|t| t.as_str()).unwrap_or(goal.description.as_str());
            if mentions_important_term(target) {
                2.0
            } else {
                -1.0
            }
        }
        GoalType::ContradictionResolution => 1.5,
        _ => 0.0,
    }
}

fn aging_penalty(goal: &CuriosityGoal) -> f64 {
    let age = Utc::now().signed_duration_since(goal.created_at);
    if age > ChronoDuration::hours(24) {
        -2.0
    } else if age > ChronoDuration::hours(12) {
        -1.0
    } else {
        0.0
    }
}

/// The heuristic score from §4.6 step 4.
pub fn score_goal(goal: &CuriosityGoal, ctx: &GoalScoringContext) -> f64 {
    let mut score = goal.priority as f64;
    score += linear_bonus(ctx.success_rate, 3.0);
    score += linear_bonus(ctx.avg_value, 2.0);
    score += type_bonus(goal);
    score += aging_penalty(goal);
    if ctx.failed_recently {
        score -= 2.0;
    }
    if ctx.tried_recently {
        score -= 1.5;
    }
    if ctx.domain_failures_24h_for_type >= 3 {
        score -= 2.0;
    }
    score
}

/// A bootstrap seed that was already bootstrapped, or is still within
/// its cooldown, is ineligible regardless of score (§4.6 step 5).
pub fn seed_is_eligible(seed_bootstrapped: bool, cooldown_remaining: Option<std::time::Duration>) -> bool {
    !seed_bootstrapped && cooldown_remaining.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(goal_type: GoalType, priority: u8) -> CuriosityGoal {
        CuriosityGoal::new(goal_type, "investigate the relationship between entropy and information", "physics", priority)
    }

    #[test]
    fn success_rate_at_one_gives_max_bonus() {
        assert!((linear_bonus(1.0, 3.0) - 3.0).abs() < 1e-9);
        assert_eq!(linear_bonus(0.5, 3.0), 0.0);
        assert_eq!(linear_bonus(0.2, 3.0), 0.0);
    }

    #[test]
    fn news_analysis_with_high_priority_gets_large_bonus() {
        let g = goal(GoalType::NewsAnalysis, 9);
        let ctx = GoalScoringContext::default();
        let score = score_goal(&g, &ctx);
        // base 9 + type bonus (2 + 3 + recency-2 since just created) = 16
        assert!((score - 16.0).abs() < 1e-6);
    }

    #[test]
    fn gap_filling_for_important_term_gets_positive_bonus() {
        let mut g = goal(GoalType::GapFilling, 6);
        g.targets = vec!["neural network".into()];
        let ctx = GoalScoringContext::default();
        assert!((score_goal(&g, &ctx) - 8.0).abs() < 1e-6);
    }

    #[test]
    fn failure_and_tried_recently_penalties_stack() {
        let g = goal(GoalType::Exploration, 5);
        let ctx = GoalScoringContext { failed_recently: true, tried_recently: true, ..Default::default() };
        assert!((score_goal(&g, &ctx) - (5.0 - 2.0 - 1.5)).abs() < 1e-6);
    }

    #[test]
    fn seed_eligibility_rejects_bootstrapped_or_cooling_down() {
        assert!(seed_is_eligible(false, None));
        assert!(!seed_is_eligible(true, None));
        assert!(!seed_is_eligible(false, Some(std::time::Duration::from_secs(60))));
    }
}
