//! Autonomy Cycle (C9, §4.6): the timer-triggered loop that turns
//! self-generated curiosity goals into action — scoring candidates,
//! selecting one under the single-active invariant, and dispatching the
//! work it implies.

mod cycle;
mod scoring;

pub use cycle::{run_cycle, AutonomyCycleConfig, AutonomyCycleDeps};
pub use scoring::{score_goal, seed_is_eligible, GoalScoringContext};
