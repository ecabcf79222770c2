//! Guard Evaluator (C4, §4.1): named predicates consulted by the FSM
//! engine before allowing a transition. The registry is extensible by name;
//! three guards must always exist.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

use super::context::FsmContext;

/// What a guard needs to decide: the current context and how long the FSM
/// has been in its current state.
pub struct GuardInput<'a> {
    pub context: &'a FsmContext,
    pub state_entered_at: DateTime<Utc>,
    pub state_duration_seconds: u64,
}

#[async_trait]
pub trait Guard: Send + Sync {
    async fn evaluate(&self, input: &GuardInput<'_>) -> bool;
}

/// `input_validator` — always `true` in the core; domain validation is
/// delegated to the knowledge integration layer (C8), per §4.1.
pub struct InputValidator;

#[async_trait]
impl Guard for InputValidator {
    async fn evaluate(&self, _input: &GuardInput<'_>) -> bool {
        true
    }
}

/// `work_checker` — always `true` in the core (§4.1).
pub struct WorkChecker;

#[async_trait]
impl Guard for WorkChecker {
    async fn evaluate(&self, _input: &GuardInput<'_>) -> bool {
        true
    }
}

/// `timeout_checker` — `true` iff `now - state_entry_time >=
/// params.state_duration_seconds` (§4.1).
pub struct TimeoutChecker;

#[async_trait]
impl Guard for TimeoutChecker {
    async fn evaluate(&self, input: &GuardInput<'_>) -> bool {
        let elapsed = Utc::now().signed_duration_since(input.state_entered_at);
        elapsed.num_seconds() >= input.state_duration_seconds as i64
    }
}

/// Name -> [`Guard`] registry, extensible at construction time.
pub struct GuardRegistry {
    guards: HashMap<String, Arc<dyn Guard>>,
}

impl GuardRegistry {
    /// The three guards §4.1 requires to always exist.
    pub fn with_defaults() -> Self {
        let mut registry = Self { guards: HashMap::new() };
        registry.register("input_validator", Arc::new(InputValidator));
        registry.register("work_checker", Arc::new(WorkChecker));
        registry.register("timeout_checker", Arc::new(TimeoutChecker));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, guard: Arc<dyn Guard>) {
        self.guards.insert(name.into(), guard);
    }

    /// Evaluate a named guard. A missing guard is logged and treated as a
    /// blocked transition (§7: `GuardNotFound` is surfaced, not fatal).
    pub async fn evaluate(&self, name: &str, input: &GuardInput<'_>) -> Result<bool> {
        match self.guards.get(name) {
            Some(guard) => Ok(guard.evaluate(input).await),
            None => {
                tracing::warn!(guard = name, "guard not found, blocking transition");
                Err(Error::GuardNotFound(name.to_string()))
            }
        }
    }
}

impl Default for GuardRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn input(entered_secs_ago: i64, duration: u64) -> (FsmContext, DateTime<Utc>) {
        let ctx = FsmContext::new();
        let entered_at = Utc::now() - ChronoDuration::seconds(entered_secs_ago);
        (ctx, entered_at)
    }

    #[tokio::test]
    async fn input_validator_and_work_checker_always_true() {
        let registry = GuardRegistry::with_defaults();
        let (ctx, entered_at) = input(0, 30);
        let gi = GuardInput { context: &ctx, state_entered_at: entered_at, state_duration_seconds: 30 };
        assert!(registry.evaluate("input_validator", &gi).await.unwrap());
        assert!(registry.evaluate("work_checker", &gi).await.unwrap());
    }

    #[tokio::test]
    async fn timeout_checker_fires_after_duration_elapses() {
        let registry = GuardRegistry::with_defaults();
        let (ctx, entered_at) = input(31, 30);
        let gi = GuardInput { context: &ctx, state_entered_at: entered_at, state_duration_seconds: 30 };
        assert!(registry.evaluate("timeout_checker", &gi).await.unwrap());

        let (ctx2, entered_at2) = input(5, 30);
        let gi2 = GuardInput { context: &ctx2, state_entered_at: entered_at2, state_duration_seconds: 30 };
        assert!(!registry.evaluate("timeout_checker", &gi2).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_guard_is_blocked_not_fatal() {
        let registry = GuardRegistry::with_defaults();
        let (ctx, entered_at) = input(0, 30);
        let gi = GuardInput { context: &ctx, state_entered_at: entered_at, state_duration_seconds: 30 };
        let err = registry.evaluate("nonexistent_guard", &gi).await.unwrap_err();
        assert!(matches!(err, Error::GuardNotFound(_)));
    }
}
