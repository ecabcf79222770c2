//! The FSM's in-memory scratchpad (§3, §9 design notes).
//!
//! The source mutates one untyped context map from everywhere, and every
//! field access has to tolerate type mismatches. Here that's re-architected
//! as a pair: an immutable-by-convention [`DomainContext`] of strongly
//! typed fields accessed by every handler, plus an auxiliary free-form
//! `extra` map for experimental keys a particular action binding wants to
//! stash without a schema change. Transitions copy-on-write the whole
//! struct; handlers return a [`ContextDelta`] that the dispatcher applies
//! rather than mutating shared state directly.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Strongly typed fields every handler can rely on, plus an `extra` bag for
/// anything that hasn't earned a typed field yet.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FsmContext {
    #[serde(default)]
    pub current_domain: Option<String>,
    #[serde(default)]
    pub current_goal: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub current_workflow_id: Option<String>,
    /// Read but never written by the handlers in this specification (§9
    /// open question); carried through as an allowed no-op field.
    #[serde(default)]
    pub last_bootstrap_ok: Option<bool>,
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

impl FsmContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type-tolerant read of an `extra` field as a string: the source's
    /// context map access must never panic on a type mismatch (§4.1).
    pub fn extra_str(&self, key: &str) -> Option<String> {
        match self.extra.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn extra_f64(&self, key: &str) -> Option<f64> {
        match self.extra.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn extra_bool(&self, key: &str) -> Option<bool> {
        match self.extra.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn apply(&mut self, delta: ContextDelta) {
        if let Some(v) = delta.current_domain {
            self.current_domain = Some(v);
        }
        if let Some(v) = delta.current_goal {
            self.current_goal = v;
        }
        if let Some(v) = delta.current_workflow_id {
            self.current_workflow_id = Some(v);
        }
        for (k, v) in delta.extra {
            self.extra.insert(k, v);
        }
    }
}

/// What a handler wants to change about the context, returned rather than
/// mutated in place so all mutation funnels through the event-queue worker
/// (§9 design note: "shared context mutation races").
#[derive(Debug, Clone, Default)]
pub struct ContextDelta {
    pub current_domain: Option<String>,
    /// `Some(None)` clears the current goal; `None` leaves it untouched.
    pub current_goal: Option<Option<String>>,
    pub current_workflow_id: Option<String>,
    pub extra: HashMap<String, Value>,
}

impl ContextDelta {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Persisted snapshot: `{state, context, updated}` (§4.1, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub state: String,
    pub context: FsmContext,
    pub updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_accessors_tolerate_type_mismatch() {
        let mut ctx = FsmContext::new();
        ctx.extra.insert("count".into(), Value::String("3".into()));
        assert_eq!(ctx.extra_f64("count"), Some(3.0));
        ctx.extra.insert("flag".into(), Value::Null);
        assert_eq!(ctx.extra_bool("flag"), None);
    }

    #[test]
    fn apply_delta_updates_only_set_fields() {
        let mut ctx = FsmContext::new();
        ctx.current_domain = Some("AI".into());
        let delta = ContextDelta { current_goal: Some(Some("g1".into())), ..Default::default() };
        ctx.apply(delta);
        assert_eq!(ctx.current_domain, Some("AI".into()));
        assert_eq!(ctx.current_goal, Some("g1".into()));
    }

    #[test]
    fn state_snapshot_round_trips() {
        let snapshot = StateSnapshot { state: "thinking".into(), context: FsmContext::new(), updated: Utc::now() };
        let text = serde_json::to_string(&snapshot).unwrap();
        let parsed: StateSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.state, "thinking");
    }
}
