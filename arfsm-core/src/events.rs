//! Canonical event-bus types (§6): the envelope every inbound event is
//! parsed into, plus the two records the FSM publishes on every transition.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The canonical envelope every bus message is parsed into before it's
/// queued (§6). Timer-synthesised events fabricate one with
/// `source = "fsm:<agent>"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub context: HashMap<String, Value>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityMetadata {
    #[serde(default)]
    pub sensitivity: Option<String>,
}

impl EventEnvelope {
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, payload: Value) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            context: HashMap::new(),
            payload,
            security: None,
        }
    }

    /// Fabricate a timer-synthesised event envelope (§6).
    pub fn timer(agent_id: &str, event_type: impl Into<String>) -> Self {
        Self::new(event_type, format!("fsm:{agent_id}"), Value::Null)
    }
}

/// Published on `agi.events.fsm.transition` after every FSM transition (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub agent_id: String,
    pub from: String,
    pub to: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub context: HashMap<String, Value>,
}

/// A single reasoning/decision/action/observation moment, published on
/// `agi.events.fsm.thought` for monitoring UIs (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtRecord {
    pub agent_id: String,
    pub session_id: String,
    #[serde(rename = "type")]
    pub thought_type: ThoughtType,
    pub state: String,
    pub goal: String,
    pub thought: String,
    pub confidence: f64,
    #[serde(default)]
    pub tool_used: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub context: HashMap<String, Value>,
    pub metadata: ThoughtMetadata,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtType {
    Thinking,
    Decision,
    Action,
    Observation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtMetadata {
    pub state_entry_time: DateTime<Utc>,
    pub state_duration_ms: i64,
}

/// A category tag for activity-log entries (§7): every action handler
/// logs one of these alongside its human-readable message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    StateChange,
    Action,
    Learning,
    Hypothesis,
    Decision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub category: ActivityCategory,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityLogEntry {
    pub fn new(category: ActivityCategory, message: impl Into<String>) -> Self {
        Self { category, message: message.into(), timestamp: Utc::now() }
    }
}
