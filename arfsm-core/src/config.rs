//! Configuration loading (C2).
//!
//! Two layers: the declarative [`FsmConfig`] document (states, transitions,
//! guards, action bindings, performance knobs — §4.1) parsed from JSON, and
//! [`RuntimeConfig`], which layers the environment variables of §6 over
//! struct defaults. `RuntimeConfig::parse()` doubles as the binary's CLI
//! parser via `clap`'s `env` attribute, so the same variable can be set by
//! flag or by environment.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A single state's declaration within the FSM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    pub name: String,
    /// Per-state timeout, consumed by the `timeout_checker` guard.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Actions executed, in order, on every entry into this state.
    #[serde(default)]
    pub entry_actions: Vec<ActionConfig>,
    /// `event name -> transition` table.
    #[serde(default)]
    pub on: HashMap<String, TransitionConfig>,
}

/// A single entry action binding: which handler module to invoke and with
/// what static parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Routing key resolved against the action registry (C3).
    pub module: String,
    /// Logged label for this action instance.
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub params: HashMap<String, Value>,
}

/// Declares the next state for an event, optionally gated by a named guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionConfig {
    pub next_state: String,
    #[serde(default)]
    pub guard: Option<String>,
}

/// Declares an event the engine subscribes to: its bus subject, an optional
/// JSON-schema-shaped payload description, and an optional periodic
/// interval (for timer-synthesised events).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    pub name: String,
    pub bus_subject: String,
    #[serde(default)]
    pub payload_schema: Value,
    #[serde(default)]
    pub interval_seconds: Option<u64>,
}

/// Performance knobs controlling event-loop pacing (§4.1, §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub event_loop_sleep_ms: u64,
    pub timer_interval_seconds: u64,
    pub max_events_per_cycle: usize,
    pub state_transition_delay_ms: u64,
    pub idle_sleep_ms: u64,
    pub post_processing_sleep_ms: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            event_loop_sleep_ms: 1_000,
            timer_interval_seconds: 30,
            max_events_per_cycle: 10,
            state_transition_delay_ms: 500,
            idle_sleep_ms: 2_000,
            post_processing_sleep_ms: 50,
        }
    }
}

impl PerformanceConfig {
    pub fn state_transition_delay(&self) -> Duration {
        Duration::from_millis(self.state_transition_delay_ms)
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }

    pub fn post_processing_sleep(&self) -> Duration {
        Duration::from_millis(self.post_processing_sleep_ms)
    }
}

/// The declarative FSM configuration document (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsmConfig {
    pub initial_state: String,
    pub states: Vec<StateConfig>,
    /// Named guards this document expects to exist in the guard registry.
    #[serde(default)]
    pub guards: Vec<String>,
    #[serde(default)]
    pub events: Vec<EventConfig>,
    /// Store-key templates parameterised by agent ID, e.g.
    /// `"state": "fsm:%s:state"`.
    #[serde(default)]
    pub store_keys: HashMap<String, String>,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

impl FsmConfig {
    /// Parse a configuration document from a JSON string.
    ///
    /// Parse failure is the one fatal configuration error (§7 taxonomy
    /// item 5); everything else downstream tolerates missing data.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: FsmConfig = serde_json::from_str(text)
            .map_err(|e| Error::config(format!("failed to parse FSM config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and parse a configuration document from a file path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::config(format!("failed to read {}: {e}", path.as_ref().display())))?;
        Self::from_json(&text)
    }

    /// Basic structural validation performed once at load time.
    fn validate(&self) -> Result<()> {
        if self.states.is_empty() {
            return Err(Error::config("FSM config declares no states"));
        }
        if !self.states.iter().any(|s| s.name == self.initial_state) {
            return Err(Error::config(format!(
                "initial_state '{}' is not among the declared states",
                self.initial_state
            )));
        }
        Ok(())
    }

    pub fn state(&self, name: &str) -> Option<&StateConfig> {
        self.states.iter().find(|s| s.name == name)
    }

    /// Store key template resolution: substitutes the lone `%s` placeholder
    /// with the agent ID or domain, matching the templates in §6.
    pub fn store_key(&self, template_name: &str, param: &str) -> Option<String> {
        self.store_keys
            .get(template_name)
            .map(|tmpl| tmpl.replacen("%s", param, 1))
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// The environment-variable layer of §6, doubling as the `arfsm-agent`
/// binary's CLI surface (`clap`'s `env` attribute reads the same variable a
/// flag would override).
#[derive(Debug, Clone, clap::Parser, Serialize, Deserialize)]
#[command(name = "arfsm-agent", about = "Autonomous reasoning FSM agent")]
pub struct RuntimeConfig {
    /// Path to the declarative FSM config document.
    #[arg(long, env = "FSM_CONFIG_PATH", default_value = "fsm.json")]
    pub config_path: String,

    /// Agent identity used in store-key templates and bus envelopes.
    #[arg(long, env = "FSM_AGENT_ID", default_value = "agent-1")]
    pub agent_id: String,

    #[arg(long, env = "HDN_URL", default_value = "http://localhost:8080")]
    pub hdn_url: String,

    #[arg(long, env = "WEAVIATE_URL", default_value = "http://localhost:8080")]
    pub weaviate_url: String,

    #[arg(long, env = "PRINCIPLES_URL", default_value = "http://localhost:8081")]
    pub principles_url: String,

    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1/")]
    pub redis_url: String,

    #[arg(long, env = "FSM_BOOTSTRAP_SEEDS", value_delimiter = ',', default_value = "")]
    pub bootstrap_seeds: Vec<String>,

    #[arg(long, env = "FSM_BOOTSTRAP_MAX_DEPTH", default_value_t = 1)]
    pub bootstrap_max_depth: u32,

    #[arg(long, env = "FSM_BOOTSTRAP_MAX_NODES", default_value_t = 100)]
    pub bootstrap_max_nodes: u32,

    #[arg(long, env = "FSM_BOOTSTRAP_RPM", default_value_t = 12)]
    pub bootstrap_rpm: u32,

    #[arg(long, env = "FSM_BOOTSTRAP_SEED_BATCH", default_value_t = 5)]
    pub bootstrap_seed_batch: usize,

    #[arg(long, env = "FSM_BOOTSTRAP_COOLDOWN_HOURS", default_value_t = 24)]
    pub bootstrap_cooldown_hours: i64,

    #[arg(long, env = "FSM_MAX_ACTIVE_GOALS", default_value_t = 1)]
    pub max_active_goals: usize,

    #[arg(long, env = "FSM_MAX_CONCURRENT_HYP_TESTS", default_value_t = 1)]
    pub max_concurrent_hypothesis_tests: usize,

    #[arg(long, env = "FSM_DISABLE_LLM_GOAL_SELECTION")]
    pub disable_llm_goal_selection: bool,

    #[arg(long, env = "FSM_LLM_REQUEST_DELAY_MS", default_value_t = 5_000)]
    pub llm_request_delay_ms: u64,

    #[arg(long, env = "FSM_CONCEPT_EXTRACTION_TIMEOUT_SECONDS", default_value_t = 120)]
    pub concept_extraction_timeout_seconds: u64,
}

impl RuntimeConfig {
    /// Build a config from the process environment without touching argv —
    /// used by tests and by embedders that assemble their own CLI.
    pub fn from_env() -> Self {
        Self {
            config_path: std::env::var("FSM_CONFIG_PATH").unwrap_or_else(|_| "fsm.json".into()),
            agent_id: std::env::var("FSM_AGENT_ID").unwrap_or_else(|_| "agent-1".into()),
            hdn_url: std::env::var("HDN_URL").unwrap_or_else(|_| "http://localhost:8080".into()),
            weaviate_url: std::env::var("WEAVIATE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            principles_url: std::env::var("PRINCIPLES_URL")
                .unwrap_or_else(|_| "http://localhost:8081".into()),
            redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".into()),
            bootstrap_seeds: std::env::var("FSM_BOOTSTRAP_SEEDS")
                .map(|v| v.split(',').filter(|s| !s.is_empty()).map(String::from).collect())
                .unwrap_or_default(),
            bootstrap_max_depth: parse_env_or("FSM_BOOTSTRAP_MAX_DEPTH", 1),
            bootstrap_max_nodes: parse_env_or("FSM_BOOTSTRAP_MAX_NODES", 100),
            bootstrap_rpm: parse_env_or("FSM_BOOTSTRAP_RPM", 12),
            bootstrap_seed_batch: parse_env_or("FSM_BOOTSTRAP_SEED_BATCH", 5),
            bootstrap_cooldown_hours: parse_env_or("FSM_BOOTSTRAP_COOLDOWN_HOURS", 24),
            max_active_goals: parse_env_or("FSM_MAX_ACTIVE_GOALS", 1),
            max_concurrent_hypothesis_tests: parse_env_or("FSM_MAX_CONCURRENT_HYP_TESTS", 1),
            disable_llm_goal_selection: env_flag("FSM_DISABLE_LLM_GOAL_SELECTION"),
            llm_request_delay_ms: parse_env_or("FSM_LLM_REQUEST_DELAY_MS", 5_000),
            concept_extraction_timeout_seconds: parse_env_or(
                "FSM_CONCEPT_EXTRACTION_TIMEOUT_SECONDS",
                120,
            ),
        }
    }

    pub fn llm_request_delay(&self) -> Duration {
        Duration::from_millis(self.llm_request_delay_ms)
    }

    pub fn concept_extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.concept_extraction_timeout_seconds)
    }

    pub fn bootstrap_cooldown(&self) -> Duration {
        Duration::from_secs((self.bootstrap_cooldown_hours.max(0) as u64) * 3_600)
    }
}

fn parse_env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "initial_state": "idle",
        "states": [
            { "name": "idle", "on": { "wake": { "next_state": "thinking" } } },
            { "name": "thinking", "timeout_ms": 30000, "on": { "timeout": { "next_state": "idle", "guard": "timeout_checker" } } }
        ],
        "guards": ["timeout_checker", "input_validator", "work_checker"],
        "store_keys": { "state": "fsm:%s:state", "queue": "fsm:%s:queue" }
    }"#;

    #[test]
    fn parses_minimal_config() {
        let config = FsmConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.initial_state, "idle");
        assert_eq!(config.states.len(), 2);
        assert_eq!(config.performance.idle_sleep_ms, 2_000);
    }

    #[test]
    fn rejects_unknown_initial_state() {
        let bad = SAMPLE.replace("\"idle\",\n        \"states\"", "\"missing\",\n        \"states\"");
        assert!(FsmConfig::from_json(&bad).is_err());
    }

    #[test]
    fn resolves_store_key_templates() {
        let config = FsmConfig::from_json(SAMPLE).unwrap();
        assert_eq!(
            config.store_key("state", "agent-7"),
            Some("fsm:agent-7:state".to_string())
        );
    }

    #[test]
    fn runtime_config_from_env_applies_defaults() {
        std::env::remove_var("FSM_MAX_ACTIVE_GOALS");
        let runtime = RuntimeConfig::from_env();
        assert_eq!(runtime.max_active_goals, 1);
        assert_eq!(runtime.hdn_url, "http://localhost:8080");
    }
}
