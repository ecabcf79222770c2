//! Wire types for the HDN (knowledge/execution service) HTTP contracts (§6).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST /interpret` request body.
#[derive(Debug, Clone, Serialize)]
pub struct InterpretRequest {
    pub input: String,
    pub context: InterpretContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct InterpretContext {
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct InterpretTask {
    #[serde(default)]
    pub description: String,
}

/// `POST /interpret` response. The core must extract JSON payloads from
/// either `message` or a task's `description` — the gateway doesn't
/// guarantee which field carries the structured answer.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct InterpretResponse {
    #[serde(default)]
    pub tasks: Vec<InterpretTask>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: Option<Value>,
}

impl InterpretResponse {
    /// Find the first JSON array or object embedded anywhere in the
    /// response text, trying `result`, then each task description, then
    /// `message` in that order.
    pub fn extract_json(&self) -> Option<Value> {
        if let Some(v) = &self.result {
            return Some(v.clone());
        }
        for task in &self.tasks {
            if let Some(v) = extract_json_fragment(&task.description) {
                return Some(v);
            }
        }
        extract_json_fragment(&self.message)
    }
}

/// Pull the first balanced `[...]` or `{...}` fragment out of free-form
/// text and parse it. LLM responses routinely wrap JSON in prose or code
/// fences; this is the tolerant extraction the §7 decode-error policy
/// expects (malformed/missing JSON degrades to `None`, never an error).
pub fn extract_json_fragment(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    for (start, &b) in bytes.iter().enumerate() {
        let (open, close) = match b {
            b'[' => (b'[', b']'),
            b'{' => (b'{', b'}'),
            _ => continue,
        };
        let mut depth = 0i32;
        let mut in_string = false;
        let mut escape = false;
        for (i, &c) in bytes[start..].iter().enumerate() {
            if in_string {
                if escape {
                    escape = false;
                } else if c == b'\\' {
                    escape = true;
                } else if c == b'"' {
                    in_string = false;
                }
                continue;
            }
            match c {
                b'"' => in_string = true,
                c if c == open => depth += 1,
                c if c == close => {
                    depth -= 1;
                    if depth == 0 {
                        let candidate = &text[start..start + i + 1];
                        if let Ok(v) = serde_json::from_str::<Value>(candidate) {
                            return Some(v);
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// `POST /interpret/execute` response.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExecuteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A single row returned by `POST /knowledge/query`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GraphRow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default, rename = "Props")]
    pub props: HashMap<String, Value>,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub relations: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct QueryResponse {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub results: Vec<GraphRow>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SearchResponse {
    #[serde(default)]
    pub concepts: Vec<GraphRow>,
    #[serde(default)]
    pub count: usize,
}

/// `POST /tools/tool_wiki_bootstrapper/invoke` request body.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapRequest {
    pub seeds: Vec<String>,
    pub max_depth: u32,
    pub max_nodes: u32,
    pub rpm: u32,
    pub domain: String,
    pub jitter_ms: u64,
    pub min_confidence: f64,
}
