//! HTTP client for the knowledge/execution service ("HDN", §6).
//!
//! Every call goes through [`HdnClient::post_with_retry`], which applies the
//! exponential backoff policy of §5/§7 (1s -> 2s -> 4s, max 3 attempts,
//! treating any non-2xx as retryable) and attaches `X-Project-ID` when the
//! caller supplies a project ID.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::types::{
    BootstrapRequest, ExecuteResponse, InterpretContext, InterpretRequest, InterpretResponse,
    QueryResponse, SearchResponse,
};

/// Per-endpoint timeouts (§5): capabilities 30s, interpret 35s, execute
/// 300s, knowledge query 30s, working-memory 15s, concept extraction
/// configurable (default 120s, §6 `FSM_CONCEPT_EXTRACTION_TIMEOUT_SECONDS`).
#[derive(Debug, Clone, Copy)]
pub struct HdnTimeouts {
    pub capabilities: Duration,
    pub interpret: Duration,
    pub execute: Duration,
    pub knowledge_query: Duration,
    pub working_memory: Duration,
    pub concept_extraction: Duration,
}

impl Default for HdnTimeouts {
    fn default() -> Self {
        Self {
            capabilities: Duration::from_secs(30),
            interpret: Duration::from_secs(35),
            execute: Duration::from_secs(300),
            knowledge_query: Duration::from_secs(30),
            working_memory: Duration::from_secs(15),
            concept_extraction: Duration::from_secs(120),
        }
    }
}

pub struct HdnClient {
    http: Client,
    base_url: String,
    project_id: Option<String>,
    timeouts: HdnTimeouts,
}

impl HdnClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.into(),
            project_id: None,
            timeouts: HdnTimeouts::default(),
        }
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_timeouts(mut self, timeouts: HdnTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// POST with the retry-with-backoff policy of §5/§7: up to 3 attempts,
    /// 1s -> 2s -> 4s between them, any non-2xx or transport failure is
    /// retryable. Exhausting retries surfaces `Error::Transport`, which
    /// callers treat as a recoverable path, never a crash.
    async fn post_with_retry<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<String> {
        let url = self.url(path);
        let mut delay = Duration::from_secs(1);
        let mut last_err = String::new();

        for attempt in 1..=3 {
            let mut req = self.http.post(&url).timeout(timeout).json(body);
            if let Some(project_id) = &self.project_id {
                req = req.header("X-Project-ID", project_id);
            }
            match req.send().await {
                Ok(resp) if resp.status().is_success() => {
                    return resp.text().await.map_err(|e| {
                        Error::decode(path.to_string(), format!("reading response body: {e}"))
                    });
                }
                Ok(resp) => {
                    last_err = format!("status {}", resp.status());
                    if resp.status() == StatusCode::BAD_REQUEST {
                        // Not retryable: the request itself is malformed.
                        return Err(Error::transport(path.to_string(), last_err));
                    }
                }
                Err(e) => {
                    last_err = e.to_string();
                }
            }
            warn!(endpoint = path, attempt, error = %last_err, "HDN call failed, retrying");
            if attempt < 3 {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
        Err(Error::transport(path.to_string(), last_err))
    }

    pub async fn capabilities(&self) -> Result<Vec<String>> {
        let url = self.url("/capabilities");
        let resp = self
            .http
            .get(&url)
            .timeout(self.timeouts.capabilities)
            .send()
            .await
            .map_err(|e| Error::transport("/capabilities", e.to_string()))?;
        let value: Value = resp
            .json()
            .await
            .map_err(|e| Error::decode("/capabilities", e.to_string()))?;
        Ok(match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Value::Object(obj) => obj
                .get("capabilities")
                .and_then(|v| v.as_array())
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        })
    }

    /// Submit one LLM call through the gateway. On decode failure, returns
    /// a default (empty) response rather than erroring — callers fall back.
    pub async fn interpret(&self, input: &str, project_id: Option<&str>, session_id: Option<&str>) -> Result<InterpretResponse> {
        let body = InterpretRequest {
            input: input.to_string(),
            context: InterpretContext {
                origin: "arfsm-core".to_string(),
                project_id: project_id.map(str::to_string),
            },
            session_id: session_id.map(str::to_string),
        };
        let text = self.post_with_retry("/interpret", &body, self.timeouts.interpret).await?;
        Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
            debug!(error = %e, "interpret response did not decode, using empty fallback");
            InterpretResponse::default()
        }))
    }

    pub async fn execute(&self, workflow: &Value) -> Result<ExecuteResponse> {
        let text = self.post_with_retry("/interpret/execute", workflow, self.timeouts.execute).await?;
        Ok(serde_json::from_str(&text).unwrap_or_default())
    }

    pub async fn knowledge_query(&self, query: &Value) -> Result<QueryResponse> {
        let text = self
            .post_with_retry("/knowledge/query", query, self.timeouts.knowledge_query)
            .await?;
        Ok(serde_json::from_str(&text).unwrap_or_default())
    }

    pub async fn create_concept(&self, concept: &Value) -> Result<()> {
        self.post_with_retry("/knowledge/concepts", concept, self.timeouts.knowledge_query)
            .await?;
        Ok(())
    }

    pub async fn search_by_name(&self, name: &str, limit: u32) -> Result<SearchResponse> {
        let url = self.url(&format!(
            "/knowledge/search?name={}&limit={limit}",
            urlencode(name)
        ));
        self.get_search(&url).await
    }

    pub async fn search_by_domain(&self, domain: &str, limit: u32) -> Result<SearchResponse> {
        let url = self.url(&format!(
            "/knowledge/search?domain={}&limit={limit}",
            urlencode(domain)
        ));
        self.get_search(&url).await
    }

    async fn get_search(&self, url: &str) -> Result<SearchResponse> {
        let resp = self
            .http
            .get(url)
            .timeout(self.timeouts.knowledge_query)
            .send()
            .await
            .map_err(|e| Error::transport("/knowledge/search", e.to_string()))?;
        let text = resp
            .text()
            .await
            .map_err(|e| Error::decode("/knowledge/search", e.to_string()))?;
        Ok(serde_json::from_str(&text).unwrap_or_default())
    }

    pub async fn bootstrap(&self, req: &BootstrapRequest) -> Result<()> {
        self.post_with_retry(
            "/tools/tool_wiki_bootstrapper/invoke",
            req,
            self.timeouts.execute,
        )
        .await?;
        Ok(())
    }

    pub async fn working_memory_event(&self, session_id: &str, event: &Value) -> Result<()> {
        let path = format!("/state/session/{session_id}/working_memory/event");
        self.post_with_retry(&path, event, self.timeouts.working_memory).await?;
        Ok(())
    }

    pub async fn mcp_call(&self, tool: &str, args: &Value) -> Result<Value> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": uuid::Uuid::new_v4().to_string(),
            "method": "tools/call",
            "params": { "name": tool, "arguments": args },
        });
        let text = self
            .post_with_retry("/mcp", &body, self.timeouts.knowledge_query)
            .await?;
        serde_json::from_str(&text).map_err(|e| Error::decode("/mcp", e.to_string()))
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::types::extract_json_fragment;
    use super::*;

    #[test]
    fn urlencode_escapes_spaces_and_punctuation() {
        assert_eq!(urlencode("machine learning"), "machine%20learning");
        assert_eq!(urlencode("a-b_c.d~e"), "a-b_c.d~e");
    }

    #[test]
    fn extract_json_fragment_finds_embedded_array() {
        let text = "Sure, here are the facts:\n[{\"fact\": \"x\", \"usefulness\": 0.8}]\nHope that helps.";
        let value = extract_json_fragment(text).unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn extract_json_fragment_ignores_unbalanced_braces_in_prose() {
        let text = "note: { this is not json";
        assert!(extract_json_fragment(text).is_none());
    }

    #[test]
    fn interpret_response_extracts_from_result_first() {
        let response = InterpretResponse {
            tasks: vec![],
            message: "ignored".into(),
            result: Some(serde_json::json!({"ok": true})),
        };
        assert_eq!(response.extract_json(), Some(serde_json::json!({"ok": true})));
    }
}
