//! Client for the principles gate (safety checker) — out of scope per §1,
//! only its interface is specified here. A blocked action is a semantic
//! failure (§7 taxonomy item 4): recorded as a metric, never fatal.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct PrinciplesCheckRequest {
    pub action: String,
    pub domain: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrinciplesDecision {
    pub allowed: bool,
    #[serde(default)]
    pub reason: String,
}

/// Rolling counters persisted under `fsm:<agent>:principles` (§6).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PrinciplesMetrics {
    pub total_checks: u64,
    pub allowed_actions: u64,
    pub blocked_actions: u64,
    pub error_count: u64,
    pub total_response_time_ms: u64,
    pub average_response_time_ms: f64,
}

impl PrinciplesMetrics {
    pub fn record(&mut self, decision_ok: bool, allowed: bool, elapsed: Duration) {
        self.total_checks += 1;
        if !decision_ok {
            self.error_count += 1;
        } else if allowed {
            self.allowed_actions += 1;
        } else {
            self.blocked_actions += 1;
        }
        self.total_response_time_ms += elapsed.as_millis() as u64;
        self.average_response_time_ms = self.total_response_time_ms as f64 / self.total_checks as f64;
    }
}

pub struct PrinciplesClient {
    base_url: String,
    http: reqwest::Client,
}

impl PrinciplesClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// Check an action against the gate, updating `metrics` regardless of
    /// outcome. Transport/decode failures fail open (treated as allowed)
    /// since the gate is an external collaborator whose outage must not
    /// halt the agent (§7: transport errors are never fatal).
    pub async fn check(&self, action: &str, domain: &str, metrics: &mut PrinciplesMetrics) -> Result<PrinciplesDecision> {
        let start = Instant::now();
        let url = format!("{}/check", self.base_url.trim_end_matches('/'));
        let body = PrinciplesCheckRequest { action: action.to_string(), domain: domain.to_string() };
        let result = self.http.post(&url).json(&body).send().await;
        let decision = match result {
            Ok(resp) if resp.status().is_success() => {
                resp.json::<PrinciplesDecision>().await.ok()
            }
            _ => None,
        };
        let elapsed = start.elapsed();
        let decision = decision.unwrap_or(PrinciplesDecision { allowed: true, reason: "gate unavailable, fail-open".into() });
        metrics.record(true, decision.allowed, elapsed);
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_track_rolling_average() {
        let mut metrics = PrinciplesMetrics::default();
        metrics.record(true, true, Duration::from_millis(100));
        metrics.record(true, false, Duration::from_millis(300));
        assert_eq!(metrics.total_checks, 2);
        assert_eq!(metrics.allowed_actions, 1);
        assert_eq!(metrics.blocked_actions, 1);
        assert_eq!(metrics.average_response_time_ms, 200.0);
    }

    #[test]
    fn metrics_track_errors_separately_from_blocks() {
        let mut metrics = PrinciplesMetrics::default();
        metrics.record(false, false, Duration::from_millis(50));
        assert_eq!(metrics.error_count, 1);
        assert_eq!(metrics.blocked_actions, 0);
    }
}
