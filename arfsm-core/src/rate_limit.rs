//! A single token-bucket gatekeeper in front of every call into HDN's LLM
//! gateway (§9 design note).
//!
//! The three independent sleep sites the pipeline would otherwise need
//! (concept discovery, goal re-ranking, fact extraction) are consolidated
//! behind one [`RateLimiter`] so the effective requests-per-minute ceiling
//! is enforced globally rather than per call site.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Shared, cloneable rate limiter. Cheap to clone — the bucket state lives
/// behind an `Arc<Mutex<_>>`.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Bucket>>,
}

struct Bucket {
    interval: Duration,
    next_available: Instant,
}

impl RateLimiter {
    /// Construct a limiter admitting at most `requests_per_minute` calls
    /// per minute, spaced evenly.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        let interval = Duration::from_secs_f64(60.0 / rpm as f64);
        Self { inner: Arc::new(Mutex::new(Bucket { interval, next_available: Instant::now() })) }
    }

    /// Built directly from the minimum delay between requests, matching
    /// the `FSM_LLM_REQUEST_DELAY_MS` knob.
    pub fn from_delay(delay: Duration) -> Self {
        Self { inner: Arc::new(Mutex::new(Bucket { interval: delay, next_available: Instant::now() })) }
    }

    /// Block until the next slot opens, then reserve it.
    pub async fn acquire(&self) {
        let wait = {
            let mut bucket = self.inner.lock().await;
            let now = Instant::now();
            let wait = bucket.next_available.saturating_duration_since(now);
            bucket.next_available = now.max(bucket.next_available) + bucket.interval;
            wait
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spaces_out_successive_acquisitions() {
        let limiter = RateLimiter::from_delay(Duration::from_millis(100));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(Instant::now().saturating_duration_since(start) >= Duration::from_millis(200));
    }
}
