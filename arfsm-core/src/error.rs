//! Crate-wide error taxonomy.
//!
//! Mirrors the error handling design: transport/store failures are retryable
//! and never fatal, decode failures degrade to an empty result, configuration
//! failures are fatal only at startup, and semantic failures (principles gate
//! blocks, "not worth learning" judgements) are recorded as typed outcomes
//! rather than propagated as hard errors.

use thiserror::Error;

/// Result type alias using this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while operating the FSM, the autonomy loop, or the
/// reasoning/knowledge-growth pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// The shared store (list/set/hash/pub-sub) failed or returned an
    /// unexpected shape. Retryable.
    #[error("store error: {0}")]
    Store(String),

    /// An outbound HTTP call to HDN, the principles gate, or the event bus
    /// failed at the transport level. Retryable with exponential backoff.
    #[error("transport error calling {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    /// A downstream response could not be decoded (malformed JSON, missing
    /// fields). The caller treats this as an empty result and falls back.
    #[error("decode error from {source_name}: {message}")]
    Decode { source_name: String, message: String },

    /// Operation exceeded its configured timeout.
    #[error("operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Declarative FSM configuration could not be parsed or failed
    /// validation. Fatal only at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// A transition referenced a guard name not present in the guard
    /// registry. Logged; the transition is blocked as if the guard failed.
    #[error("guard not found: {0}")]
    GuardNotFound(String),

    /// A transition referenced an action module not present in the action
    /// registry. Logged; the action is treated as a no-op with empty delta.
    #[error("action module not found: {0}")]
    ActionNotFound(String),

    /// The principles gate blocked an action. Recorded as a metric, not
    /// surfaced as a crash; the caller retries later or abandons the path.
    #[error("blocked by principles gate: {0}")]
    PrinciplesBlocked(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal invariant violation — should not occur in normal operation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Construct a [`Error::Store`] error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Construct a [`Error::Transport`] error.
    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Construct a [`Error::Decode`] error.
    pub fn decode(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Construct a [`Error::Timeout`] error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Construct a [`Error::Config`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error represents a transport-level failure that is
    /// eligible for the retry-with-backoff policy of §5/§7.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Store(_) | Error::Transport { .. } | Error::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(Error::store("connection reset").is_retryable());
        assert!(Error::transport("/interpret", "connection refused").is_retryable());
        assert!(Error::timeout(5_000).is_retryable());
        assert!(!Error::config("missing field").is_retryable());
        assert!(!Error::GuardNotFound("timeout_checker".into()).is_retryable());
    }

    #[test]
    fn display_messages_are_human_readable() {
        let err = Error::decode("knowledge/query", "unexpected array");
        assert!(err.to_string().contains("knowledge/query"));
    }
}
