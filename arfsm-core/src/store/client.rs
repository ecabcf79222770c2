//! [`StoreClient`] trait: the shared-store operations the FSM, autonomy
//! loop, and reasoning pipeline need (§6) — lists, sets, hashes, simple
//! key/value with TTL, and pub/sub. Implemented by [`super::redis_store::RedisStore`]
//! for production and [`super::memory_store::MemoryStore`] for tests.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// A message received from a subscribed pub/sub channel.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub channel: String,
    pub payload: String,
}

#[async_trait]
pub trait StoreClient: Send + Sync {
    // -- key/value --
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;

    // -- lists (event queues) --
    async fn list_push(&self, key: &str, value: &str) -> Result<()>;
    /// Blocking pop with a timeout; returns `None` on timeout rather than erroring.
    async fn list_pop(&self, key: &str, timeout: Duration) -> Result<Option<String>>;
    async fn list_len(&self, key: &str) -> Result<usize>;
    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;

    // -- sets (e.g. explored-concept membership) --
    async fn set_add(&self, key: &str, member: &str) -> Result<bool>;
    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool>;
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;

    // -- hashes (structured records: beliefs, goals, traces) --
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()>;
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>>;
    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>>;
    async fn hash_delete(&self, key: &str, field: &str) -> Result<()>;

    // -- pub/sub (event bus transport) --
    async fn publish(&self, channel: &str, payload: &str) -> Result<()>;
}
