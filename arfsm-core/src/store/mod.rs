//! The shared store abstraction (§6): lists for event queues, sets for
//! membership checks, hashes for structured records, simple key/value with
//! TTL, and pub/sub for the event bus transport.

mod bus;
mod client;
mod memory_store;
mod redis_store;

pub use bus::{EventBus, InMemoryBus, RedisBus};
pub use client::{BusMessage, StoreClient};
pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;
