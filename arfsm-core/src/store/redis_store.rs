//! Redis-backed [`StoreClient`].
//!
//! Uses a `ConnectionManager` so transient connection loss is retried
//! transparently by the driver rather than surfacing as an error on every
//! call; genuine failures still map to [`Error::Store`].

use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use redis::aio::ConnectionManager;
use std::time::Duration;

use crate::error::{Error, Result};

use super::client::StoreClient;

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(|e| Error::store(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::store(format!("failed to connect to redis: {e}")))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl StoreClient for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(|e| Error::store(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set(key, value).await.map_err(|e| Error::store(e.to_string()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| Error::store(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del(key).await.map_err(|e| Error::store(e.to_string()))
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.rpush(key, value).await.map_err(|e| Error::store(e.to_string()))
    }

    async fn list_pop(&self, key: &str, timeout: Duration) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let result: Option<(String, String)> = conn
            .blpop(key, timeout.as_secs_f64())
            .await
            .map_err(|e| Error::store(e.to_string()))?;
        Ok(result.map(|(_, value)| value))
    }

    async fn list_len(&self, key: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        conn.llen(key).await.map_err(|e| Error::store(e.to_string()))
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.lrange(key, start as isize, stop as isize)
            .await
            .map_err(|e| Error::store(e.to_string()))
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let added: i64 = conn.sadd(key, member).await.map_err(|e| Error::store(e.to_string()))?;
        Ok(added > 0)
    }

    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.sismember(key, member).await.map_err(|e| Error::store(e.to_string()))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.smembers(key).await.map_err(|e| Error::store(e.to_string()))
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.hset(key, field, value).await.map_err(|e| Error::store(e.to_string()))
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.hget(key, field).await.map_err(|e| Error::store(e.to_string()))
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>> {
        let mut conn = self.conn.clone();
        conn.hgetall(key).await.map_err(|e| Error::store(e.to_string()))
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.hdel(key, field).await.map_err(|e| Error::store(e.to_string()))
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.publish(channel, payload).await.map_err(|e| Error::store(e.to_string()))
    }
}
