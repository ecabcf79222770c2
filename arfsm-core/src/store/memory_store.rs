//! In-process [`StoreClient`] used by tests and by examples that don't
//! want a live Redis instance.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::Result;

use super::client::StoreClient;

#[derive(Default)]
struct Inner {
    strings: HashMap<String, String>,
    lists: HashMap<String, VecDeque<String>>,
    sets: HashMap<String, HashSet<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
}

/// A `Mutex`-guarded in-memory store. TTLs are accepted but not enforced —
/// fine for the short-lived processes that use it.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.lock().unwrap().strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.lock().unwrap().strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, _ttl: Duration) -> Result<()> {
        self.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.strings.remove(key);
        inner.lists.remove(key);
        inner.sets.remove(key);
        inner.hashes.remove(key);
        Ok(())
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<()> {
        self.inner.lock().unwrap().lists.entry(key.to_string()).or_default().push_back(value.to_string());
        Ok(())
    }

    async fn list_pop(&self, key: &str, _timeout: Duration) -> Result<Option<String>> {
        Ok(self.inner.lock().unwrap().lists.get_mut(key).and_then(|q| q.pop_front()))
    }

    async fn list_len(&self, key: &str) -> Result<usize> {
        Ok(self.inner.lock().unwrap().lists.get(key).map(|q| q.len()).unwrap_or(0))
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        let Some(list) = inner.lists.get(key) else { return Ok(Vec::new()) };
        let len = list.len() as isize;
        let norm = |i: isize| -> usize {
            if i < 0 { (len + i).max(0) as usize } else { i.min(len) as usize }
        };
        let (start, stop) = (norm(start), norm(stop));
        Ok(list.iter().skip(start).take(stop.saturating_sub(start) + 1).cloned().collect())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        Ok(self.inner.lock().unwrap().sets.entry(key.to_string()).or_default().insert(member.to_string()))
    }

    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool> {
        Ok(self.inner.lock().unwrap().sets.get(key).map(|s| s.contains(member)).unwrap_or(false))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.inner.lock().unwrap().sets.get(key).map(|s| s.iter().cloned().collect()).unwrap_or_default())
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.inner.lock().unwrap().hashes.entry(key.to_string()).or_default().insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self.inner.lock().unwrap().hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>> {
        Ok(self.inner.lock().unwrap().hashes.get(key).map(|h| h.iter().map(|(k, v)| (k.clone(), v.clone())).collect()).unwrap_or_default())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<()> {
        if let Some(h) = self.inner.lock().unwrap().hashes.get_mut(key) {
            h.remove(field);
        }
        Ok(())
    }

    async fn publish(&self, _channel: &str, _payload: &str) -> Result<()> {
        // No subscribers in the in-memory store; publishing is a no-op.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_push_and_pop_round_trip() {
        let store = MemoryStore::new();
        store.list_push("queue", "event-1").await.unwrap();
        store.list_push("queue", "event-2").await.unwrap();
        assert_eq!(store.list_len("queue").await.unwrap(), 2);
        assert_eq!(store.list_pop("queue", Duration::from_millis(0)).await.unwrap(), Some("event-1".into()));
    }

    #[tokio::test]
    async fn set_add_reports_novelty() {
        let store = MemoryStore::new();
        assert!(store.set_add("explored", "concept-a").await.unwrap());
        assert!(!store.set_add("explored", "concept-a").await.unwrap());
        assert!(store.set_is_member("explored", "concept-a").await.unwrap());
    }

    #[tokio::test]
    async fn hash_roundtrips_fields() {
        let store = MemoryStore::new();
        store.hash_set("belief:1", "statement", "water boils at 100C").await.unwrap();
        store.hash_set("belief:1", "confidence", "0.9").await.unwrap();
        assert_eq!(store.hash_get("belief:1", "confidence").await.unwrap(), Some("0.9".into()));
        assert_eq!(store.hash_get_all("belief:1").await.unwrap().len(), 2);
    }
}
