//! Event-bus transport abstraction (§6): one subscription worker per bus
//! subject (§5) translates incoming messages into enqueued events. This is
//! kept separate from [`StoreClient`](super::client::StoreClient) because
//! pub/sub subscription needs its own connection lifecycle, unlike the
//! request/response store operations.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::error::{Error, Result};

use super::client::BusMessage;

#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, subject: &str, payload: &str) -> Result<()>;
    /// Subscribe to a subject; each call gets its own receiver so multiple
    /// workers (the subscription worker and, e.g., a monitoring sidecar)
    /// can listen independently.
    async fn subscribe(&self, subject: &str) -> Result<mpsc::Receiver<BusMessage>>;
}

/// Redis-backed bus using a dedicated pub/sub connection per process.
pub struct RedisBus {
    client: redis::Client,
}

impl RedisBus {
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| Error::store(format!("invalid redis url: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EventBus for RedisBus {
    async fn publish(&self, subject: &str, payload: &str) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::store(e.to_string()))?;
        conn.publish::<_, _, ()>(subject, payload).await.map_err(|e| Error::store(e.to_string()))
    }

    async fn subscribe(&self, subject: &str) -> Result<mpsc::Receiver<BusMessage>> {
        use futures::StreamExt;

        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| Error::store(e.to_string()))?;
        pubsub
            .subscribe(subject)
            .await
            .map_err(|e| Error::store(e.to_string()))?;

        let (tx, rx) = mpsc::channel(256);
        let subject_owned = subject.to_string();
        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                if tx
                    .send(BusMessage { channel: subject_owned.clone(), payload })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

/// In-process bus for tests and for embedding the engine without a live
/// Redis instance. Backed by one broadcast channel per subject.
#[derive(Default)]
pub struct InMemoryBus {
    channels: Mutex<HashMap<String, broadcast::Sender<BusMessage>>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn channel(&self, subject: &str) -> broadcast::Sender<BusMessage> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(subject.to_string())
            .or_insert_with(|| broadcast::channel(256).0)
            .clone()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, subject: &str, payload: &str) -> Result<()> {
        // No subscribers yet is not an error — matches Redis pub/sub
        // semantics where publishing to a channel with no listeners is a
        // no-op.
        let _ = self.channel(subject).send(BusMessage { channel: subject.to_string(), payload: payload.to_string() });
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<mpsc::Receiver<BusMessage>> {
        let mut broadcast_rx = self.channel(subject).subscribe();
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            while let Ok(msg) = broadcast_rx.recv().await {
                if tx.send(msg).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_bus_delivers_to_subscriber() {
        let bus = InMemoryBus::new();
        let mut rx = bus.subscribe("agi.events.input").await.unwrap();
        bus.publish("agi.events.input", "{\"head\":\"OpenAI\"}").await.unwrap();
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.channel, "agi.events.input");
        assert_eq!(msg.payload, "{\"head\":\"OpenAI\"}");
    }

    #[tokio::test]
    async fn publish_with_no_subscriber_is_not_an_error() {
        let bus = InMemoryBus::new();
        bus.publish("agi.events.fsm.transition", "{}").await.unwrap();
    }
}
