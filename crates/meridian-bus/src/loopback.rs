use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use meridian_core::error::{MeridianError, Result};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::bus::{timeout_error, Bus, Chunk, ChunkStream, Message, Subscription};
use crate::wildcard;

type Sender = mpsc::UnboundedSender<Message>;

/// In-process `Bus` implementation over `tokio` channels, used by
/// higher-level crates' tests so they don't need a running broker.
/// Matches `NatsBus`'s subject-wildcard semantics exactly (spec §4.1).
#[derive(Clone, Default)]
pub struct LoopbackBus {
    subscribers: Arc<DashMap<String, Vec<Sender>>>,
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn deliver(&self, subject: &str, payload: &Value, reply_subject: Option<&str>) {
        for entry in self.subscribers.iter() {
            if wildcard::matches(entry.key(), subject) {
                let msg = Message {
                    subject: subject.to_string(),
                    payload: payload.clone(),
                    reply_subject: reply_subject.map(String::from),
                };
                for tx in entry.value() {
                    let _ = tx.send(msg.clone());
                }
            }
        }
    }
}

#[async_trait]
impl Bus for LoopbackBus {
    async fn publish(&self, subject: &str, payload: Value) -> Result<()> {
        self.deliver(subject, &payload, None);
        Ok(())
    }

    async fn request(&self, subject: &str, payload: Value, timeout: Duration) -> Result<Value> {
        let has_responder = self
            .subscribers
            .iter()
            .any(|e| wildcard::matches(e.key(), subject));
        if !has_responder {
            return Err(MeridianError::NoResponders {
                subject: subject.to_string(),
            });
        }

        let reply_subject = format!("_inbox.req.{}", Uuid::now_v7());
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.subscribers
            .entry(reply_subject.clone())
            .or_default()
            .push(tx);

        self.deliver(subject, &payload, Some(&reply_subject));

        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(msg)) => Ok(msg.payload),
            Ok(None) => Err(MeridianError::Disconnected),
            Err(_) => Err(timeout_error(timeout)),
        }
    }

    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .entry(subject.to_string())
            .or_default()
            .push(tx);
        Ok(Box::new(LoopbackSubscription { rx }))
    }

    async fn stream(&self, subject: &str, payload: Value) -> Result<Box<dyn ChunkStream>> {
        let reply_subject = format!("_inbox.stream.{}", Uuid::now_v7());
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .entry(reply_subject.clone())
            .or_default()
            .push(tx);

        self.deliver(subject, &payload, Some(&reply_subject));

        Ok(Box::new(LoopbackChunkStream { rx, done: false }))
    }
}

struct LoopbackSubscription {
    rx: mpsc::UnboundedReceiver<Message>,
}

#[async_trait]
impl Subscription for LoopbackSubscription {
    async fn next(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}

struct LoopbackChunkStream {
    rx: mpsc::UnboundedReceiver<Message>,
    done: bool,
}

#[async_trait]
impl ChunkStream for LoopbackChunkStream {
    async fn next(&mut self) -> Option<Chunk> {
        if self.done {
            return None;
        }
        let msg = self.rx.recv().await?;
        let done = msg
            .payload
            .get("done")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let payload = msg.payload.get("payload").cloned();
        self.done = done;
        Some(Chunk { payload, done })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_fans_out_to_matching_wildcard_subscribers() {
        let bus = LoopbackBus::new();
        let mut sub = bus.subscribe("temporal.event.>").await.unwrap();

        bus.publish("temporal.event.command", serde_json::json!({"n": 1}))
            .await
            .unwrap();

        let msg = sub.next().await.unwrap();
        assert_eq!(msg.subject, "temporal.event.command");
        assert_eq!(msg.payload["n"], 1);
    }

    #[tokio::test]
    async fn request_with_no_responders_fails_fast() {
        let bus = LoopbackBus::new();
        let err = bus
            .request("ai.llm.request", serde_json::json!({}), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NoResponders");
    }

    #[tokio::test]
    async fn request_times_out_if_responder_never_replies() {
        let bus = LoopbackBus::new();
        let _sub = bus.subscribe("ai.llm.request").await.unwrap();

        let err = bus
            .request("ai.llm.request", serde_json::json!({}), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "Timeout");
    }

    #[tokio::test]
    async fn request_resolves_when_responder_replies_on_reply_subject() {
        let bus = LoopbackBus::new();
        let mut sub = bus.subscribe("ai.llm.request").await.unwrap();
        let bus_responder = bus.clone();

        tokio::spawn(async move {
            let msg = sub.next().await.unwrap();
            let reply = msg.reply_subject.unwrap();
            bus_responder
                .publish(&reply, serde_json::json!({"text": "hello"}))
                .await
                .unwrap();
        });

        let reply = bus
            .request("ai.llm.request", serde_json::json!({"prompt": "hi"}), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply["text"], "hello");
    }
}
