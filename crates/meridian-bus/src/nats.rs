use std::time::Duration;

use async_nats::Client;
use async_trait::async_trait;
use futures_util::StreamExt;
use meridian_core::error::{MeridianError, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::bus::{timeout_error, Bus, Chunk, ChunkStream, Message, Subscription};

/// Binary payloads at or above this size are never inlined in the JSON
/// envelope; callers write them to a temp path and send the path instead
/// (spec §4.1). `meridian-bus` itself does not enforce this — it is a
/// contract on payload shape that Service Hosts and the orchestrator honor.
pub const BINARY_PASS_BY_PATH_THRESHOLD_BYTES: usize = 256 * 1024;

const RECONNECT_MIN_MS: u64 = 100;
const RECONNECT_MAX_MS: u64 = 10_000;

/// `Bus` implementation over a NATS connection.
///
/// Reconnection is handled by `async-nats` internally; we additionally
/// observe connection events so a failed initial connect retries with
/// capped, jittered backoff instead of failing the daemon outright.
pub struct NatsBus {
    client: Client,
}

impl NatsBus {
    /// Connect with capped exponential backoff (100ms -> 10s, jittered),
    /// matching spec §4.1's reconnect policy for the initial handshake.
    /// Once connected, `async-nats` owns reconnection for the lifetime of
    /// the client.
    pub async fn connect(url: &str) -> Result<Self> {
        let mut delay_ms = RECONNECT_MIN_MS;
        loop {
            match async_nats::connect(url).await {
                Ok(client) => {
                    info!(url, "connected to bus");
                    return Ok(Self { client });
                }
                Err(e) => {
                    let jitter = delay_ms / 4;
                    let jittered = (delay_ms as i64 + fastrand_jitter(jitter)).max(0) as u64;
                    warn!(url, error = %e, retry_in_ms = jittered, "bus connect failed, retrying");
                    tokio::time::sleep(Duration::from_millis(jittered)).await;
                    delay_ms = (delay_ms * 2).min(RECONNECT_MAX_MS);
                }
            }
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Deterministic, dependency-free jitter: avoids pulling in a random crate
/// purely for a +/-25% backoff wobble.
fn fastrand_jitter(bound: u64) -> i64 {
    if bound == 0 {
        return 0;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    (nanos % (bound * 2)) as i64 - bound as i64
}

#[async_trait]
impl Bus for NatsBus {
    async fn publish(&self, subject: &str, payload: Value) -> Result<()> {
        let bytes = serde_json::to_vec(&payload).map_err(MeridianError::Serialization)?;
        self.client
            .publish(subject.to_string(), bytes.into())
            .await
            .map_err(|e| MeridianError::BackendError(e.to_string()))
    }

    async fn request(&self, subject: &str, payload: Value, timeout: Duration) -> Result<Value> {
        let bytes = serde_json::to_vec(&payload).map_err(MeridianError::Serialization)?;
        let fut = self.client.request(subject.to_string(), bytes.into());
        let response = match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(msg)) => msg,
            Ok(Err(e)) => {
                return Err(match e.kind() {
                    async_nats::client::RequestErrorKind::NoResponders => {
                        MeridianError::NoResponders {
                            subject: subject.to_string(),
                        }
                    }
                    async_nats::client::RequestErrorKind::TimedOut => timeout_error(timeout),
                    _ => MeridianError::BackendError(e.to_string()),
                });
            }
            Err(_) => return Err(timeout_error(timeout)),
        };
        serde_json::from_slice(&response.payload).map_err(MeridianError::Serialization)
    }

    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>> {
        let sub = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| MeridianError::BackendError(e.to_string()))?;
        Ok(Box::new(NatsSubscription { inner: sub }))
    }

    async fn stream(&self, subject: &str, payload: Value) -> Result<Box<dyn ChunkStream>> {
        let reply_subject = format!("_inbox.stream.{}", uuid::Uuid::now_v7());
        let reply_sub = self
            .client
            .subscribe(reply_subject.clone())
            .await
            .map_err(|e| MeridianError::BackendError(e.to_string()))?;

        let envelope = serde_json::json!({ "reply_subject": reply_subject, "payload": payload });
        let bytes = serde_json::to_vec(&envelope).map_err(MeridianError::Serialization)?;
        self.client
            .publish(subject.to_string(), bytes.into())
            .await
            .map_err(|e| MeridianError::BackendError(e.to_string()))?;

        Ok(Box::new(NatsChunkStream {
            inner: Some(reply_sub),
        }))
    }
}

struct NatsSubscription {
    inner: async_nats::Subscriber,
}

#[async_trait]
impl Subscription for NatsSubscription {
    async fn next(&mut self) -> Option<Message> {
        let msg = self.inner.next().await?;
        let payload = serde_json::from_slice(&msg.payload).unwrap_or(Value::Null);
        Some(Message {
            subject: msg.subject.to_string(),
            payload,
            reply_subject: msg.reply.map(|s| s.to_string()),
        })
    }
}

struct NatsChunkStream {
    inner: Option<async_nats::Subscriber>,
}

#[async_trait]
impl ChunkStream for NatsChunkStream {
    async fn next(&mut self) -> Option<Chunk> {
        let sub = self.inner.as_mut()?;
        let msg = sub.next().await?;
        let value: Value = serde_json::from_slice(&msg.payload).unwrap_or(Value::Null);
        let done = value.get("done").and_then(Value::as_bool).unwrap_or(false);
        let payload = value.get("payload").cloned();
        if done {
            self.inner = None;
        }
        Some(Chunk { payload, done })
    }
}
