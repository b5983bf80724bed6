use async_trait::async_trait;
use meridian_core::error::{MeridianError, Result};
use serde_json::Value;
use std::time::Duration;

/// A single inbound message delivered to a subscriber (spec §4.1).
#[derive(Debug, Clone)]
pub struct Message {
    pub subject: String,
    pub payload: Value,
    /// Present only on `request()`-originated messages; a subscriber
    /// replies by publishing to this subject.
    pub reply_subject: Option<String>,
}

/// One chunk of a `stream()` response (spec §4.1, §5 back-pressure).
#[derive(Debug, Clone)]
pub struct Chunk {
    pub payload: Option<Value>,
    pub done: bool,
}

/// A live subscription. Polling `next()` yields messages in per-subscription
/// FIFO order (spec §5); dropping the handle unsubscribes.
#[async_trait]
pub trait Subscription: Send {
    async fn next(&mut self) -> Option<Message>;
}

/// A live stream of chunks returned by `stream()`.
#[async_trait]
pub trait ChunkStream: Send {
    async fn next(&mut self) -> Option<Chunk>;
}

/// Transport-agnostic bus contract (spec §4.1). Every component above
/// `meridian-bus` programs against this trait, never against a concrete
/// transport, so tests can swap in `LoopbackBus` for a real broker.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Fire-and-forget publish. Never blocks on a responder existing.
    async fn publish(&self, subject: &str, payload: Value) -> Result<()>;

    /// Request/reply with a deadline. Returns `NoResponders` immediately
    /// if the broker reports no subscriber, `Timeout` if the deadline
    /// elapses first.
    async fn request(&self, subject: &str, payload: Value, timeout: Duration) -> Result<Value>;

    /// Subscribe to a subject, which may contain `*` (one token) or `>`
    /// (remaining tokens) wildcards.
    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>>;

    /// Issue a request that expects a terminal-chunk-delimited sequence of
    /// replies on a transient per-call reply subject (spec §4.1 streaming).
    async fn stream(&self, subject: &str, payload: Value) -> Result<Box<dyn ChunkStream>>;
}

/// Map a broker-level "no responders" / connection failure into the bus
/// error taxonomy (spec §7). Transports call this at their edge so callers
/// never see transport-specific error types.
pub fn timeout_error(timeout: Duration) -> MeridianError {
    MeridianError::Timeout {
        ms: timeout.as_millis() as u64,
    }
}
