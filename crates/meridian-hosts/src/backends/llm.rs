use async_trait::async_trait;
use meridian_core::error::{MeridianError, Result};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::host::ServiceHost;

/// Deterministic stand-in for a real LLM backend. Real backend selection is
/// out of scope (spec §1); this exercises the bus contract end-to-end and
/// lets planner tests script a canned JSON plan via `set_scripted_reply`.
pub struct StubLlmHost {
    scripted_reply: Mutex<Option<String>>,
}

impl StubLlmHost {
    pub fn new() -> Self {
        Self {
            scripted_reply: Mutex::new(None),
        }
    }

    /// Queue a canned response for the next `request` call (test hook).
    pub async fn set_scripted_reply(&self, content: impl Into<String>) {
        *self.scripted_reply.lock().await = Some(content.into());
    }
}

impl Default for StubLlmHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceHost for StubLlmHost {
    fn prefix(&self) -> &str {
        "ai.llm"
    }

    async fn info(&self) -> Value {
        json!({ "capabilities": ["request", "embed"], "model": "stub-echo-1" })
    }

    async fn handle(&self, op: &str, payload: Value) -> Result<Value> {
        match op {
            "request" => {
                if let Some(scripted) = self.scripted_reply.lock().await.take() {
                    return Ok(json!({ "content": scripted, "model": "stub-echo-1" }));
                }
                let mode = payload.get("mode").and_then(Value::as_str).unwrap_or("chat");
                let last_user = payload
                    .get("messages")
                    .and_then(Value::as_array)
                    .and_then(|m| m.last())
                    .and_then(|m| m.get("content"))
                    .and_then(Value::as_str)
                    .unwrap_or("");
                Ok(json!({
                    "content": format!("[{mode}] echo: {last_user}"),
                    "model": "stub-echo-1",
                }))
            }
            "embed" => {
                let texts = payload
                    .get("texts")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let vectors: Vec<Vec<f32>> = texts
                    .iter()
                    .map(|t| vec![t.as_str().map(|s| s.len() as f32).unwrap_or(0.0)])
                    .collect();
                Ok(json!({ "vectors": vectors }))
            }
            other => Err(MeridianError::InvalidInput(format!("unknown LLM op '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_the_last_message() {
        let host = StubLlmHost::new();
        let out = host
            .handle(
                "request",
                json!({"mode": "chat", "messages": [{"role": "user", "content": "hi"}]}),
            )
            .await
            .unwrap();
        assert_eq!(out["content"], "[chat] echo: hi");
    }

    #[tokio::test]
    async fn scripted_reply_is_consumed_once() {
        let host = StubLlmHost::new();
        host.set_scripted_reply(r#"{"explanation":"x","actions":[]}"#).await;

        let first = host.handle("request", json!({})).await.unwrap();
        assert_eq!(first["content"], r#"{"explanation":"x","actions":[]}"#);

        let second = host.handle("request", json!({"messages": []})).await.unwrap();
        assert!(second["content"].as_str().unwrap().starts_with("[chat] echo:"));
    }
}
