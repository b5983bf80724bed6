use async_trait::async_trait;
use meridian_core::error::{MeridianError, Result};
use serde_json::Value;

/// Generalizes the teacher's `LlmProvider` trait from "LLM provider" to
/// "any backend behind a bus subject prefix" (spec §4.4). A host answers
/// every request under its prefix once its backend is ready, and must
/// never crash the bus client — every error surfaces as `{error:{kind,
/// message}}` instead of a panic.
#[async_trait]
pub trait ServiceHost: Send + Sync {
    /// Subject prefix this host owns, e.g. `"ai.llm"`, `"system.file"`.
    fn prefix(&self) -> &str;

    /// Backend identity/capability info, returned on `{prefix}.info`.
    async fn info(&self) -> Value;

    /// Handle one request. `op` is the subject suffix after the prefix
    /// (e.g. `"request"` for `ai.llm.request`).
    async fn handle(&self, op: &str, payload: Value) -> Result<Value>;

    /// Whether the backend is ready to accept requests. Hosts that start
    /// ready (stub backends) return `true` unconditionally.
    async fn is_ready(&self) -> bool {
        true
    }

    /// Swap the active backend model/config without dropping in-flight or
    /// already-queued requests (spec §4.4 graceful reload). Default: no-op,
    /// for hosts with nothing to reload.
    async fn reload(&self, _payload: Value) -> Result<()> {
        Ok(())
    }
}

pub fn unready_error(prefix: &str) -> MeridianError {
    MeridianError::BackendError(format!("{prefix} backend is not ready"))
}
