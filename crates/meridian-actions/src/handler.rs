use std::collections::BTreeMap;

use async_trait::async_trait;
use meridian_core::error::Result;
use serde_json::Value;

/// Outcome of one handler invocation: raw outputs plus the subset that
/// become standardized Context.Variables (spec §4.5 "outputs merged into
/// Context" column). Kept distinct from `ActionResult` because a handler
/// doesn't know its own action id, timing, or status transitions — the
/// orchestrator wraps this into an `ActionResult`.
pub struct HandlerOutcome {
    pub outputs: BTreeMap<String, Value>,
    pub context_updates: BTreeMap<String, Value>,
}

impl HandlerOutcome {
    pub fn new() -> Self {
        Self {
            outputs: BTreeMap::new(),
            context_updates: BTreeMap::new(),
        }
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    pub fn with_context_var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context_updates.insert(key.into(), value.into());
        self
    }
}

impl Default for HandlerOutcome {
    fn default() -> Self {
        Self::new()
    }
}

/// Generalizes the teacher's per-tool `Tool` trait from "one LLM-invoked
/// tool" to "one action kind the orchestrator dispatches" (spec §4.5).
/// Each handler validates its own parameters and is free to reach the bus,
/// the filesystem, or a subprocess directly.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// The `ActionKind::as_str()` this handler serves.
    fn kind(&self) -> &'static str;

    async fn execute(
        &self,
        parameters: &BTreeMap<String, Value>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<HandlerOutcome>;
}

/// Per-call context every handler needs: the bus, path-expansion anchors,
/// and a cancellation token for long-running work.
pub struct ExecutionContext<'a> {
    pub bus: &'a dyn meridian_bus::Bus,
    pub working_directory: std::path::PathBuf,
    pub cancellation: tokio_util::sync::CancellationToken,
}
