use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use meridian_core::error::Result;
use serde_json::Value;

use crate::handler::{ActionHandler, ExecutionContext, HandlerOutcome};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Most action kinds are a thin pass-through to a fixed bus subject: send
/// the (already placeholder-resolved) parameters as the request payload,
/// take one field off the reply, and mirror it into a Context.Variable.
/// This single handler backs `llm_generate`, `image_generate`,
/// `ocr_capture`, `document_query`, `file_create`, `file_write`,
/// `file_read`, `file_move`, and `file_delete` — only the wiring differs,
/// grounded on the action-kind table's "Subject" column.
pub struct BusDelegateHandler {
    kind: &'static str,
    subject: &'static str,
    /// Reply field copied into the action's own outputs under the same name.
    output_field: &'static str,
    /// If set, the reply field above is also mirrored into this Context.Variable.
    context_var: Option<&'static str>,
}

impl BusDelegateHandler {
    pub fn new(
        kind: &'static str,
        subject: &'static str,
        output_field: &'static str,
        context_var: Option<&'static str>,
    ) -> Self {
        Self {
            kind,
            subject,
            output_field,
            context_var,
        }
    }
}

#[async_trait]
impl ActionHandler for BusDelegateHandler {
    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn execute(
        &self,
        parameters: &BTreeMap<String, Value>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<HandlerOutcome> {
        let payload = Value::Object(parameters.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
        let reply = ctx.bus.request(self.subject, payload, DEFAULT_REQUEST_TIMEOUT).await?;

        let mut outcome = HandlerOutcome::new();
        if let Some(value) = reply.get(self.output_field) {
            outcome = outcome.with_output(self.output_field, value.clone());
            if let Some(var) = self.context_var {
                outcome = outcome.with_context_var(var, value.clone());
            }
        }
        Ok(outcome)
    }
}
