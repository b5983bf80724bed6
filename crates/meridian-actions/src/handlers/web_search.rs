use std::collections::BTreeMap;

use async_trait::async_trait;
use meridian_core::error::{MeridianError, Result};
use serde_json::Value;

use crate::handler::{ActionHandler, ExecutionContext, HandlerOutcome};

/// Thin HTTP client over a search provider's REST API. The only handler
/// that reaches the network directly instead of the bus — there is no
/// Service Host for "the open web", so it lives here like the teacher's
/// `WebSearchTool` reaching out via `reqwest` on its own.
pub struct WebSearchHandler {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl WebSearchHandler {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl ActionHandler for WebSearchHandler {
    fn kind(&self) -> &'static str {
        "web_search"
    }

    async fn execute(
        &self,
        parameters: &BTreeMap<String, Value>,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<HandlerOutcome> {
        let query = parameters
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| MeridianError::InvalidInput("web_search requires 'query'".into()))?;

        let mut request = self.client.get(&self.api_url).query(&[("q", query)]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MeridianError::BackendError(format!("web_search request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(MeridianError::BackendError(format!(
                "web_search provider returned status {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MeridianError::BackendError(format!("web_search returned non-JSON body: {e}")))?;

        Ok(HandlerOutcome::new()
            .with_output("results", body.clone())
            .with_context_var("last_search_results", body))
    }
}
