use std::collections::BTreeMap;

use async_trait::async_trait;
use meridian_core::error::{MeridianError, Result};
use meridian_core::paths::expand_path;
use serde_json::Value;

use crate::handler::{ActionHandler, ExecutionContext, HandlerOutcome};

/// Copies a generated or fetched image from `source_path` to
/// `destination_path`, creating the destination's parent directories.
/// Unlike `image_generate`/`ocr_capture` this never touches the bus — it
/// is local filesystem work the orchestrator still gates behind approval
/// because it writes outside the session's scratch space.
pub struct ImageSaveHandler;

#[async_trait]
impl ActionHandler for ImageSaveHandler {
    fn kind(&self) -> &'static str {
        "image_save"
    }

    async fn execute(
        &self,
        parameters: &BTreeMap<String, Value>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<HandlerOutcome> {
        let source = parameters
            .get("source_path")
            .and_then(Value::as_str)
            .ok_or_else(|| MeridianError::InvalidInput("image_save requires 'source_path'".into()))?;
        let destination = parameters
            .get("destination_path")
            .and_then(Value::as_str)
            .ok_or_else(|| MeridianError::InvalidInput("image_save requires 'destination_path'".into()))?;

        let source = expand_path(source, &ctx.working_directory);
        let destination = expand_path(destination, &ctx.working_directory);

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&source, &destination).await?;

        let saved_path = destination.to_string_lossy().into_owned();
        Ok(HandlerOutcome::new()
            .with_output("saved_path", saved_path.clone())
            .with_context_var("last_saved_image", saved_path))
    }
}
