use async_trait::async_trait;
use meridian_core::error::{MeridianError, Result};
use serde_json::{json, Value};

use crate::host::ServiceHost;

/// Stub vision backend: OCR returns a fixed transcription, image-gen writes
/// a zero-byte placeholder file at a deterministic path under the system
/// temp dir so callers can exercise the "path, not base64" contract
/// (spec §4.1) without a real model.
pub struct StubVisionHost;

impl Default for StubVisionHost {
    fn default() -> Self {
        Self
    }
}

#[async_trait]
impl ServiceHost for StubVisionHost {
    fn prefix(&self) -> &str {
        "ai.vision"
    }

    async fn info(&self) -> Value {
        json!({ "capabilities": ["ocr.request", "imagegen.request"], "model": "stub-vision-1" })
    }

    async fn handle(&self, op: &str, payload: Value) -> Result<Value> {
        match op {
            "ocr.request" => Ok(json!({
                "text": "",
                "confidence": 0.0,
                "words": [],
            })),
            "imagegen.request" => {
                let width = payload.get("width").and_then(Value::as_u64).unwrap_or(512);
                let height = payload.get("height").and_then(Value::as_u64).unwrap_or(512);
                let path = std::env::temp_dir().join(format!("meridian-imagegen-{}.png", uuid::Uuid::now_v7()));
                std::fs::write(&path, []).map_err(MeridianError::Io)?;
                Ok(json!({
                    "path": path.display().to_string(),
                    "model": "stub-vision-1",
                    "width": width,
                    "height": height,
                }))
            }
            other => Err(MeridianError::InvalidInput(format!("unknown vision op '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn imagegen_writes_a_file_and_returns_its_path() {
        let host = StubVisionHost;
        let out = host
            .handle("imagegen.request", json!({"prompt": "a cat", "width": 256, "height": 256}))
            .await
            .unwrap();
        let path = out["path"].as_str().unwrap();
        assert!(std::path::Path::new(path).exists());
        std::fs::remove_file(path).unwrap();
    }
}
