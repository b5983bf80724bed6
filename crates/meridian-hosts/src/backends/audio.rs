use async_trait::async_trait;
use meridian_core::error::{MeridianError, Result};
use serde_json::{json, Value};

use crate::host::ServiceHost;

/// Stub audio backend covering `stt`/`tts`/`vad` (spec §4.4).
pub struct StubAudioHost;

impl Default for StubAudioHost {
    fn default() -> Self {
        Self
    }
}

#[async_trait]
impl ServiceHost for StubAudioHost {
    fn prefix(&self) -> &str {
        "ai.audio"
    }

    async fn info(&self) -> Value {
        json!({ "capabilities": ["stt", "tts", "vad"], "model": "stub-audio-1" })
    }

    async fn handle(&self, op: &str, payload: Value) -> Result<Value> {
        match op {
            "stt" => {
                let _audio_path = payload.get("audio_path").and_then(Value::as_str);
                Ok(json!({ "text": "", "language": payload.get("language").cloned().unwrap_or(json!("auto")) }))
            }
            "tts" => {
                let path = std::env::temp_dir().join(format!("meridian-tts-{}.wav", uuid::Uuid::now_v7()));
                std::fs::write(&path, []).map_err(MeridianError::Io)?;
                Ok(json!({ "path": path.display().to_string() }))
            }
            "vad" => Ok(json!({ "speech_detected": false })),
            other => Err(MeridianError::InvalidInput(format!("unknown audio op '{other}'"))),
        }
    }
}
