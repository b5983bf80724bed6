use meridian_core::error::ErrorShape;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope for a `request()` call body (spec §4.1, §6).
///
/// The NATS subject itself carries the routing; `id` is an
/// application-level correlation id so callers can multiplex several
/// in-flight requests sharing one reply inbox (relevant for `stream`,
/// where many chunks arrive on the same reply subject).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReqFrame {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ReqFrame {
    pub fn new(id: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            id: id.into(),
            payload: Some(serde_json::to_value(payload).unwrap_or(Value::Null)),
        }
    }
}

/// Reply body for a `request()` call (spec §4.1, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResFrame {
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorShape>,
}

impl ResFrame {
    pub fn ok(id: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            id: id.into(),
            ok: true,
            payload: Some(serde_json::to_value(payload).unwrap_or(Value::Null)),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, kind: &str, message: &str) -> Self {
        Self {
            id: id.into(),
            ok: false,
            payload: None,
            error: Some(ErrorShape {
                kind: kind.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

/// One chunk of a `stream()` call (spec §4.1 streaming, §5 back-pressure).
///
/// `done` marks the terminal chunk; back-pressure may drop intermediate
/// chunks but the terminal chunk is never dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default)]
    pub done: bool,
}

impl StreamChunk {
    pub fn progress(id: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            id: id.into(),
            payload: Some(serde_json::to_value(payload).unwrap_or(Value::Null)),
            done: false,
        }
    }

    pub fn terminal(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: None,
            done: true,
        }
    }
}

/// A published pub/sub message (e.g. `temporal.event.<kind>`, `agent.suggestion`).
/// No correlation id — publish is fire-and-forget (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubMessage {
    pub payload: Value,
}

impl PubMessage {
    pub fn new(payload: impl Serialize) -> Self {
        Self {
            payload: serde_json::to_value(payload).unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn res_ok_serializes_without_error_field() {
        let res = ResFrame::ok("req-1", serde_json::json!({"pong": true}));
        let json = serde_json::to_string(&res).unwrap();
        assert!(json.contains(r#""ok":true"#));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn res_err_serializes_without_payload_field() {
        let res = ResFrame::err("req-2", "Timeout", "deadline exceeded");
        let json = serde_json::to_string(&res).unwrap();
        assert!(json.contains(r#""ok":false"#));
        assert!(json.contains("Timeout"));
        assert!(!json.contains("\"payload\""));
    }

    #[test]
    fn stream_terminal_chunk_carries_no_payload() {
        let chunk = StreamChunk::terminal("req-3");
        assert!(chunk.done);
        assert!(chunk.payload.is_none());
    }

    #[test]
    fn req_frame_round_trips_through_json() {
        let req = ReqFrame::new("req-4", serde_json::json!({"prompt": "hi"}));
        let json = serde_json::to_string(&req).unwrap();
        let parsed: ReqFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "req-4");
        assert_eq!(parsed.payload.unwrap()["prompt"], "hi");
    }
}
