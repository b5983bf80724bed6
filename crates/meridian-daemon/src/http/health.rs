use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /healthz — liveness probe. Always 200 once the process is up.
pub async fn healthz_handler(State(_state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /readyz — readiness probe. Reflects whether every background
/// task (Service Hosts, collectors, the proactive agent) finished
/// subscribing to the bus. Status code carries the signal, not just the
/// body, so a standard readiness probe can gate on it.
pub async fn readyz_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    if state.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "starting" })))
    }
}
