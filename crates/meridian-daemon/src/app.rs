//! Central shared state for the minimal ops HTTP surface (spec §6
//! expansion). The daemon's real work — planning, orchestration,
//! proactive suggestions — runs as bus-driven background tasks wired up
//! in `main.rs`; `AppState` exists only so `/healthz` and `/readyz` can
//! report on them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{routing::get, Router};
use meridian_bus::Bus;

/// Passed as `Arc<AppState>` to the health handlers.
pub struct AppState {
    pub bus: Arc<dyn Bus>,
    /// Flips to `true` once every background task has finished its
    /// startup subscribe and the daemon is ready to take traffic.
    ready: AtomicBool,
}

impl AppState {
    pub fn new(bus: Arc<dyn Bus>) -> Self {
        Self {
            bus,
            ready: AtomicBool::new(false),
        }
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(crate::http::health::healthz_handler))
        .route("/readyz", get(crate::http::health::readyz_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
