use std::sync::Arc;

use meridian_bus::Bus;
use tracing::{info, warn};

use crate::store::TimelineStore;
use crate::types::{EventKind, TimelineEvent};

/// Subscribes to `temporal.command.new`, validates and writes each payload,
/// then re-publishes on `temporal.event.command` via `TimelineStore::append`
/// (spec §4.9). The re-publish is the store's normal fan-out, not a second
/// publish — this collector never talks to the bus itself beyond the
/// subscription.
pub struct CommandIngress;

impl CommandIngress {
    pub async fn run(store: Arc<TimelineStore>, bus: Arc<dyn Bus>) {
        let mut sub = match bus.subscribe("temporal.command.new").await {
            Ok(s) => s,
            Err(e) => {
                warn!("command ingress subscribe failed: {e}");
                return;
            }
        };

        info!("command ingress started");
        while let Some(msg) = sub.next().await {
            let Some(command) = msg.payload.get("command").and_then(|v| v.as_str()) else {
                warn!(payload = %msg.payload, "malformed command.new payload, dropping");
                continue;
            };

            let event = TimelineEvent::new(
                EventKind::Command,
                "command_ingress",
                serde_json::json!({ "command": command }),
            );
            if let Err(e) = store.append(bus.as_ref(), event).await {
                warn!("command event append failed: {e}");
            }
        }
    }
}
