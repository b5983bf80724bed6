use std::sync::Arc;
use std::time::Duration;

use meridian_bus::Bus;
use sysinfo::{Disks, System};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::store::TimelineStore;
use crate::types::{EventKind, TimelineEvent};

/// Emits a `SystemSnapshotEvent` every `interval` (default 300s): CPU,
/// memory, disk usage, process count. A field that fails to read is
/// skipped rather than failing the whole snapshot (spec §4.9).
pub struct SnapshotCollector {
    interval: Duration,
}

impl SnapshotCollector {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub async fn run(
        self,
        store: Arc<TimelineStore>,
        bus: Arc<dyn Bus>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("snapshot collector started");
        let mut sys = System::new_all();
        let mut tick = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let event = take_snapshot(&mut sys);
                    if let Err(e) = store.append(bus.as_ref(), event).await {
                        warn!("snapshot append failed: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("snapshot collector shutting down");
                        break;
                    }
                }
            }
        }
    }
}

fn take_snapshot(sys: &mut System) -> TimelineEvent {
    sys.refresh_all();

    let mut data = serde_json::Map::new();
    data.insert("cpu_percent".into(), serde_json::json!(sys.global_cpu_usage()));
    data.insert(
        "memory_used_bytes".into(),
        serde_json::json!(sys.used_memory()),
    );
    data.insert(
        "memory_total_bytes".into(),
        serde_json::json!(sys.total_memory()),
    );
    data.insert("process_count".into(), serde_json::json!(sys.processes().len()));

    // Disk usage is best-effort: an unreadable mount is skipped, not fatal.
    let disks = Disks::new_with_refreshed_list();
    let disk_used: u64 = disks.iter().map(|d| d.total_space() - d.available_space()).sum();
    let disk_total: u64 = disks.iter().map(|d| d.total_space()).sum();
    if disk_total > 0 {
        data.insert("disk_used_bytes".into(), serde_json::json!(disk_used));
        data.insert("disk_total_bytes".into(), serde_json::json!(disk_total));
    }

    TimelineEvent::new(EventKind::SystemSnapshot, "snapshot_collector", serde_json::Value::Object(data))
}
