use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use meridian_bus::Bus;
use notify::{Event, EventKind as NotifyEventKind, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::store::TimelineStore;
use crate::types::{EventKind, TimelineEvent};

/// Watches a configured set of paths recursively, coalesces bursts within
/// `debounce` per path, and emits a `FileEvent{path, op, size?}` per
/// settled change (spec §4.9). `notify`'s recursive mode already breaks
/// symlink loops by not following symlinks into already-visited inodes.
pub struct FilesystemCollector {
    paths: Vec<PathBuf>,
    debounce: Duration,
}

impl FilesystemCollector {
    pub fn new(paths: Vec<PathBuf>, debounce: Duration) -> Self {
        Self { paths, debounce }
    }

    pub async fn run(
        self,
        store: Arc<TimelineStore>,
        bus: Arc<dyn Bus>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut watcher = match notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        }) {
            Ok(w) => w,
            Err(e) => {
                warn!("failed to create filesystem watcher: {e}");
                return;
            }
        };

        for path in &self.paths {
            if let Err(e) = watcher.watch(path, RecursiveMode::Recursive) {
                warn!(path = %path.display(), error = %e, "failed to watch path");
            }
        }

        info!(paths = ?self.paths, "filesystem collector started");

        let mut pending: HashMap<PathBuf, (Instant, String)> = HashMap::new();
        let mut flush = tokio::time::interval(self.debounce);

        loop {
            tokio::select! {
                Some(event) = rx.recv() => {
                    if let Some(op) = classify(&event.kind) {
                        for path in event.paths {
                            pending.insert(path, (Instant::now(), op.to_string()));
                        }
                    }
                }
                _ = flush.tick() => {
                    let settled: Vec<_> = pending
                        .iter()
                        .filter(|(_, (t, _))| t.elapsed() >= self.debounce)
                        .map(|(p, (_, op))| (p.clone(), op.clone()))
                        .collect();
                    for (path, op) in settled {
                        pending.remove(&path);
                        let size = std::fs::metadata(&path).ok().map(|m| m.len());
                        let event = TimelineEvent::new(
                            EventKind::File,
                            "filesystem_collector",
                            serde_json::json!({ "path": path.display().to_string(), "op": op, "size": size }),
                        );
                        if let Err(e) = store.append(bus.as_ref(), event).await {
                            warn!("file event append failed: {e}");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("filesystem collector shutting down");
                        break;
                    }
                }
            }
        }
    }
}

fn classify(kind: &NotifyEventKind) -> Option<&'static str> {
    match kind {
        NotifyEventKind::Create(_) => Some("created"),
        NotifyEventKind::Modify(_) => Some("modified"),
        NotifyEventKind::Remove(_) => Some("deleted"),
        _ => None,
    }
}
