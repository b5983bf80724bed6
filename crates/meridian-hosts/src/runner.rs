use std::sync::Arc;

use meridian_bus::Bus;
use meridian_protocol::frames::{ReqFrame, ResFrame};
use tokio::sync::{watch, Semaphore};
use tracing::{info, warn};

use crate::host::ServiceHost;

/// Drives one [`ServiceHost`]: subscribes to `{prefix}.>`, dispatches each
/// request to the host with bounded concurrency, and replies on the
/// request's reply subject. `concurrency` mirrors spec §5's per-host
/// limits (1 for image-gen, >=2 for STT/LLM) using the same
/// `tokio::sync::Semaphore` primitive the teacher uses for bounded
/// subprocess parallelism.
pub struct HostRunner {
    host: Arc<dyn ServiceHost>,
    concurrency: Arc<Semaphore>,
}

impl HostRunner {
    pub fn new(host: Arc<dyn ServiceHost>, concurrency: usize) -> Self {
        Self {
            host,
            concurrency: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    pub async fn run(self, bus: Arc<dyn Bus>, mut shutdown: watch::Receiver<bool>) {
        let subject = format!("{}.>", self.host.prefix());
        let mut sub = match bus.subscribe(&subject).await {
            Ok(s) => s,
            Err(e) => {
                warn!(subject, error = %e, "host failed to subscribe");
                return;
            }
        };

        info!(prefix = self.host.prefix(), "service host started");

        loop {
            tokio::select! {
                msg = sub.next() => {
                    let Some(msg) = msg else { break };
                    let host = self.host.clone();
                    let bus = bus.clone();
                    let permit = self.concurrency.clone();

                    tokio::spawn(async move {
                        let _permit = permit.acquire_owned().await;
                        handle_one(host, bus, msg).await;
                    });
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(prefix = self.host.prefix(), "service host shutting down");
                        break;
                    }
                }
            }
        }
    }
}

async fn handle_one(host: Arc<dyn ServiceHost>, bus: Arc<dyn Bus>, msg: meridian_bus::Message) {
    let Some(reply_subject) = msg.reply_subject.clone() else {
        return; // fire-and-forget message on a request-only prefix; ignore.
    };

    let op = msg
        .subject
        .strip_prefix(host.prefix())
        .and_then(|s| s.strip_prefix('.'))
        .unwrap_or("");

    let req: ReqFrame = match serde_json::from_value(msg.payload) {
        Ok(r) => r,
        Err(e) => {
            let res = ResFrame::err("unknown", "InvalidInput", &e.to_string());
            let _ = bus.publish(&reply_subject, serde_json::to_value(&res).unwrap_or_default()).await;
            return;
        }
    };

    if !host.is_ready().await {
        let res = ResFrame::err(&req.id, "BackendError", &format!("{} backend not ready", host.prefix()));
        let _ = bus.publish(&reply_subject, serde_json::to_value(&res).unwrap_or_default()).await;
        return;
    }

    let result = if op == "reload" {
        host.reload(req.payload.clone().unwrap_or_default()).await.map(|_| serde_json::json!({"reloaded": true}))
    } else {
        host.handle(op, req.payload.clone().unwrap_or_default()).await
    };

    let res = match result {
        Ok(payload) => ResFrame::ok(&req.id, payload),
        Err(e) => ResFrame::err(&req.id, e.code(), &e.to_string()),
    };
    let _ = bus.publish(&reply_subject, serde_json::to_value(&res).unwrap_or_default()).await;
}
