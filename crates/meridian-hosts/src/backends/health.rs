use std::sync::Mutex;

use async_trait::async_trait;
use meridian_core::error::{MeridianError, Result};
use serde_json::{json, Value};
use sysinfo::System;

use crate::host::ServiceHost;

/// `system.health.*`: current/summary/history reporting over `sysinfo`
/// snapshots. History is an in-memory ring buffer — a real deployment
/// would read it from the Timeline Store's snapshot table instead, but
/// that is an orchestration concern above this host, not this host's job.
pub struct HealthHost {
    history: Mutex<Vec<Value>>,
    max_history: usize,
}

impl HealthHost {
    pub fn new(max_history: usize) -> Self {
        Self {
            history: Mutex::new(Vec::new()),
            max_history,
        }
    }

    fn current_snapshot(&self) -> Value {
        let mut sys = System::new_all();
        sys.refresh_all();
        json!({
            "cpu_percent": sys.global_cpu_usage(),
            "memory_used_bytes": sys.used_memory(),
            "memory_total_bytes": sys.total_memory(),
            "process_count": sys.processes().len(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
    }
}

impl Default for HealthHost {
    fn default() -> Self {
        Self::new(288) // 24h at one sample per 5min
    }
}

#[async_trait]
impl ServiceHost for HealthHost {
    fn prefix(&self) -> &str {
        "system.health"
    }

    async fn info(&self) -> Value {
        json!({ "capabilities": ["current", "summary", "history", "alerts"] })
    }

    async fn handle(&self, op: &str, payload: Value) -> Result<Value> {
        match op {
            "current" => {
                let snapshot = self.current_snapshot();
                let mut history = self.history.lock().unwrap();
                history.push(snapshot.clone());
                if history.len() > self.max_history {
                    history.remove(0);
                }
                Ok(snapshot)
            }
            "summary" => {
                let history = self.history.lock().unwrap();
                let count = history.len() as f64;
                let avg_cpu = if count > 0.0 {
                    history.iter().filter_map(|s| s["cpu_percent"].as_f64()).sum::<f64>() / count
                } else {
                    0.0
                };
                Ok(json!({ "samples": history.len(), "avg_cpu_percent": avg_cpu }))
            }
            "history" => {
                let limit = payload.get("limit").and_then(Value::as_u64).unwrap_or(100) as usize;
                let history = self.history.lock().unwrap();
                let slice: Vec<_> = history.iter().rev().take(limit).cloned().collect();
                Ok(json!({ "entries": slice }))
            }
            "alerts" => Ok(json!({ "alerts": [] })),
            other => Err(MeridianError::InvalidInput(format!("unknown health op '{other}'"))),
        }
    }
}
