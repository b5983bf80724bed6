use std::time::Duration;

use async_trait::async_trait;
use meridian_core::error::{MeridianError, Result};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serde_json::{json, Value};
use sysinfo::System;

use crate::host::ServiceHost;

/// `system.action.*` (spec §4.11): strict whitelist of `process.list` and
/// `process.kill`. Destructive actions are assumed pre-approved by the
/// Conversation Engine layer; this host never re-prompts.
pub struct SystemActionHost;

impl Default for SystemActionHost {
    fn default() -> Self {
        Self
    }
}

#[async_trait]
impl ServiceHost for SystemActionHost {
    fn prefix(&self) -> &str {
        "system.action"
    }

    async fn info(&self) -> Value {
        json!({ "capabilities": ["process.list", "process.kill"] })
    }

    async fn handle(&self, op: &str, payload: Value) -> Result<Value> {
        match op {
            "process.list" => Ok(json!({ "processes": list_processes() })),
            "process.kill" => {
                let pid = payload
                    .get("pid")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| MeridianError::InvalidInput("missing 'pid'".into()))?;
                if pid <= 1 {
                    return Err(MeridianError::InvalidInput("refusing to kill pid <= 1".into()));
                }
                let (killed, method) = kill_process(pid as i32).await;
                Ok(json!({ "killed": killed, "method": method }))
            }
            // Spec §4.11 names this literal shape for an unrecognized op,
            // distinct from the generic `{error:{kind,message}}` envelope
            // every other failure in this crate returns.
            _ => Ok(json!({ "status": "error", "message": "unknown action" })),
        }
    }
}

fn list_processes() -> Vec<Value> {
    let mut sys = System::new_all();
    sys.refresh_all();
    sys.processes()
        .iter()
        .map(|(pid, proc_)| {
            json!({
                "pid": pid.as_u32(),
                "name": proc_.name().to_string_lossy(),
                "cpu_percent": proc_.cpu_usage(),
                "memory_percent": proc_.memory() as f64 / sys.total_memory().max(1) as f64 * 100.0,
                "user": proc_.user_id().map(|u| u.to_string()).unwrap_or_default(),
            })
        })
        .collect()
}

/// SIGTERM, wait up to 5s, SIGKILL if still alive (spec §4.11, §5).
async fn kill_process(pid: i32) -> (bool, &'static str) {
    let nix_pid = Pid::from_raw(pid);
    if kill(nix_pid, Signal::SIGTERM).is_err() {
        return (false, "not_found");
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if kill(nix_pid, None).is_err() {
            return (true, "sigterm");
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    if kill(nix_pid, Signal::SIGKILL).is_ok() {
        (true, "sigkill")
    } else {
        (true, "sigterm")
    }
}
