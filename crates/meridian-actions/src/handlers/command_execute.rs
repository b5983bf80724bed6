use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use meridian_core::error::{MeridianError, Result};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::handler::{ActionHandler, ExecutionContext, HandlerOutcome};

const KILL_GRACE: Duration = Duration::from_secs(5);

/// Runs a local subprocess and captures its combined output. Cancellation
/// (spec §5) sends SIGTERM, waits up to `KILL_GRACE`, then SIGKILL —
/// mirroring `SystemActionHost::kill_process`'s escalation in
/// `meridian-hosts`, the only other place this crate tears down a PID.
pub struct CommandExecuteHandler;

#[async_trait]
impl ActionHandler for CommandExecuteHandler {
    fn kind(&self) -> &'static str {
        "command_execute"
    }

    async fn execute(
        &self,
        parameters: &BTreeMap<String, Value>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<HandlerOutcome> {
        let command = parameters
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| MeridianError::InvalidInput("command_execute requires 'command'".into()))?;
        let args: Vec<String> = parameters
            .get("args")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        let mut child = Command::new(command)
            .args(&args)
            .current_dir(&ctx.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MeridianError::BackendError(format!("spawn failed: {e}")))?;

        let pid = child.id();

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| MeridianError::BackendError(e.to_string()))?;
                let mut stdout = String::new();
                let mut stderr = String::new();
                if let Some(mut out) = child.stdout.take() {
                    let _ = out.read_to_string(&mut stdout).await;
                }
                if let Some(mut err) = child.stderr.take() {
                    let _ = err.read_to_string(&mut stderr).await;
                }
                let exit_code = status.code().unwrap_or(-1);
                let combined_output = if stderr.is_empty() {
                    stdout.clone()
                } else {
                    format!("{stdout}{stderr}")
                };
                Ok(HandlerOutcome::new()
                    .with_output("exit_code", exit_code)
                    .with_output("stdout", stdout)
                    .with_output("stderr", stderr)
                    .with_context_var("last_command_output", combined_output))
            }
            _ = ctx.cancellation.cancelled() => {
                if let Some(pid) = pid {
                    terminate(pid).await;
                }
                let _ = child.wait().await;
                Err(MeridianError::Cancelled)
            }
        }
    }
}

async fn terminate(pid: u32) {
    let nix_pid = Pid::from_raw(pid as i32);
    let _ = kill(nix_pid, Signal::SIGTERM);
    tokio::time::sleep(KILL_GRACE).await;
    if kill(nix_pid, None).is_ok() {
        let _ = kill(nix_pid, Signal::SIGKILL);
    }
}
