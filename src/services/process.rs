//! `process:*` handlers.
//!
//! `process:execCommand` runs to completion. `process:spawn` starts a
//! tracked child whose output lines and exit are pushed to the spawning
//! window as `process:output` and `process:exit` events.

use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::{
    events, ExecOutput, OutputStream, ProcessExec, ProcessExit, ProcessInfo, ProcessKill,
    ProcessList, ProcessOutput, ProcessSpawn,
};
use crate::error::{BridgeError, Result};
use crate::handler::InvokeContext;

/// How long to wait for output readers after the child exits.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

fn command(program: &str, args: &[String], cwd: Option<&std::path::Path>) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    cmd
}

pub async fn exec(req: ProcessExec, _ctx: InvokeContext) -> Result<ExecOutput> {
    let mut cmd = command(&req.command, &req.args, req.cwd.as_deref());
    let run = cmd.output();

    let output = match req.timeout_ms {
        Some(ms) => {
            let limit = Duration::from_millis(ms);
            tokio::time::timeout(limit, run)
                .await
                .map_err(|_| BridgeError::Timeout(limit))?
        }
        None => run.await,
    }
    .map_err(|e| BridgeError::handler(format!("failed to run '{}': {e}", req.command)))?;

    Ok(ExecOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        code: output.status.code(),
    })
}

/// Forward each line of `reader` as a `process:output` event.
fn forward_lines<R>(reader: R, id: u64, stream: OutputStream, ctx: InvokeContext) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let event = ProcessOutput { id, stream, line };
                    if let Err(e) = ctx.emit(events::PROCESS_OUTPUT, &event) {
                        tracing::warn!(process = id, error = %e, "failed to emit output");
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(process = id, ?stream, error = %e, "output stream failed");
                    break;
                }
            }
        }
    })
}

pub async fn spawn(req: ProcessSpawn, ctx: InvokeContext) -> Result<ProcessInfo> {
    let host = ctx.host()?.clone();

    let mut cmd = command(&req.command, &req.args, req.cwd.as_deref());
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd
        .spawn()
        .map_err(|e| BridgeError::handler(format!("failed to spawn '{}': {e}", req.command)))?;

    let (kill_tx, kill_rx) = oneshot::channel::<()>();
    let info = host.with_processes(|table| {
        let info = ProcessInfo {
            id: table.reserve_id(),
            pid: child.id(),
            name: req.name.clone().unwrap_or_else(|| req.command.clone()),
            created_at: Utc::now(),
            window: ctx.window(),
        };
        table.insert(info.clone(), kill_tx);
        info
    });
    let id = info.id;
    tracing::info!(process = id, pid = ?info.pid, name = %info.name, window = ctx.window(), "process spawned");

    let stdout = child
        .stdout
        .take()
        .map(|out| forward_lines(out, id, OutputStream::Stdout, ctx.clone()));
    let stderr = child
        .stderr
        .take()
        .map(|err| forward_lines(err, id, OutputStream::Stderr, ctx.clone()));

    tokio::spawn(async move {
        let exited = tokio::select! {
            status = child.wait() => Some(status),
            _ = kill_rx => None,
        };
        let (status, killed) = match exited {
            Some(status) => (status, false),
            None => {
                if let Err(e) = child.start_kill() {
                    tracing::debug!(process = id, error = %e, "kill failed");
                }
                (child.wait().await, true)
            }
        };

        // Deliver remaining output before the exit event
        for reader in [stdout, stderr].into_iter().flatten() {
            if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, reader).await.is_err() {
                tracing::debug!(process = id, "output still open after exit");
            }
        }

        let code = match status {
            Ok(status) => status.code(),
            Err(e) => {
                tracing::warn!(process = id, error = %e, "failed to reap process");
                None
            }
        };
        host.with_processes(|table| table.remove(id));
        tracing::info!(process = id, ?code, killed, "process exited");

        let exit = ProcessExit { id, code, killed };
        if let Err(e) = ctx.emit(events::PROCESS_EXIT, &exit) {
            tracing::warn!(process = id, error = %e, "failed to emit exit");
        }
    });

    Ok(info)
}

pub async fn kill(req: ProcessKill, ctx: InvokeContext) -> Result<bool> {
    Ok(ctx.host()?.kill_process(req.id))
}

pub async fn list(_: ProcessList, ctx: InvokeContext) -> Result<Vec<ProcessInfo>> {
    Ok(ctx.host()?.processes())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn ctx() -> InvokeContext {
        InvokeContext::new("process:execCommand", 1, 1)
    }

    #[tokio::test]
    async fn test_exec_collects_output() {
        let out = exec(
            ProcessExec {
                command: "sh".into(),
                args: vec!["-c".into(), "echo hello; echo oops >&2; exit 3".into()],
                ..Default::default()
            },
            ctx(),
        )
        .await
        .unwrap();

        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.stderr, "oops\n");
        assert_eq!(out.code, Some(3));
    }

    #[tokio::test]
    async fn test_exec_timeout() {
        let err = exec(
            ProcessExec {
                command: "sleep".into(),
                args: vec!["5".into()],
                timeout_ms: Some(50),
                ..Default::default()
            },
            ctx(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BridgeError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_exec_missing_program() {
        let err = exec(
            ProcessExec {
                command: "definitely-not-a-real-program-xyz".into(),
                ..Default::default()
            },
            ctx(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("failed to run"));
    }

    #[tokio::test]
    async fn test_spawn_needs_host() {
        let err = spawn(
            ProcessSpawn {
                command: "true".into(),
                ..Default::default()
            },
            ctx(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BridgeError::ChannelClosed));
    }
}
