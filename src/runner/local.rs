//! Local process runner implementation
//!
//! Spawns the child in its own process group so that a timeout kill also
//! reaps anything the child forked. Output capture is bounded: each stream
//! is read up to a byte cap and drained beyond it, so a runaway program can
//! neither exhaust memory nor block on a full pipe.

use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{CommandSpec, ProcessRunner, RunOutput};

/// Runner that executes commands directly on the host
pub struct LocalProcessRunner {
    /// Per-stream capture cap in bytes
    max_output_bytes: usize,
}

impl LocalProcessRunner {
    pub fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }

    pub async fn execute(
        &self,
        cmd: &CommandSpec,
        stdin: &[u8],
        timeout_ms: u64,
    ) -> Result<RunOutput> {
        debug!("Running {:?} with args {:?}", cmd.program, cmd.args);

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &cmd.work_dir {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn {:?}", cmd.program))?;
        let pid = child.id();

        // Feed stdin from a separate task; the program may exit without
        // reading it, in which case the broken pipe is irrelevant.
        if let Some(mut sink) = child.stdin.take() {
            let bytes = stdin.to_vec();
            tokio::spawn(async move {
                let _ = sink.write_all(&bytes).await;
                let _ = sink.shutdown().await;
            });
        }

        let stdout_task = spawn_capture(child.stdout.take(), self.max_output_bytes);
        let stderr_task = spawn_capture(child.stderr.take(), self.max_output_bytes);

        let (exit_code, timed_out) =
            match tokio::time::timeout(Duration::from_millis(timeout_ms), child.wait()).await {
                Ok(status) => {
                    let status = status.context("failed to wait for child process")?;
                    (status.code().unwrap_or(-1), false)
                }
                Err(_) => {
                    kill_process_group(pid);
                    if let Err(e) = child.wait().await {
                        warn!("Failed to reap timed-out child {:?}: {}", pid, e);
                    }
                    (-1, true)
                }
            };

        let duration_ms = started.elapsed().as_millis() as u64;

        // Capture tasks finish once the pipes close, which the kill above
        // guarantees for the timeout path.
        let (stdout_bytes, stdout_truncated) = stdout_task.await.unwrap_or_default();
        let (stderr_bytes, stderr_truncated) = stderr_task.await.unwrap_or_default();

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
            exit_code,
            timed_out,
            truncated: stdout_truncated || stderr_truncated,
            duration_ms,
        })
    }
}

#[async_trait]
impl ProcessRunner for LocalProcessRunner {
    async fn run(&self, cmd: &CommandSpec, stdin: &[u8], timeout_ms: u64) -> Result<RunOutput> {
        self.execute(cmd, stdin, timeout_ms).await
    }
}

/// Read a stream into memory up to `cap` bytes, draining the rest so the
/// child never blocks on a full pipe. Returns the bytes and a truncation flag.
fn spawn_capture<R>(reader: Option<R>, cap: usize) -> JoinHandle<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        let mut truncated = false;
        let Some(mut reader) = reader else {
            return (buf, truncated);
        };

        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    if buf.len() < cap {
                        let take = n.min(cap - buf.len());
                        buf.extend_from_slice(&chunk[..take]);
                        if take < n {
                            truncated = true;
                        }
                    } else {
                        truncated = true;
                    }
                }
                Err(_) => break,
            }
        }
        (buf, truncated)
    })
}

/// Kill the child's whole process group so forked workers die with it.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else { return };
    // The child was spawned with process_group(0), so pgid == pid.
    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!("killpg({}) failed: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
