//! Process runner - single external process supervision
//!
//! This module provides a unified interface for spawning one external
//! process with a wall-clock watchdog and bounded output capture:
//! - `LocalProcessRunner`: direct execution on the host
//!
//! A hardened deployment plugs an OS-sandboxed implementation into the same
//! trait; nothing above this layer changes.
//!
//! The runner does NOT classify outcomes: a non-zero exit code or stderr
//! output is data returned to the caller, not an error. Only operational
//! failures (spawn failure, wait failure) surface as `Err`.

pub mod local;

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

/// Command specification for execution
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Program path or name
    pub program: String,
    /// Arguments to the program (never shell-interpolated)
    pub args: Vec<String>,
    /// Working directory
    pub work_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Create from a command vector (first element is program, rest are args)
    pub fn from_vec(cmd: &[String]) -> Self {
        let mut iter = cmd.iter();
        let program = iter.next().cloned().unwrap_or_default();
        let args: Vec<String> = iter.cloned().collect();
        Self {
            program,
            args,
            work_dir: None,
        }
    }
}

/// Raw outcome of supervising one process
#[derive(Debug)]
pub struct RunOutput {
    /// Captured stdout, lossy UTF-8
    pub stdout: String,
    /// Captured stderr, lossy UTF-8
    pub stderr: String,
    /// Exit code (-1 when killed by signal or timed out)
    pub exit_code: i32,
    /// The watchdog fired and the process group was killed
    pub timed_out: bool,
    /// One of the streams exceeded the capture cap and was cut off
    pub truncated: bool,
    /// Wall-clock time from spawn to exit/kill
    pub duration_ms: u64,
}

/// Runner trait for supervising external processes
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Spawn `cmd`, feed `stdin` to it, and wait at most `timeout_ms`.
    async fn run(&self, cmd: &CommandSpec, stdin: &[u8], timeout_ms: u64) -> Result<RunOutput>;
}

pub use local::LocalProcessRunner;
