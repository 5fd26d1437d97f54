//! Execution coordinator
//!
//! Orchestrates one job end to end: validate, materialize a workspace,
//! drive the toolchain adapter, classify the outcome, and release the
//! workspace exactly once regardless of which terminal state is reached.

use std::fmt;

use tokio::sync::Semaphore;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::languages::{Language, TemplateVars, ToolchainRegistry};
use crate::runner::{LocalProcessRunner, ProcessRunner};
use crate::toolchain;
use crate::workspace::Workspace;

/// Name of the compiled binary inside each workspace. Unique per job by
/// virtue of the workspace directory being unique.
const BINARY_NAME: &str = "program";

/// One execution request
#[derive(Debug)]
pub struct Job {
    pub id: String,
    pub language: Language,
    pub source_code: String,
    pub stdin: String,
}

impl Job {
    pub fn new(language: Language, source_code: impl Into<String>, stdin: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            language,
            source_code: source_code.into(),
            stdin: stdin.into(),
        }
    }
}

/// Terminal classification of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    CompileError,
    RuntimeError,
    TimedOut,
    InternalError,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Success => "success",
            Outcome::CompileError => "compile_error",
            Outcome::RuntimeError => "runtime_error",
            Outcome::TimedOut => "timed_out",
            Outcome::InternalError => "internal_error",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of one job
#[derive(Debug)]
pub struct ExecutionResult {
    pub outcome: Outcome,
    /// Run phase stdout (empty for compile failures)
    pub stdout: String,
    /// Stderr of the failing phase, or the compile failure message
    pub stderr: String,
    /// Meaningful for Success and RuntimeError
    pub exit_code: i32,
    /// Run phase wall-clock time
    pub duration_ms: u64,
    /// Captured output hit the byte cap and was cut off
    pub truncated: bool,
}

impl ExecutionResult {
    fn internal(err: &anyhow::Error) -> Self {
        Self {
            outcome: Outcome::InternalError,
            stdout: String::new(),
            stderr: format!("{:#}", err),
            exit_code: -1,
            duration_ms: 0,
            truncated: false,
        }
    }
}

/// The execution engine: registry + runner + concurrency gate
pub struct Engine {
    config: EngineConfig,
    registry: ToolchainRegistry,
    runner: Box<dyn ProcessRunner>,
    permits: Semaphore,
}

impl Engine {
    pub fn new(config: EngineConfig, registry: ToolchainRegistry) -> Self {
        let runner = Box::new(LocalProcessRunner::new(config.max_output_bytes));
        Self::with_runner(config, registry, runner)
    }

    /// Construct with a custom runner, e.g. an OS-sandboxed one.
    pub fn with_runner(
        config: EngineConfig,
        registry: ToolchainRegistry,
        runner: Box<dyn ProcessRunner>,
    ) -> Self {
        let permits = Semaphore::new(config.max_concurrency);
        Self {
            config,
            registry,
            runner,
            permits,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one job: validate, compile (if applicable), run, clean up.
    ///
    /// Returns `Err` only for request rejection and pre-workspace faults;
    /// every fault after a workspace exists is classified into the result so
    /// that cleanup is never skipped.
    pub async fn execute(
        &self,
        language: Language,
        source_code: &str,
        stdin: &str,
    ) -> Result<ExecutionResult, EngineError> {
        if source_code.trim().is_empty() {
            return Err(EngineError::validation(
                "Empty code! Please provide some code to execute.",
            ));
        }

        let spec = self.registry.lookup(language).ok_or_else(|| {
            EngineError::validation(format!("Unsupported language: {}", language))
        })?;

        let source_file = spec
            .source_file_name(language, source_code)
            .ok_or_else(|| EngineError::validation("No public class found in the Java source"))?;

        let class = match language {
            Language::Java => source_file.strip_suffix(".java").map(str::to_string),
            _ => None,
        };
        let vars = TemplateVars {
            source: source_file.clone(),
            binary: BINARY_NAME.to_string(),
            class,
        };

        // Bounds fork/exec under load; excess jobs queue here.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| EngineError::Internal(anyhow::anyhow!("engine shutting down: {}", e)))?;

        let job = Job::new(language, source_code, stdin);
        info!("Job {} accepted: language={}", job.id, job.language);

        let workspace = Workspace::acquire(
            &self.config.workspace_root,
            &job.id,
            &source_file,
            &job.source_code,
            &job.stdin,
        )
        .await
        .map_err(EngineError::Internal)?;

        let result = match toolchain::execute(
            self.runner.as_ref(),
            language,
            spec,
            &vars,
            &workspace,
            job.stdin.as_bytes(),
            &self.config,
        )
        .await
        {
            Ok(result) => result,
            Err(e) => {
                error!("Job {} hit an internal fault: {:#}", job.id, e);
                ExecutionResult::internal(&e)
            }
        };

        // Exactly one release per admitted job, on every terminal path.
        // Patterns are rendered so that e.g. "{binary}" matches the real
        // artifact name.
        workspace.release(&vars.render(&spec.artifacts)).await;

        info!(
            "Job {} finished: outcome={}, duration_ms={}",
            job.id, result.outcome, result.duration_ms
        );
        Ok(result)
    }
}
