//! Toolchain adapter - folds compile and run phases into one outcome
//!
//! Translates a job's toolchain recipe into at most two process runner
//! invocations. Compiled languages (C, C++, Java) get a compile phase whose
//! failure short-circuits the job; interpreted languages (Python) go
//! straight to the run phase.

use anyhow::Result;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::engine::{ExecutionResult, Outcome};
use crate::languages::{Language, TemplateVars, ToolchainSpec};
use crate::runner::{CommandSpec, ProcessRunner, RunOutput};
use crate::workspace::Workspace;

/// Run the compile phase (if any) then the run phase inside `workspace`,
/// classifying the raw process results.
pub async fn execute(
    runner: &dyn ProcessRunner,
    language: Language,
    spec: &ToolchainSpec,
    vars: &TemplateVars,
    workspace: &Workspace,
    stdin: &[u8],
    config: &EngineConfig,
) -> Result<ExecutionResult> {
    if let Some(template) = &spec.compile_command {
        let cmd = CommandSpec::from_vec(&vars.render(template)).with_work_dir(workspace.path());
        debug!("Compiling {} with {:?} {:?}", language, cmd.program, cmd.args);

        let out = runner.run(&cmd, b"", config.compile_timeout_ms).await?;

        let warnings_fail = config.compile_warnings_as_errors && !out.stderr.trim().is_empty();
        if out.timed_out || out.exit_code != 0 || warnings_fail {
            return Ok(ExecutionResult {
                outcome: Outcome::CompileError,
                stdout: String::new(),
                stderr: compile_failure_message(&out),
                exit_code: out.exit_code,
                duration_ms: 0,
                truncated: out.truncated,
            });
        }

        if !out.stderr.trim().is_empty() {
            warn!("Compiler warnings for {} job: {}", language, out.stderr.trim());
        }
    }

    let cmd = CommandSpec::from_vec(&vars.render(&spec.run_command)).with_work_dir(workspace.path());
    debug!("Running {} with {:?} {:?}", language, cmd.program, cmd.args);

    let out = runner.run(&cmd, stdin, config.run_timeout_ms).await?;
    let stderr = filter_runtime_noise(&out.stderr);

    let outcome = if out.timed_out {
        Outcome::TimedOut
    } else if out.exit_code != 0 || !stderr.trim().is_empty() {
        Outcome::RuntimeError
    } else {
        Outcome::Success
    };

    Ok(ExecutionResult {
        outcome,
        stdout: out.stdout,
        stderr,
        exit_code: out.exit_code,
        duration_ms: out.duration_ms,
        truncated: out.truncated,
    })
}

fn compile_failure_message(out: &RunOutput) -> String {
    if out.timed_out {
        "Compilation timed out".to_string()
    } else if !out.stderr.is_empty() {
        out.stderr.clone()
    } else if !out.stdout.is_empty() {
        // javac writes some diagnostics to stdout
        out.stdout.clone()
    } else {
        format!("Compilation failed with exit code {}", out.exit_code)
    }
}

/// Strip JVM housekeeping lines that land on stderr without indicating a
/// failure. Leaves the text untouched when no such line is present.
fn filter_runtime_noise(stderr: &str) -> String {
    if !stderr.contains("Picked up ") {
        return stderr.to_string();
    }
    stderr
        .lines()
        .filter(|line| {
            let line = line.trim();
            !line.starts_with("Picked up JAVA_TOOL_OPTIONS")
                && !line.starts_with("Picked up _JAVA_OPTIONS")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::ToolchainRegistry;
    use crate::runner::LocalProcessRunner;

    fn test_config() -> EngineConfig {
        EngineConfig {
            workspace_root: std::env::temp_dir(),
            run_timeout_ms: 2_000,
            compile_timeout_ms: 5_000,
            ..EngineConfig::default()
        }
    }

    fn shell_vars() -> TemplateVars {
        TemplateVars {
            source: "main.py".into(),
            binary: "program".into(),
            class: None,
        }
    }

    async fn shell_workspace(script: &str, stdin: &str) -> (tempfile::TempDir, Workspace) {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path(), "t", "main.py", script, stdin)
            .await
            .unwrap();
        (root, ws)
    }

    fn shell_spec(toml: &str) -> ToolchainSpec {
        ToolchainRegistry::from_toml_str(toml)
            .unwrap()
            .lookup(Language::Python)
            .unwrap()
            .clone()
    }

    #[tokio::test]
    async fn test_interpreted_success() {
        let spec = shell_spec(
            r#"
[python]
source_file = "main.py"
run_command = "sh {source}"
"#,
        );
        let (_root, ws) = shell_workspace("printf 'Hello, World!\\n'", "").await;
        let runner = LocalProcessRunner::new(1024 * 1024);

        let result = execute(
            &runner,
            Language::Python,
            &spec,
            &shell_vars(),
            &ws,
            b"",
            &test_config(),
        )
        .await
        .unwrap();

        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.stdout, "Hello, World!\n");
        assert_eq!(result.exit_code, 0);
        ws.release(&spec.artifacts).await;
    }

    #[tokio::test]
    async fn test_compile_failure_skips_run() {
        // "Compiler" always fails; the run command would print RAN.
        let spec = shell_spec(
            r#"
[python]
source_file = "main.py"
compile_command = "false"
run_command = "echo RAN"
"#,
        );
        let (_root, ws) = shell_workspace("", "").await;
        let runner = LocalProcessRunner::new(1024 * 1024);

        let result = execute(
            &runner,
            Language::Python,
            &spec,
            &shell_vars(),
            &ws,
            b"",
            &test_config(),
        )
        .await
        .unwrap();

        assert_eq!(result.outcome, Outcome::CompileError);
        assert!(result.stdout.is_empty());
        assert!(result.stderr.contains("exit code 1"));
        ws.release(&spec.artifacts).await;
    }

    #[tokio::test]
    async fn test_compile_warnings_fail_by_default() {
        // "Compiler" exits 0 but writes to stderr.
        let spec = shell_spec(
            r#"
[python]
source_file = "main.py"
compile_command = "sh {source}"
run_command = "echo ok"
"#,
        );
        let (_root, ws) = shell_workspace("echo 'warning: unused' >&2", "").await;
        let runner = LocalProcessRunner::new(1024 * 1024);

        let result = execute(
            &runner,
            Language::Python,
            &spec,
            &shell_vars(),
            &ws,
            b"",
            &test_config(),
        )
        .await
        .unwrap();

        assert_eq!(result.outcome, Outcome::CompileError);
        assert!(result.stderr.contains("warning: unused"));
        ws.release(&spec.artifacts).await;
    }

    #[tokio::test]
    async fn test_compile_warnings_tolerated_when_configured() {
        let spec = shell_spec(
            r#"
[python]
source_file = "main.py"
compile_command = "sh {source}"
run_command = "echo ok"
"#,
        );
        let (_root, ws) = shell_workspace("echo 'warning: unused' >&2", "").await;
        let runner = LocalProcessRunner::new(1024 * 1024);
        let config = EngineConfig {
            compile_warnings_as_errors: false,
            ..test_config()
        };

        let result = execute(
            &runner,
            Language::Python,
            &spec,
            &shell_vars(),
            &ws,
            b"",
            &config,
        )
        .await
        .unwrap();

        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.stdout, "ok\n");
        ws.release(&spec.artifacts).await;
    }

    #[tokio::test]
    async fn test_runtime_error_on_nonzero_exit() {
        let spec = shell_spec(
            r#"
[python]
source_file = "main.py"
run_command = "sh {source}"
"#,
        );
        let (_root, ws) = shell_workspace("echo boom >&2; exit 3", "").await;
        let runner = LocalProcessRunner::new(1024 * 1024);

        let result = execute(
            &runner,
            Language::Python,
            &spec,
            &shell_vars(),
            &ws,
            b"",
            &test_config(),
        )
        .await
        .unwrap();

        assert_eq!(result.outcome, Outcome::RuntimeError);
        assert_eq!(result.exit_code, 3);
        assert!(result.stderr.contains("boom"));
        ws.release(&spec.artifacts).await;
    }

    #[tokio::test]
    async fn test_stderr_with_zero_exit_is_runtime_error() {
        let spec = shell_spec(
            r#"
[python]
source_file = "main.py"
run_command = "sh {source}"
"#,
        );
        let (_root, ws) = shell_workspace("echo oops >&2; exit 0", "").await;
        let runner = LocalProcessRunner::new(1024 * 1024);

        let result = execute(
            &runner,
            Language::Python,
            &spec,
            &shell_vars(),
            &ws,
            b"",
            &test_config(),
        )
        .await
        .unwrap();

        assert_eq!(result.outcome, Outcome::RuntimeError);
        assert_eq!(result.exit_code, 0);
        ws.release(&spec.artifacts).await;
    }

    #[tokio::test]
    async fn test_timeout_classified() {
        let spec = shell_spec(
            r#"
[python]
source_file = "main.py"
run_command = "sh {source}"
"#,
        );
        let (_root, ws) = shell_workspace("while true; do :; done", "").await;
        let runner = LocalProcessRunner::new(1024 * 1024);
        let config = EngineConfig {
            run_timeout_ms: 200,
            ..test_config()
        };

        let result = execute(
            &runner,
            Language::Python,
            &spec,
            &shell_vars(),
            &ws,
            b"",
            &config,
        )
        .await
        .unwrap();

        assert_eq!(result.outcome, Outcome::TimedOut);
        ws.release(&spec.artifacts).await;
    }

    #[tokio::test]
    async fn test_stdin_reaches_run_phase() {
        let spec = shell_spec(
            r#"
[python]
source_file = "main.py"
run_command = "sh {source}"
"#,
        );
        let (_root, ws) = shell_workspace("cat", "echo this back\n").await;
        let runner = LocalProcessRunner::new(1024 * 1024);

        let result = execute(
            &runner,
            Language::Python,
            &spec,
            &shell_vars(),
            &ws,
            b"echo this back\n",
            &test_config(),
        )
        .await
        .unwrap();

        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.stdout, "echo this back\n");
        ws.release(&spec.artifacts).await;
    }

    #[test]
    fn test_filter_runtime_noise() {
        let noisy = "Picked up JAVA_TOOL_OPTIONS: -Xmx256m\nreal error";
        assert_eq!(filter_runtime_noise(noisy), "real error");
        assert_eq!(filter_runtime_noise("plain\n"), "plain\n");
        assert_eq!(filter_runtime_noise(""), "");
    }
}
