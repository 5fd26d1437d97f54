//! Engine configuration
//!
//! Loaded from environment variables once at startup. A value of 0 (or an
//! unparsable value) selects the default, so deployments can pin only the
//! knobs they care about.

use std::path::PathBuf;

use tracing::warn;

/// Configuration for the execution engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory under which per-job workspaces are created
    pub workspace_root: PathBuf,
    /// Compile phase wall-clock limit in milliseconds (default: 10000)
    pub compile_timeout_ms: u64,
    /// Run phase wall-clock limit in milliseconds (default: 5000)
    pub run_timeout_ms: u64,
    /// Per-stream capture cap in bytes; output beyond this is discarded
    /// and the result flagged as truncated (default: 1 MiB)
    pub max_output_bytes: usize,
    /// Maximum number of in-flight jobs; excess jobs queue (default: 16)
    pub max_concurrency: usize,
    /// Treat any compiler stderr output as a compile failure even on exit
    /// code 0 (default: true, matching the strict grading policy)
    pub compile_warnings_as_errors: bool,
    /// HTTP listen port (default: 8000)
    pub port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir(),
            compile_timeout_ms: 10_000,
            run_timeout_ms: 5_000,
            max_output_bytes: 1024 * 1024,
            max_concurrency: 16,
            compile_warnings_as_errors: true,
            port: 8000,
        }
    }
}

impl EngineConfig {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset, unparsable, or zero.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            workspace_root: std::env::var("ENGINE_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            compile_timeout_ms: env_nonzero("ENGINE_COMPILE_TIMEOUT_MS", defaults.compile_timeout_ms),
            run_timeout_ms: env_nonzero("ENGINE_RUN_TIMEOUT_MS", defaults.run_timeout_ms),
            max_output_bytes: env_nonzero("ENGINE_MAX_OUTPUT_BYTES", defaults.max_output_bytes as u64)
                as usize,
            max_concurrency: env_nonzero("ENGINE_MAX_CONCURRENCY", defaults.max_concurrency as u64)
                as usize,
            compile_warnings_as_errors: env_bool(
                "ENGINE_COMPILE_WARNINGS_AS_ERRORS",
                defaults.compile_warnings_as_errors,
            ),
            port: env_nonzero("ENGINE_PORT", defaults.port as u64) as u16,
        }
    }
}

fn env_nonzero(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(0) => default,
            Ok(v) => v,
            Err(_) => {
                warn!("Invalid value for {}: {:?}, using default {}", name, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => {
                warn!("Invalid value for {}: {:?}, using default {}", name, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
