//! Engine error types

use thiserror::Error;

/// Errors surfaced by the execution engine before or outside job classification.
///
/// Compile failures, runtime failures and timeouts are not errors; they are
/// classified outcomes inside [`crate::engine::ExecutionResult`]. This type
/// covers only request rejection and infrastructure faults that occur before a
/// workspace exists.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request itself is invalid (unsupported language, empty code,
    /// Java source without a public class). Never retried by the caller.
    #[error("{0}")]
    Validation(String),

    /// Infrastructure fault (filesystem failure, spawn failure). The caller
    /// may retry; reflects engine health, not code correctness.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
