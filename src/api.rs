//! HTTP boundary consumed by the grading collaborator
//!
//! One endpoint per test-case execution: the caller posts
//! `{language, code, input}` and gets back either the run phase's stdout or
//! a human-readable failure classification.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::{Engine, ExecutionResult, Outcome};
use crate::error::EngineError;
use crate::languages::Language;

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub language: Option<String>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub input: String,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunResponse {
    fn ok(output: String) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(message.into()),
        }
    }
}

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/run", post(run))
        .with_state(engine)
}

async fn health() -> Json<Value> {
    Json(json!({ "online": "engine" }))
}

async fn run(
    State(engine): State<Arc<Engine>>,
    Json(request): Json<RunRequest>,
) -> (StatusCode, Json<RunResponse>) {
    let Some(raw_language) = request.language.as_deref() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(RunResponse::err("Missing language")),
        );
    };

    let Ok(language) = raw_language.parse::<Language>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(RunResponse::err(format!("Unsupported language: {}", raw_language))),
        );
    };

    match engine.execute(language, &request.code, &request.input).await {
        Ok(result) => {
            let status = response_status(&result);
            let body = match result.outcome {
                Outcome::Success => RunResponse::ok(result.stdout),
                _ => RunResponse::err(failure_message(&result, engine.config().run_timeout_ms)),
            };
            (status, Json(body))
        }
        Err(EngineError::Validation(msg)) => (StatusCode::BAD_REQUEST, Json(RunResponse::err(msg))),
        Err(EngineError::Internal(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RunResponse::err(format!("Internal error: {:#}", e))),
        ),
    }
}

fn response_status(result: &ExecutionResult) -> StatusCode {
    match result.outcome {
        Outcome::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    }
}

/// Classification plus, when available, the captured stderr.
fn failure_message(result: &ExecutionResult, run_timeout_ms: u64) -> String {
    match result.outcome {
        Outcome::CompileError => {
            if result.stderr.trim().is_empty() {
                "Compile Error".to_string()
            } else {
                format!("Compile Error\n{}", result.stderr.trim_end())
            }
        }
        Outcome::RuntimeError => {
            if result.stderr.trim().is_empty() {
                format!("Runtime Error (exit code {})", result.exit_code)
            } else {
                format!("Runtime Error\n{}", result.stderr.trim_end())
            }
        }
        Outcome::TimedOut => format!("Time Limit Exceeded: execution exceeded {}ms", run_timeout_ms),
        Outcome::InternalError => format!("Internal error: {}", result.stderr),
        Outcome::Success => String::new(),
    }
}
