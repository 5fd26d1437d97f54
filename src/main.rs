mod api;
mod config;
mod engine;
mod error;
mod languages;
mod runner;
mod toolchain;
mod workspace;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::languages::ToolchainRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("codexec=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = EngineConfig::from_env();
    info!(
        "Engine config: compile_timeout_ms={}, run_timeout_ms={}, max_concurrency={}",
        config.compile_timeout_ms, config.run_timeout_ms, config.max_concurrency
    );

    let registry = ToolchainRegistry::builtin()?;
    info!("Loaded built-in toolchain recipes");

    let port = config.port;
    let engine = Arc::new(Engine::new(config, registry));

    let app = api::router(engine);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
