//! AutoTestLab -- a small dashboard around an external test runner.
//!
//! This crate runs a configured test command (pytest by default) over a suite
//! directory or an uploaded file, scrapes pass/fail counts from its output,
//! keeps a JSON run history and serves all of it over HTTP.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod history;
pub mod lab;
pub mod runner;
pub mod upload;

use anyhow::{Context, Result};

use crate::config::LabConfig;

/// Start the AutoTestLab HTTP server on `config.server.bind`.
pub async fn serve(config: LabConfig) -> Result<()> {
    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.server.bind))?;

    tracing::info!(
        history = %config.storage.history_path.display(),
        uploads = %config.uploads.dir.display(),
        suite = %config.runner.suite_dir.display(),
        "Initializing components"
    );
    let app = api::router(api::state::AppState::new(config));

    tracing::info!(%addr, "AutoTestLab listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind TCP listener on {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
