//! API route definitions.

use axum::extract::{Multipart, Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::info;

use super::error::ApiError;
use super::state::AppState;
use crate::dashboard;
use crate::history::TestResult;
use crate::upload::UploadError;

/// Multipart field carrying the uploaded test file.
pub const UPLOAD_FIELD: &str = "file";

pub fn lab_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/health", get(health))
        .route("/run-test", post(run_test))
        .route("/upload-test", post(upload_test))
        .route("/history", get(history))
        .route("/clear-history", delete(clear_history))
        .route("/view-test/{filename}", get(view_test))
}

/// Response body shared by suite runs and upload runs.
fn run_body(record: &TestResult) -> Value {
    let mut body = json!({
        "message": format!("Test {}", record.status),
        "details": record.stdout,
        "debug": record.stderr,
        "passed": record.passed,
        "failed": record.failed,
    });
    if let Some(filename) = &record.filename {
        body["filename"] = json!(filename);
    }
    body
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn run_test(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    info!("suite run requested");
    let record = state.lab.run_suite().await?;
    Ok(Json(run_body(&record)))
}

async fn upload_test(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let raw_name = field.file_name().unwrap_or_default().to_string();
        let contents = field.bytes().await?;
        upload = Some((raw_name, contents));
        break;
    }

    let (raw_name, contents) = upload.ok_or(UploadError::MissingFile)?;
    let (filename, path) = state.lab.uploads.store(&raw_name, &contents).await?;

    info!(%filename, "upload run requested");
    let record = state.lab.run_file(path, filename).await?;
    Ok(Json(run_body(&record)))
}

async fn history(State(state): State<AppState>) -> Json<Vec<TestResult>> {
    Json(state.lab.history.read_all().await)
}

async fn clear_history(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state
        .lab
        .history
        .clear()
        .await
        .map_err(|e| ApiError::history("Failed to clear history", e))?;
    Ok(Json(json!({ "message": "History cleared" })))
}

async fn view_test(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<String, ApiError> {
    let (_, content) = state.lab.uploads.read(&filename).await?;
    Ok(content)
}
