//! Mapping of component errors onto JSON error responses.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::history::HistoryError;
use crate::lab::LabError;
use crate::runner::RunnerError;
use crate::upload::UploadError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Run(#[from] RunnerError),

    #[error("{action}: {source}")]
    History {
        action: &'static str,
        #[source]
        source: HistoryError,
    },

    #[error("test run aborted: {0}")]
    Aborted(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("malformed upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("failed to render dashboard: {0}")]
    Render(#[from] askama::Error),
}

impl ApiError {
    pub fn history(action: &'static str, source: HistoryError) -> Self {
        ApiError::History { action, source }
    }
}

impl From<LabError> for ApiError {
    fn from(err: LabError) -> Self {
        match err {
            LabError::Runner(e) => ApiError::Run(e),
            LabError::History(e) => ApiError::history("Failed to record test result", e),
            LabError::Task(e) => ApiError::Aborted(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Run(e) => {
                error!(error = %e, "test execution failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "message": "Error during test execution",
                        "error": e.to_string(),
                        "details": "",
                        "debug": "",
                    }),
                )
            }
            ApiError::Aborted(e) => {
                error!(error = %e, "test run task did not complete");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "message": "Error during test execution",
                        "error": e.to_string(),
                        "details": "",
                        "debug": "",
                    }),
                )
            }
            ApiError::History { action, source } => {
                error!(error = %source, "{}", action);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": action, "details": source.to_string() }),
                )
            }
            ApiError::Upload(UploadError::NotFound(name)) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("File not found: {name}") }),
            ),
            ApiError::Upload(e @ UploadError::Io { .. }) => {
                error!(error = %e, "upload storage failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to store uploaded file", "details": e.to_string() }),
                )
            }
            ApiError::Upload(e) => {
                warn!(error = %e, "rejected upload");
                (StatusCode::BAD_REQUEST, json!({ "error": e.to_string() }))
            }
            ApiError::Multipart(e) => {
                warn!(error = %e, "rejected upload");
                (e.status(), json!({ "error": e.body_text() }))
            }
            ApiError::Render(e) => {
                error!(error = %e, "dashboard render failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to render dashboard" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
