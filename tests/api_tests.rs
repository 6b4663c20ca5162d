//! Router tests -- drive the HTTP surface with `echo` standing in for pytest.
#![cfg(unix)]

use std::path::Path;

use autotestlab::api::{self, state::AppState};
use autotestlab::config::{LabConfig, RunnerConfig, StorageConfig, UploadConfig};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt; // for `oneshot`

const BOUNDARY: &str = "autotestlab-boundary";

fn config_with(dir: &Path, program: &str, summary: &str) -> LabConfig {
    std::fs::create_dir_all(dir.join("tests")).unwrap();
    LabConfig {
        runner: RunnerConfig {
            program: program.to_string(),
            args: vec![summary.to_string()],
            suite_dir: dir.join("tests"),
            working_dir: dir.to_path_buf(),
            stop_on_first_failure: false,
            suppress_warnings: false,
            ..RunnerConfig::default()
        },
        storage: StorageConfig {
            history_path: dir.join("history.json"),
        },
        uploads: UploadConfig {
            dir: dir.join("uploads"),
            ..UploadConfig::default()
        },
        ..LabConfig::default()
    }
}

fn app(dir: &Path, summary: &str) -> Router {
    api::router(AppState::new(config_with(dir, "echo", summary)))
}

fn multipart_request(field: &str, filename: &str, contents: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: text/x-python\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/upload-test")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1_000_000)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_method(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_run_test_reports_counts_and_records_history() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(dir.path(), "=== 3 failed, 5 passed in 0.20s ===");

    let (status, json) = send_json(&app, with_method("POST", "/run-test")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Test Failed");
    assert_eq!(json["passed"], 5);
    assert_eq!(json["failed"], 3);
    assert!(json["details"].as_str().unwrap().contains("3 failed, 5 passed"));
    assert_eq!(json["debug"], "");
    assert!(json.get("filename").is_none());

    let (status, history) = send_json(&app, get("/history")).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["status"], "Failed");
    assert_eq!(history[0]["returncode"], 0);
    assert!(history[0]["timestamp"].is_string());
}

#[tokio::test]
async fn test_run_test_only_passed() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(dir.path(), "7 passed in 0.01s");

    let (status, json) = send_json(&app, with_method("POST", "/run-test")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Test Passed");
    assert_eq!(json["passed"], 7);
    assert_eq!(json["failed"], 0);
}

#[tokio::test]
async fn test_missing_command_is_500_and_not_recorded() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = config_with(dir.path(), "autotestlab-no-such-runner-xyz", "");
    let app = api::router(AppState::new(config));

    let (status, json) = send_json(&app, with_method("POST", "/run-test")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["message"], "Error during test execution");
    assert!(json["error"].as_str().unwrap().contains("not found"));
    assert_eq!(json["details"], "");

    let (_, history) = send_json(&app, get("/history")).await;
    assert_eq!(history, serde_json::json!([]));
}

#[tokio::test]
async fn test_upload_sanitizes_name_and_runs_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(dir.path(), "1 passed");

    let request = multipart_request("file", "../../etc/passed.py", "def test_ok():\n    assert True\n");
    let (status, json) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["filename"], "etc_passed.py");
    assert_eq!(json["message"], "Test Passed");
    assert_eq!(json["passed"], 1);

    let stored = dir.path().join("uploads").join("etc_passed.py");
    assert!(stored.exists());
    assert!(!dir.path().join("etc").exists());
    // echo prints the target it was given.
    assert!(json["details"]
        .as_str()
        .unwrap()
        .contains(&stored.to_string_lossy().into_owned()));

    let (_, history) = send_json(&app, get("/history")).await;
    assert_eq!(history[0]["filename"], "etc_passed.py");
}

#[tokio::test]
async fn test_upload_wrong_extension_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(dir.path(), "1 passed");

    let (status, json) = send_json(&app, multipart_request("file", "notes.txt", "hello")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains(".py"));

    // Nothing stored, nothing run.
    assert!(!dir.path().join("uploads").join("notes.txt").exists());
    let (_, history) = send_json(&app, get("/history")).await;
    assert_eq!(history, serde_json::json!([]));
}

#[tokio::test]
async fn test_upload_missing_field_and_empty_name() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(dir.path(), "1 passed");

    let (status, json) = send_json(&app, multipart_request("other", "test_a.py", "x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "no file part in request");

    let (status, json) = send_json(&app, multipart_request("file", "", "x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "no selected file");
}

#[tokio::test]
async fn test_view_uploaded_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(dir.path(), "1 passed");

    let source = "def test_view():\n    assert 1 + 1 == 2\n";
    let (status, _) = send_json(&app, multipart_request("file", "test_view.py", source)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/view-test/test_view.py")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), source);

    let (status, json) = send_json(&app, get("/view-test/missing.py")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("missing.py"));
}

#[tokio::test]
async fn test_clear_history() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(dir.path(), "2 passed");

    send_json(&app, with_method("POST", "/run-test")).await;
    send_json(&app, with_method("POST", "/run-test")).await;
    let (_, history) = send_json(&app, get("/history")).await;
    assert_eq!(history.as_array().unwrap().len(), 2);

    let (status, json) = send_json(&app, with_method("DELETE", "/clear-history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "History cleared");

    let (_, history) = send_json(&app, get("/history")).await;
    assert_eq!(history, serde_json::json!([]));
}

#[tokio::test]
async fn test_corrupt_history_reads_as_empty() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(dir.path(), "1 passed");
    std::fs::write(dir.path().join("history.json"), "not json at all").unwrap();

    let (status, history) = send_json(&app, get("/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history, serde_json::json!([]));
}

#[tokio::test]
async fn test_history_write_failures_are_500() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(dir.path(), "2 passed");
    // A directory where the history file should be: it can be neither read
    // nor replaced.
    let history_path = dir.path().join("history.json");
    std::fs::create_dir(&history_path).unwrap();
    std::fs::write(history_path.join("keep"), "existing").unwrap();

    let (status, json) = send_json(&app, with_method("POST", "/run-test")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Failed to record test result");
    assert!(json["details"].as_str().unwrap().contains("history.json"));

    let (status, json) = send_json(&app, with_method("DELETE", "/clear-history")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Failed to clear history");

    assert!(history_path.is_dir());
    assert_eq!(
        std::fs::read_to_string(history_path.join("keep")).unwrap(),
        "existing"
    );
}

#[tokio::test]
async fn test_dashboard_and_health() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(dir.path(), "1 passed");

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<title>AutoTestLab</title>"));

    let (status, json) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());

    let (status, json) = send_json(&app, get("/no/such/route")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not found");
}
