//! Run history persisted as a single pretty-printed JSON array.
//!
//! Every mutation rewrites the whole document through a temporary sibling
//! file followed by a rename, so readers see either the old or the new array.
//! Read-modify-write cycles are serialized with a `tokio::sync::Mutex`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::runner::{Invocation, Summary, TestStatus};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read history file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write history file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// TestResult
// ---------------------------------------------------------------------------

/// One recorded invocation of the test command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub timestamp: DateTime<Utc>,
    /// Sanitized name of the uploaded file; absent for whole-suite runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub returncode: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub status: TestStatus,
    // Entries written before counts were tracked carry neither field.
    #[serde(default)]
    pub passed: u32,
    #[serde(default)]
    pub failed: u32,
}

impl TestResult {
    /// Build a record from a finished invocation, stamped with the current
    /// time. Colour codes are stripped from both streams.
    pub fn from_run(invocation: &Invocation, summary: &Summary, filename: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            filename,
            returncode: invocation.returncode,
            stdout: crate::runner::strip_ansi(&invocation.stdout),
            stderr: crate::runner::strip_ansi(&invocation.stderr),
            status: summary.status,
            passed: summary.passed,
            failed: summary.failed,
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

/// Append-only run history backed by one JSON file.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Return the path of the history file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every recorded run, oldest first.
    ///
    /// A missing, unreadable or corrupt file reads as an empty history.
    pub async fn read_all(&self) -> Vec<TestResult> {
        match self.load().await {
            Ok(history) => history,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "history unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    /// Current contents for a read-modify-write. Missing or corrupt files
    /// start a fresh history; any other read failure is an error so the
    /// existing file is never overwritten blind.
    async fn load(&self) -> Result<Vec<TestResult>, HistoryError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(HistoryError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str(&content) {
            Ok(history) => Ok(history),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "history corrupt, starting fresh");
                Ok(Vec::new())
            }
        }
    }

    /// Add `record` to the end of the history.
    pub async fn append(&self, record: TestResult) -> Result<(), HistoryError> {
        let _guard = self.write_lock.lock().await;

        let mut history = self.load().await?;
        history.push(record);
        self.write(&history).await?;

        debug!(path = %self.path.display(), entries = history.len(), "history appended");
        Ok(())
    }

    /// Drop every recorded run.
    pub async fn clear(&self) -> Result<(), HistoryError> {
        let _guard = self.write_lock.lock().await;
        self.write(&[]).await?;
        info!(path = %self.path.display(), "history cleared");
        Ok(())
    }

    async fn write(&self, history: &[TestResult]) -> Result<(), HistoryError> {
        let json = serde_json::to_string_pretty(history)?;
        let io_err = |source: std::io::Error| HistoryError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json.as_bytes()).await.map_err(io_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(e));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
