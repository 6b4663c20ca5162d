//! The wired-up components: run a target, scrape it, record it.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinError;
use tracing::{info, warn};

use crate::config::LabConfig;
use crate::history::{HistoryError, HistoryStore, TestResult};
use crate::runner::{self, RunnerError, Target, TestRunner};
use crate::upload::UploadArea;

#[derive(Debug, Error)]
pub enum LabError {
    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("test run task failed: {0}")]
    Task(#[from] JoinError),
}

/// Runner, history and upload area built from one [`LabConfig`].
#[derive(Debug)]
pub struct Lab {
    pub runner: TestRunner,
    pub history: Arc<HistoryStore>,
    pub uploads: UploadArea,
}

impl Lab {
    pub fn new(config: &LabConfig) -> Self {
        Self {
            runner: TestRunner::new(config.runner.clone()),
            history: Arc::new(HistoryStore::new(config.storage.history_path.clone())),
            uploads: UploadArea::new(&config.uploads),
        }
    }

    /// Run the whole suite and append the outcome to the history.
    pub async fn run_suite(&self) -> Result<TestResult, LabError> {
        let target = self.runner.suite();
        self.spawn_run(target, None).await
    }

    /// Run one uploaded file and append the outcome, tagged with `filename`.
    pub async fn run_file(&self, path: PathBuf, filename: String) -> Result<TestResult, LabError> {
        self.spawn_run(Target::File(path), Some(filename)).await
    }

    /// The run lives on its own task so that dropping the caller (a client
    /// disconnecting mid-request) neither kills the child nor loses the record.
    async fn spawn_run(
        &self,
        target: Target,
        filename: Option<String>,
    ) -> Result<TestResult, LabError> {
        let handle = tokio::spawn(run_and_record(
            self.runner.clone(),
            Arc::clone(&self.history),
            target,
            filename,
        ));
        handle.await?
    }
}

async fn run_and_record(
    runner: TestRunner,
    history: Arc<HistoryStore>,
    target: Target,
    filename: Option<String>,
) -> Result<TestResult, LabError> {
    let invocation = runner.run(&target).await?;
    let summary = runner::extract(&invocation.stdout);

    if summary.contradicts_exit(invocation.returncode) {
        if summary.summary_found {
            warn!(
                target = %target.path().display(),
                returncode = ?invocation.returncode,
                passed = summary.passed,
                "non-zero exit with no failed count; recording as passed"
            );
        } else {
            warn!(
                target = %target.path().display(),
                returncode = ?invocation.returncode,
                "no pass/fail summary in output of a non-zero exit; recording as passed with zero counts"
            );
        }
    }

    let record = TestResult::from_run(&invocation, &summary, filename);
    history.append(record.clone()).await?;

    info!(
        target = %target.path().display(),
        status = %record.status,
        passed = record.passed,
        failed = record.failed,
        "recorded test run"
    );
    Ok(record)
}
