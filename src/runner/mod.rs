//! External test command wrapper -- spawn, capture output, scrape counts.

pub mod extract;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;

pub use extract::{extract, strip_ansi, Summary, TestStatus};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("test target does not exist: {path}")]
    TargetMissing { path: PathBuf },

    #[error("test command `{program}` not found; is it installed and on PATH?")]
    CommandNotFound { program: String },

    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// What to run the test command against.
#[derive(Debug, Clone)]
pub enum Target {
    /// The whole configured suite directory.
    Suite(PathBuf),
    /// A single uploaded test file.
    File(PathBuf),
}

impl Target {
    pub fn path(&self) -> &Path {
        match self {
            Target::Suite(p) | Target::File(p) => p,
        }
    }
}

/// Raw result of one invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// `None` when the child was killed by a signal.
    pub returncode: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs the configured test command.
#[derive(Debug, Clone)]
pub struct TestRunner {
    config: RunnerConfig,
}

impl TestRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Target for a whole-suite run.
    pub fn suite(&self) -> Target {
        Target::Suite(self.config.suite_dir.clone())
    }

    /// Absolute execution root. Relative targets are resolved against it.
    pub fn execution_root(&self) -> PathBuf {
        let dir = &self.config.working_dir;
        if dir.is_absolute() {
            return dir.clone();
        }
        match std::env::current_dir() {
            Ok(cwd) if dir == Path::new(".") => cwd,
            Ok(cwd) => cwd.join(dir),
            Err(_) => dir.clone(),
        }
    }

    /// Arguments passed to the program for `target`, in order.
    pub fn command_args(&self, target: &Target) -> Vec<String> {
        let mut args = self.config.args.clone();
        if self.config.stop_on_first_failure && matches!(target, Target::Suite(_)) {
            args.push("--maxfail=1".to_string());
        }
        if self.config.suppress_warnings {
            args.push("--disable-warnings".to_string());
        }
        args.push(target.path().to_string_lossy().into_owned());
        args
    }

    /// Run the test command against `target` and wait for it to exit.
    ///
    /// The child inherits the environment, runs in the execution root and
    /// sees that root on the configured import-path variable.
    pub async fn run(&self, target: &Target) -> Result<Invocation, RunnerError> {
        let root = self.execution_root();
        let path = target.path();
        if !root.join(path).exists() {
            return Err(RunnerError::TargetMissing {
                path: path.to_path_buf(),
            });
        }

        let args = self.command_args(target);

        info!(program = %self.config.program, target = %path.display(), "Starting test run");
        debug!(?args, root = %root.display(), "test command line");

        let output = Command::new(&self.config.program)
            .args(&args)
            .current_dir(&root)
            .env(&self.config.import_path_var, &root)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RunnerError::CommandNotFound {
                    program: self.config.program.clone(),
                },
                _ => RunnerError::Spawn {
                    program: self.config.program.clone(),
                    source: e,
                },
            })?;

        let invocation = Invocation {
            returncode: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if invocation.returncode.is_none() {
            warn!(target = %path.display(), "test process terminated by signal");
        }
        info!(target = %path.display(), returncode = ?invocation.returncode, "Test run finished");

        Ok(invocation)
    }
}
