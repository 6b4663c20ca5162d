//! TOML configuration for AutoTestLab.
//!
//! One section per concern, every field defaulted so a partial file (or no
//! file at all) yields a working setup. The loaded [`LabConfig`] is built once
//! at startup and handed to each component.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "autotestlab.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the dashboard process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LabConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve configuration from, in order:
    /// 1. An explicit path (from `--config` or `AUTOTESTLAB_CONFIG`); an
    ///    explicit path that cannot be loaded is an error.
    /// 2. `./autotestlab.toml` if it exists.
    /// 3. Compiled-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::load(local);
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port the dashboard binds to.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// How the external test command is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Test runner executable, resolved through `PATH`.
    pub program: String,
    /// Extra arguments placed before the flags and the target.
    pub args: Vec<String>,
    /// Directory holding the whole suite.
    pub suite_dir: PathBuf,
    /// Execution root; the child runs here and it is exported on
    /// `import_path_var`.
    pub working_dir: PathBuf,
    /// Pass `--maxfail=1` on whole-suite runs.
    pub stop_on_first_failure: bool,
    /// Pass `--disable-warnings`.
    pub suppress_warnings: bool,
    /// Environment variable that makes the execution root importable.
    pub import_path_var: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: "pytest".to_string(),
            args: Vec::new(),
            suite_dir: PathBuf::from("autotestlab/tests"),
            working_dir: PathBuf::from("."),
            stop_on_first_failure: true,
            suppress_warnings: true,
            import_path_var: "PYTHONPATH".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Run history persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON document holding the full run history.
    pub history_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from("autotestlab/test_history.json"),
        }
    }
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

/// Uploaded test file handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory uploaded files are written into.
    pub dir: PathBuf,
    /// Accepted file extension, without the leading dot.
    pub extension: String,
    /// Maximum request body size for an upload.
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("autotestlab/uploads"),
            extension: "py".to_string(),
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Tracing output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
