//! Uploaded test files: name sanitization, extension check, storage.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::UploadConfig;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file part in request")]
    MissingFile,

    #[error("no selected file")]
    EmptyFilename,

    #[error("invalid file type, only .{extension} files are allowed")]
    UnsupportedExtension { extension: String },

    #[error("filename `{0}` has no usable characters")]
    InvalidFilename(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("upload storage error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reduce a client-supplied filename to a single safe path component.
///
/// Path separators become `_`, anything outside `[A-Za-z0-9._-]` is dropped,
/// and leading/trailing dots and underscores are trimmed, so the result can
/// never name a parent directory or a hidden file. Returns `None` when
/// nothing is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(*c, '.' | '_' | '-'))
        .collect();

    let trimmed = kept.trim_matches(|c: char| c == '.' || c == '_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Directory that receives uploaded test files.
#[derive(Debug, Clone)]
pub struct UploadArea {
    dir: PathBuf,
    extension: String,
}

impl UploadArea {
    /// A relative `dir` is anchored at the current directory so stored paths
    /// stay valid whatever directory the test command runs in.
    pub fn new(config: &UploadConfig) -> Self {
        let dir = if config.dir.is_absolute() {
            config.dir.clone()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&config.dir))
                .unwrap_or_else(|_| config.dir.clone())
        };
        Self {
            dir,
            extension: config.extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn has_extension(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }

    /// Validate a client-supplied filename and return its sanitized form.
    pub fn validate(&self, raw_name: &str) -> Result<String, UploadError> {
        if raw_name.trim().is_empty() {
            return Err(UploadError::EmptyFilename);
        }
        if !self.has_extension(raw_name) {
            return Err(UploadError::UnsupportedExtension {
                extension: self.extension.clone(),
            });
        }

        let name = sanitize_filename(raw_name)
            .ok_or_else(|| UploadError::InvalidFilename(raw_name.to_string()))?;
        // Sanitizing can eat the extension (e.g. `.py` alone).
        if !self.has_extension(&name) {
            return Err(UploadError::InvalidFilename(raw_name.to_string()));
        }
        Ok(name)
    }

    /// Validate `raw_name`, write `contents` under its sanitized name and
    /// return that name with the full stored path.
    pub async fn store(&self, raw_name: &str, contents: &[u8]) -> Result<(String, PathBuf), UploadError> {
        let name = self.validate(raw_name)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| UploadError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.dir.join(&name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|source| UploadError::Io {
                path: path.clone(),
                source,
            })?;

        info!(raw = raw_name, stored = %path.display(), bytes = contents.len(), "stored uploaded test file");
        Ok((name, path))
    }

    /// Text of a previously uploaded file.
    pub async fn read(&self, raw_name: &str) -> Result<(String, String), UploadError> {
        let name = sanitize_filename(raw_name)
            .ok_or_else(|| UploadError::NotFound(raw_name.to_string()))?;
        let path = self.dir.join(&name);

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok((name, String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(UploadError::NotFound(name)),
            Err(source) => Err(UploadError::Io { path, source }),
        }
    }

    /// Uploaded test files, sorted by name. A missing directory lists as
    /// empty.
    pub async fn list(&self) -> Result<Vec<PathBuf>, UploadError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(UploadError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut files = Vec::new();
        let io_err = |source: std::io::Error| UploadError::Io {
            path: self.dir.clone(),
            source,
        };
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            let is_file = entry.file_type().await.map_err(io_err)?.is_file();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| self.has_extension(n));
            if is_file && matches {
                files.push(path);
            }
        }
        files.sort();

        debug!(dir = %self.dir.display(), count = files.len(), "listed uploaded test files");
        Ok(files)
    }
}
