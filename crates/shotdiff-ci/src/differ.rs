//! Perceptual image difference via an external `compare` tool.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Why a single comparison produced no score.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("diff tool timed out after {0:?}")]
    Timeout(Duration),

    #[error("diff tool exited with {code:?}: {stderr}")]
    ToolFailed { code: Option<i32>, stderr: String },

    #[error("unparsable diff tool output: {0:?}")]
    Unparsable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Computes a distance between two images and writes a visual diff.
#[async_trait]
pub trait ImageDiffer: Send + Sync {
    /// Compare `current` against `reference`, writing the diff image to
    /// `output`. Returns the numeric score; lower means more similar.
    async fn diff(&self, current: &Path, reference: &Path, output: &Path)
        -> Result<f64, DiffError>;
}

/// Extract the score from diff tool output: the first whitespace-separated
/// token, parsed as a float.
pub fn parse_score(output: &str) -> Result<f64, DiffError> {
    let token = output
        .split_whitespace()
        .next()
        .ok_or_else(|| DiffError::Unparsable(output.to_string()))?;
    token
        .parse::<f64>()
        .map_err(|_| DiffError::Unparsable(token.to_string()))
}

/// ImageMagick `compare` with a fuzz tolerance and the mean-absolute-error
/// metric.
///
/// `compare` exits 0 for similar and 1 for dissimilar images and prints
/// the metric to stderr. Any other exit status is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareTool {
    pub program: PathBuf,
    /// Colour distance, in percent, under which pixels count as equal.
    pub fuzz_percent: f64,
    pub metric: String,
    pub timeout: Duration,
}

impl Default for CompareTool {
    fn default() -> Self {
        Self {
            program: PathBuf::from("compare"),
            fuzz_percent: 2.0,
            metric: "mae".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl CompareTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Argument list, excluding the program itself.
    pub fn args(&self, current: &Path, reference: &Path, output: &Path) -> Vec<std::ffi::OsString> {
        vec![
            "-fuzz".into(),
            format!("{}%", self.fuzz_percent).into(),
            "-metric".into(),
            self.metric.clone().into(),
            current.as_os_str().to_owned(),
            reference.as_os_str().to_owned(),
            output.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl ImageDiffer for CompareTool {
    async fn diff(
        &self,
        current: &Path,
        reference: &Path,
        output: &Path,
    ) -> Result<f64, DiffError> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let child = Command::new(&self.program)
            .args(self.args(current, reference, output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DiffError::Spawn {
                program: self.program.display().to_string(),
                message: e.to_string(),
            })?;

        let out = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| DiffError::Timeout(self.timeout))??;

        let stdout = String::from_utf8_lossy(&out.stdout);
        let stderr = String::from_utf8_lossy(&out.stderr);
        debug!(status = ?out.status.code(), stderr = %stderr.trim(), "compare finished");

        match out.status.code() {
            Some(0) | Some(1) => {}
            code => {
                return Err(DiffError::ToolFailed {
                    code,
                    stderr: stderr.trim().to_string(),
                })
            }
        }

        if stderr.trim().is_empty() {
            parse_score(&stdout)
        } else {
            parse_score(&stderr)
        }
    }
}
