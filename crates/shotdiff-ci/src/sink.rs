//! Build artifact upload and annotation sink.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::annotation::AnnotationStyle;

/// A failed upload or annotate call.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("{action} timed out after {timeout:?}")]
    Timeout { action: String, timeout: Duration },

    #[error("{action} exited with {code:?}: {stderr}")]
    CommandFailed {
        action: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where regressions are surfaced: build artifacts plus an annotation panel.
#[async_trait]
pub trait AgentSink: Send + Sync {
    /// Upload a file, named relative to the screenshot root, as a build artifact.
    async fn upload_artifact(&self, artifact: &str) -> Result<(), SinkError>;

    /// Append markup to the annotation identified by `context`.
    async fn annotate(
        &self,
        style: AnnotationStyle,
        context: &str,
        body: &str,
    ) -> Result<(), SinkError>;
}

/// The CI agent's own command-line interface.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildkiteAgent {
    pub program: PathBuf,
    /// Uploads are resolved relative to this directory.
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

impl BuildkiteAgent {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn upload_args(artifact: &str) -> Vec<String> {
        vec!["artifact".into(), "upload".into(), artifact.into()]
    }

    pub fn annotate_args(style: AnnotationStyle, context: &str) -> Vec<String> {
        vec![
            "annotate".into(),
            "--style".into(),
            style.as_str().into(),
            "--context".into(),
            context.into(),
            "--append".into(),
        ]
    }

    async fn run(&self, action: &str, args: Vec<String>, stdin: Option<&str>) -> Result<(), SinkError> {
        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.working_dir)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SinkError::Spawn {
                program: self.program.display().to_string(),
                message: e.to_string(),
            })?;

        // Feeding stdin is bounded by the same timeout as the wait.
        let pipe = child.stdin.take();
        let exchange = async move {
            if let (Some(input), Some(mut pipe)) = (stdin, pipe) {
                pipe.write_all(input.as_bytes()).await?;
                pipe.shutdown().await?;
            }
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| SinkError::Timeout {
                action: action.to_string(),
                timeout: self.timeout,
            })??;

        if output.status.success() {
            debug!(action, "agent command succeeded");
            Ok(())
        } else {
            Err(SinkError::CommandFailed {
                action: action.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl AgentSink for BuildkiteAgent {
    async fn upload_artifact(&self, artifact: &str) -> Result<(), SinkError> {
        self.run("artifact upload", Self::upload_args(artifact), None)
            .await
    }

    async fn annotate(
        &self,
        style: AnnotationStyle,
        context: &str,
        body: &str,
    ) -> Result<(), SinkError> {
        self.run("annotate", Self::annotate_args(style, context), Some(body))
            .await
    }
}

/// Dry-run sink: logs what would be uploaded and annotated and keeps the
/// accumulated annotation in memory.
#[derive(Debug, Default)]
pub struct LogSink {
    uploads: Mutex<Vec<String>>,
    annotation: Mutex<String>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn annotation(&self) -> String {
        self.annotation.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentSink for LogSink {
    async fn upload_artifact(&self, artifact: &str) -> Result<(), SinkError> {
        info!(artifact, "Would upload artifact");
        self.uploads.lock().unwrap().push(artifact.to_string());
        Ok(())
    }

    async fn annotate(
        &self,
        style: AnnotationStyle,
        context: &str,
        body: &str,
    ) -> Result<(), SinkError> {
        info!(style = style.as_str(), context, bytes = body.len(), "Would append annotation");
        self.annotation.lock().unwrap().push_str(body);
        Ok(())
    }
}
