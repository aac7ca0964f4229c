//! Per-screenshot reporting: log lines, uploads and the accumulated annotation.

use shotdiff_core::{ComparisonResult, ScreenshotLayout};
use tracing::{info, warn};

use crate::annotation::{format_score, render_failure, terminal_link, AnnotationStyle, ReferenceLinks};
use crate::sink::AgentSink;

/// Reports comparison results as they are produced.
///
/// Failures are appended to a single annotation context in the order they
/// are reported; sink errors are collected rather than propagated.
pub struct Reporter<'a> {
    sink: &'a dyn AgentSink,
    links: ReferenceLinks,
    context: String,
    sink_errors: Vec<String>,
}

impl<'a> Reporter<'a> {
    pub fn new(sink: &'a dyn AgentSink, links: ReferenceLinks, context: &str) -> Self {
        Self {
            sink,
            links,
            context: context.to_string(),
            sink_errors: Vec::new(),
        }
    }

    /// Note a local screenshot that has no reference counterpart.
    pub fn missing(&self, path: &str) {
        println!("Missing from previous build: {path}");
        info!(path, "Screenshot missing from previous build");
    }

    pub async fn report(&mut self, result: &ComparisonResult) {
        let score = format_score(result.score);
        if result.passed() {
            println!("Pass {} : {}", result.path, score);
            info!(path = %result.path, score = result.score, "Screenshot matches reference");
            return;
        }

        println!("!! Fail {} : {}", result.path, score);
        warn!(
            path = %result.path,
            score = result.score,
            threshold = result.threshold,
            "Screenshot differs from reference"
        );

        let diff = ScreenshotLayout::diff_artifact(&result.path);
        let reference = ScreenshotLayout::comparison_artifact(&result.path);
        if result.diff.is_some() {
            self.upload(&diff).await;
        }
        self.upload(&reference).await;

        if result.diff.is_some() {
            println!("{}", terminal_link(&diff));
        }

        let body = render_failure(result, &self.links);
        if let Err(e) = self
            .sink
            .annotate(AnnotationStyle::Warning, &self.context, &body)
            .await
        {
            warn!(path = %result.path, error = %e, "Annotation failed");
            self.sink_errors.push(format!("annotate {}: {}", result.path, e));
        }
    }

    /// Sink failures collected so far.
    pub fn into_sink_errors(self) -> Vec<String> {
        self.sink_errors
    }

    async fn upload(&mut self, artifact: &str) {
        if let Err(e) = self.sink.upload_artifact(artifact).await {
            warn!(artifact, error = %e, "Artifact upload failed");
            self.sink_errors.push(format!("upload {artifact}: {e}"));
        }
    }
}
