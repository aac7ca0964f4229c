//! Run configuration for the comparison pipeline.

use serde::{Deserialize, Serialize};
use shotdiff_core::DEFAULT_THRESHOLD;
use std::path::PathBuf;

/// Annotation context shared by every failure of one run, so appends land
/// in the same panel.
pub const DEFAULT_ANNOTATION_CONTEXT: &str = "screenshot-diff";

/// Inputs of one pipeline run. Everything the pipeline needs from the
/// environment is resolved into this struct by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateConfig {
    /// Directory containing `screenshots/`, `comparison/` and `diff/`.
    pub root: PathBuf,

    /// Branch whose latest passing build is the baseline.
    pub branch: String,

    /// Scores at or above this fail.
    pub threshold: f64,

    /// Link to the build being checked, used in annotations.
    pub current_build_url: Option<String>,

    /// Annotation context failures are appended to.
    pub annotation_context: String,

    /// Maximum concurrent reference downloads.
    pub concurrency: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("bin"),
            branch: "master".to_string(),
            threshold: DEFAULT_THRESHOLD,
            current_build_url: None,
            annotation_context: DEFAULT_ANNOTATION_CONTEXT.to_string(),
            concurrency: 1,
        }
    }
}

impl GateConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = branch.to_string();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_current_build_url(mut self, url: Option<String>) -> Self {
        self.current_build_url = url;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}
