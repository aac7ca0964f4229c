//! Comparison results and pass/fail classification.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Scores at or above this are reported as regressions.
pub const DEFAULT_THRESHOLD: f64 = 10.0;

/// Outcome of comparing one screenshot against its reference.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    /// Pass requires the score to be strictly below the threshold, so a score
    /// equal to the threshold (or NaN) fails.
    pub fn classify(score: f64, threshold: f64) -> Self {
        if score < threshold {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// Result of diffing one local screenshot against the reference build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    /// Relative screenshot path, e.g. `screenshots/tests/foo.png`.
    pub path: String,

    /// Mean-absolute-error distance; lower is more similar.
    pub score: f64,

    /// Threshold the score was classified against.
    pub threshold: f64,

    pub verdict: Verdict,

    /// Image produced by the current build.
    pub current: PathBuf,

    /// Image downloaded from the reference build.
    pub reference: PathBuf,

    /// Visual diff written by the diff tool (absent for byte-identical images).
    pub diff: Option<PathBuf>,

    /// SHA-256 of the current image.
    pub current_digest: String,

    /// SHA-256 of the reference image.
    pub reference_digest: String,
}

impl ComparisonResult {
    pub fn passed(&self) -> bool {
        self.verdict.is_pass()
    }
}
