//! Run report: everything one pipeline run found, in a serializable form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shotdiff_core::ComparisonResult;
use std::path::Path;

/// How far the run got.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// No passing build on the branch; nothing was compared.
    NoReferenceBuild,
    /// A reference build exists but no job matched this agent; every local
    /// screenshot is reported missing.
    NoMatchingJob,
    /// Screenshots were compared against the reference job.
    Compared,
}

/// The baseline a run compared against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceSummary {
    pub build_number: u64,
    pub build_url: Option<String>,
    pub job_id: Option<String>,
    pub job_url: Option<String>,
}

/// A screenshot whose comparison could not produce a score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenshotError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub branch: String,
    pub threshold: f64,
    pub reference: Option<ReferenceSummary>,

    /// Reference screenshots downloaded.
    pub downloaded: usize,

    /// One entry per compared screenshot, in path order.
    pub results: Vec<ComparisonResult>,

    /// Local screenshots with no counterpart in the reference build.
    pub missing: Vec<String>,

    /// Per-screenshot diff failures.
    pub errors: Vec<ScreenshotError>,

    /// Upload/annotate failures; logged, never fatal.
    pub sink_errors: Vec<String>,
}

impl RunReport {
    pub fn new(outcome: RunOutcome, branch: &str, threshold: f64) -> Self {
        Self {
            generated_at: Utc::now(),
            outcome,
            branch: branch.to_string(),
            threshold,
            reference: None,
            downloaded: 0,
            results: Vec::new(),
            missing: Vec::new(),
            errors: Vec::new(),
            sink_errors: Vec::new(),
        }
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// Results at or above their threshold, in path order.
    pub fn failures(&self) -> impl Iterator<Item = &ComparisonResult> {
        self.results.iter().filter(|r| !r.passed())
    }

    /// Whether any screenshot regressed or could not be compared.
    pub fn has_regressions(&self) -> bool {
        self.failed_count() > 0 || !self.errors.is_empty()
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        match self.outcome {
            RunOutcome::NoReferenceBuild => {
                format!("No passing build on {} to compare against", self.branch)
            }
            _ => format!(
                "{} compared: {} passed, {} failed, {} missing, {} errors",
                self.results.len(),
                self.passed_count(),
                self.failed_count(),
                self.missing.len(),
                self.errors.len()
            ),
        }
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotdiff_core::Verdict;
    use std::path::PathBuf;

    fn result(path: &str, score: f64) -> ComparisonResult {
        ComparisonResult {
            path: path.to_string(),
            score,
            threshold: 10.0,
            verdict: Verdict::classify(score, 10.0),
            current: PathBuf::from(path),
            reference: PathBuf::from(path),
            diff: None,
            current_digest: String::new(),
            reference_digest: String::new(),
        }
    }

    #[test]
    fn test_counts() {
        let mut report = RunReport::new(RunOutcome::Compared, "master", 10.0);
        report.results = vec![
            result("screenshots/tests/a.png", 0.0),
            result("screenshots/tests/b.png", 12.0),
            result("screenshots/tests/c.png", 10.0),
        ];
        report.missing.push("screenshots/tests/d.png".to_string());

        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.failed_count(), 2);
        let failed: Vec<&str> = report.failures().map(|r| r.path.as_str()).collect();
        assert_eq!(failed, vec!["screenshots/tests/b.png", "screenshots/tests/c.png"]);
        assert!(report.has_regressions());
        assert_eq!(
            report.summary(),
            "3 compared: 1 passed, 2 failed, 1 missing, 0 errors"
        );
    }

    #[test]
    fn test_no_reference_summary() {
        let report = RunReport::new(RunOutcome::NoReferenceBuild, "master", 10.0);
        assert!(!report.has_regressions());
        assert!(report.summary().contains("No passing build on master"));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        let mut report = RunReport::new(RunOutcome::Compared, "master", 10.0);
        report.results.push(result("screenshots/tests/a.png", 1.5));

        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["outcome"], "compared");
        assert_eq!(value["results"][0]["verdict"], "pass");
        assert_eq!(value["results"][0]["score"], 1.5);
    }
}
