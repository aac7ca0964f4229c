//! Screenshot comparison pipeline.

use buildkite_client::{
    fetch_artifacts, locate_reference, ArtifactIndex, BuildHistory, ReferenceLookup,
};
use shotdiff_core::{
    digest_file, AgentMetadata, ComparisonResult, GateError, Result, ScreenshotLayout, Verdict,
};
use std::time::Instant;
use tracing::{info, warn};

use crate::annotation::ReferenceLinks;
use crate::config::GateConfig;
use crate::differ::ImageDiffer;
use crate::report::{ReferenceSummary, RunOutcome, RunReport, ScreenshotError};
use crate::reporter::Reporter;
use crate::sink::AgentSink;

/// Runs one locate → index → fetch → diff → report pass.
pub struct ScreenshotPipeline;

impl ScreenshotPipeline {
    /// Compare every local screenshot against the reference build.
    ///
    /// Locating the reference, listing its artifacts and downloading them are
    /// all-or-nothing: any failure there aborts the run. Missing references
    /// and diff tool failures only affect their own screenshot and are
    /// recorded in the report. Visual regressions are never an `Err`.
    pub async fn run(
        api: &dyn BuildHistory,
        differ: &dyn ImageDiffer,
        sink: &dyn AgentSink,
        config: &GateConfig,
        metadata: &AgentMetadata,
    ) -> Result<RunReport> {
        let start = Instant::now();
        let layout = ScreenshotLayout::new(&config.root);

        info!(branch = %config.branch, root = %config.root.display(), "Starting screenshot comparison");

        let lookup = locate_reference(api, &config.branch, metadata).await?;

        let (outcome, index) = match &lookup {
            ReferenceLookup::NoReferenceBuild => {
                println!("No passing build on {} - nothing to compare", config.branch);
                return Ok(RunReport::new(
                    RunOutcome::NoReferenceBuild,
                    &config.branch,
                    config.threshold,
                ));
            }
            ReferenceLookup::NoMatchingJob { .. } => (RunOutcome::NoMatchingJob, ArtifactIndex::empty()),
            ReferenceLookup::Found { job, .. } => {
                println!(
                    "Using Job: {}",
                    job.artifacts_url.as_deref().unwrap_or(job.id.as_str())
                );
                (RunOutcome::Compared, ArtifactIndex::collect(api, job).await?)
            }
        };

        let mut report = RunReport::new(outcome, &config.branch, config.threshold);
        report.reference = lookup.build().map(|build| ReferenceSummary {
            build_number: build.number,
            build_url: build.web_url.clone(),
            job_id: lookup.job().map(|j| j.id.clone()),
            job_url: lookup.job().and_then(|j| j.web_url.clone()),
        });

        println!("Downloading {} artifacts...", index.len());
        let fetched = fetch_artifacts(api, &index, &layout, config.concurrency).await?;
        report.downloaded = fetched.downloaded;

        let links = ReferenceLinks {
            current_build_url: config.current_build_url.clone(),
            reference_build_number: lookup.build().map(|b| b.number),
            reference_build_url: lookup.build().and_then(|b| b.web_url.clone()),
            reference_job_url: lookup.job().and_then(|j| j.web_url.clone()),
        };
        let mut reporter = Reporter::new(sink, links, &config.annotation_context);

        for path in layout.discover()? {
            if !index.contains(&path) {
                reporter.missing(&path);
                report.missing.push(path);
                continue;
            }

            match compare_one(differ, &layout, &path, config.threshold).await {
                Ok(result) => {
                    reporter.report(&result).await;
                    report.results.push(result);
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Comparison failed");
                    println!("!! Error {path} : {e}");
                    report.errors.push(ScreenshotError {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        }

        report.sink_errors = reporter.into_sink_errors();

        info!(
            compared = report.results.len(),
            failed = report.failed_count(),
            missing = report.missing.len(),
            errors = report.errors.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Screenshot comparison finished"
        );
        Ok(report)
    }
}

/// Diff one screenshot that exists in both builds.
///
/// Byte-identical files score 0 without invoking the diff tool, unless a
/// zero score would still fail, in which case the diff image is produced.
async fn compare_one(
    differ: &dyn ImageDiffer,
    layout: &ScreenshotLayout,
    path: &str,
    threshold: f64,
) -> Result<ComparisonResult> {
    let current = layout.current_path(path);
    let reference = layout.comparison_path(path);
    let current_digest = digest_file(&current)?;
    let reference_digest = digest_file(&reference)?;

    let identical = current_digest == reference_digest;
    let (score, diff) = if identical && Verdict::classify(0.0, threshold) == Verdict::Pass {
        (0.0, None)
    } else {
        let diff = layout.diff_path(path);
        let score = differ
            .diff(&current, &reference, &diff)
            .await
            .map_err(|e| GateError::DiffTool {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        (score, Some(diff))
    };

    Ok(ComparisonResult {
        path: path.to_string(),
        score,
        threshold,
        verdict: Verdict::classify(score, threshold),
        current,
        reference,
        diff,
        current_digest,
        reference_digest,
    })
}
