//! Screenshot Diff - visual regression check for CI
//!
//! The `shotdiff` command compares the screenshots of the current build with
//! those of the latest passing build on the trunk branch, run on an agent
//! with the same metadata.
//!
//! Regressions are reported through the agent's annotation panel; the
//! process only exits non-zero when the comparison itself cannot run.

use anyhow::{Context, Result};
use buildkite_client::{BuildkiteConfig, HttpBuildkite};
use clap::Parser;
use shotdiff_ci::{
    AgentSink, BuildkiteAgent, CompareTool, GateConfig, LogSink, RunReport, ScreenshotPipeline,
};
use shotdiff_core::{AgentMetadata, DEFAULT_META_DATA_PREFIX, DEFAULT_THRESHOLD};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "shotdiff")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compare screenshots against the last passing trunk build", long_about = None)]
struct Cli {
    /// Build-history API token
    #[arg(long, env = "BUILDKITE_API_TOKEN", hide_env_values = true)]
    token: String,

    /// Branch whose latest passing build is the baseline
    #[arg(long, default_value = "master")]
    branch: String,

    /// Directory containing screenshots/ (comparison/ and diff/ are written here)
    #[arg(long, default_value = "bin")]
    root: PathBuf,

    /// Scores at or above this are reported as regressions
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Build-history API base URL
    #[arg(long, env = "BUILDKITE_API_URL", default_value = buildkite_client::config::DEFAULT_API_URL)]
    api_url: String,

    /// Organization slug (with --pipeline, restricts the build query to one pipeline)
    #[arg(long, env = "BUILDKITE_ORGANIZATION_SLUG")]
    organization: Option<String>,

    /// Pipeline slug
    #[arg(long, env = "BUILDKITE_PIPELINE_SLUG")]
    pipeline: Option<String>,

    /// Timeout for each HTTP request and external command, in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Environment prefix of this agent's metadata tags
    #[arg(long, default_value = DEFAULT_META_DATA_PREFIX)]
    meta_data_prefix: String,

    /// URL of the build being checked, linked from annotations
    #[arg(long, env = "BUILDKITE_BUILD_URL")]
    build_url: Option<String>,

    /// Annotation context failures are appended to
    #[arg(long, default_value = shotdiff_ci::config::DEFAULT_ANNOTATION_CONTEXT)]
    annotation_context: String,

    /// Concurrent reference downloads
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Image comparison program
    #[arg(long, default_value = "compare")]
    compare_bin: PathBuf,

    /// CI agent program used for uploads and annotations
    #[arg(long, default_value = "buildkite-agent")]
    agent_bin: PathBuf,

    /// Write a JSON report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Compare but do not upload or annotate
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn buildkite_config(&self) -> BuildkiteConfig {
        let mut config = BuildkiteConfig::new(&self.api_url)
            .with_token(&self.token)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let (Some(org), Some(pipeline)) = (&self.organization, &self.pipeline) {
            config = config.with_pipeline(org, pipeline);
        }
        config
    }

    fn gate_config(&self) -> GateConfig {
        let mut config = GateConfig::new(&self.root)
            .with_branch(&self.branch)
            .with_threshold(self.threshold)
            .with_current_build_url(self.build_url.clone())
            .with_concurrency(self.concurrency);
        config.annotation_context = self.annotation_context.clone();
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    shotdiff_core::init_tracing(cli.json, level);

    let report = run(&cli).await?;

    println!();
    println!("{}", report.summary());
    for failure in report.failures() {
        println!("  changed: {} ({:.2})", failure.path, failure.score);
    }

    if let Some(path) = &cli.report {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Report written");
    }

    Ok(())
}

async fn run(cli: &Cli) -> Result<RunReport> {
    let api = HttpBuildkite::new(cli.buildkite_config())
        .context("Failed to create build-history client")?;
    let timeout = Duration::from_secs(cli.timeout_secs);
    let differ = CompareTool::new(&cli.compare_bin).with_timeout(timeout);
    let metadata = AgentMetadata::from_env(&cli.meta_data_prefix);
    let config = cli.gate_config();

    info!(tags = metadata.len(), "Captured agent metadata");

    let sink: Box<dyn AgentSink> = if cli.dry_run {
        Box::new(LogSink::new())
    } else {
        Box::new(BuildkiteAgent::new(&cli.agent_bin, &cli.root).with_timeout(timeout))
    };

    ScreenshotPipeline::run(&api, &differ, sink.as_ref(), &config, &metadata)
        .await
        .context("Screenshot comparison failed")
}
