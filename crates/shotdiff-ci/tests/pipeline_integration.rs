//! End-to-end pipeline runs against the in-memory build history.

use async_trait::async_trait;
use buildkite_client::fakes::MemoryBuildkite;
use serde_json::json;
use shotdiff_ci::{
    AgentSink, AnnotationStyle, DiffError, GateConfig, ImageDiffer, LogSink, RunOutcome,
    ScreenshotPipeline, SinkError,
};
use shotdiff_core::{AgentMetadata, Artifact, Build, GateError, Verdict};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

const LINUX_ARTIFACTS: &str = "https://api.example.org/jobs/linux/artifacts";
const WINDOWS_ARTIFACTS: &str = "https://api.example.org/jobs/windows/artifacts";

/// Differ that returns canned scores keyed by file name and writes a stub
/// diff image.
#[derive(Default)]
struct ScriptedDiffer {
    scores: HashMap<String, f64>,
    calls: Mutex<Vec<PathBuf>>,
}

impl ScriptedDiffer {
    fn with(mut self, file_name: &str, score: f64) -> Self {
        self.scores.insert(file_name.to_string(), score);
        self
    }

    fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageDiffer for ScriptedDiffer {
    async fn diff(&self, current: &Path, _reference: &Path, output: &Path) -> Result<f64, DiffError> {
        self.calls.lock().unwrap().push(current.to_path_buf());
        let name = current.file_name().unwrap().to_string_lossy().to_string();
        let score = *self
            .scores
            .get(&name)
            .ok_or_else(|| DiffError::Unparsable("compare: unable to open image".to_string()))?;
        std::fs::create_dir_all(output.parent().unwrap())?;
        std::fs::write(output, b"diff")?;
        Ok(score)
    }
}

/// Sink whose every call fails.
struct BrokenSink;

#[async_trait]
impl AgentSink for BrokenSink {
    async fn upload_artifact(&self, artifact: &str) -> Result<(), SinkError> {
        Err(SinkError::CommandFailed {
            action: format!("artifact upload {artifact}"),
            code: Some(1),
            stderr: "agent not running".to_string(),
        })
    }

    async fn annotate(&self, _: AnnotationStyle, _: &str, _: &str) -> Result<(), SinkError> {
        Err(SinkError::CommandFailed {
            action: "annotate".to_string(),
            code: Some(1),
            stderr: "agent not running".to_string(),
        })
    }
}

fn linux_agent() -> AgentMetadata {
    AgentMetadata::new().with("queue", "gpu").with("os", "linux")
}

fn reference_build() -> Build {
    serde_json::from_value(json!({
        "id": "b-41",
        "number": 41,
        "state": "passed",
        "branch": "master",
        "web_url": "https://ci.example.org/engine/builds/41",
        "jobs": [
            {
                "id": "windows",
                "state": "passed",
                "agent_query_rules": ["queue=gpu", "os=windows"],
                "artifacts_url": WINDOWS_ARTIFACTS,
                "web_url": "https://ci.example.org/engine/builds/41#windows"
            },
            {
                "id": "linux",
                "state": "passed",
                "agent_query_rules": ["queue=gpu", "os=linux"],
                "artifacts_url": LINUX_ARTIFACTS,
                "web_url": "https://ci.example.org/engine/builds/41#linux"
            }
        ]
    }))
    .unwrap()
}

fn artifact(job: &str, name: &str) -> Artifact {
    Artifact {
        id: format!("{job}-{name}"),
        path: format!("screenshots/tests/{name}"),
        download_url: format!("https://dl.example.org/{job}/{name}"),
        file_size: None,
    }
}

fn write_local(root: &Path, name: &str, bytes: &[u8]) {
    let path = root.join("screenshots").join("tests").join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

/// Reference build with foo.png (identical locally), bar.png (changed
/// locally) and a log file; the windows job carries different bytes.
fn standard_history() -> MemoryBuildkite {
    MemoryBuildkite::new()
        .with_build(reference_build())
        .with_artifact_pages(
            LINUX_ARTIFACTS,
            vec![
                vec![artifact("linux", "foo.png")],
                vec![
                    artifact("linux", "bar.png"),
                    Artifact {
                        id: "log".to_string(),
                        path: "logs/render.log".to_string(),
                        download_url: "https://dl.example.org/linux/render.log".to_string(),
                        file_size: None,
                    },
                ],
            ],
        )
        .with_artifact_pages(
            WINDOWS_ARTIFACTS,
            vec![vec![artifact("windows", "foo.png"), artifact("windows", "qux.png")]],
        )
        .with_blob("https://dl.example.org/linux/foo.png", b"foo-pixels")
        .with_blob("https://dl.example.org/linux/bar.png", b"bar-master")
        .with_blob("https://dl.example.org/windows/foo.png", b"foo-windows")
        .with_blob("https://dl.example.org/windows/qux.png", b"qux-windows")
}

fn setup() -> (TempDir, GateConfig) {
    let dir = tempfile::tempdir().unwrap();
    write_local(dir.path(), "foo.png", b"foo-pixels");
    write_local(dir.path(), "bar.png", b"bar-changed");
    write_local(dir.path(), "baz.png", b"baz-new");
    let config = GateConfig::new(dir.path())
        .with_current_build_url(Some("https://ci.example.org/engine/builds/42".to_string()));
    (dir, config)
}

/// Scenarios A, B and C in one run: identical, changed and new screenshots.
#[tokio::test]
async fn test_pass_fail_and_missing_in_one_run() {
    let (dir, config) = setup();
    let api = standard_history();
    let differ = ScriptedDiffer::default().with("bar.png", 12.0);
    let sink = LogSink::new();

    let report = ScreenshotPipeline::run(&api, &differ, &sink, &config, &linux_agent())
        .await
        .expect("pipeline failed");

    assert_eq!(report.outcome, RunOutcome::Compared);
    assert_eq!(report.downloaded, 2);
    assert_eq!(report.results.len(), 2);

    // Results come back in path order: bar before foo.
    let bar = &report.results[0];
    assert_eq!(bar.path, "screenshots/tests/bar.png");
    assert_eq!(bar.score, 12.0);
    assert_eq!(bar.verdict, Verdict::Fail);
    assert!(dir.path().join("diff/screenshots/tests/bar.png").is_file());

    let foo = &report.results[1];
    assert_eq!(foo.path, "screenshots/tests/foo.png");
    assert_eq!(foo.score, 0.0);
    assert_eq!(foo.verdict, Verdict::Pass);
    assert!(foo.diff.is_none());

    // Identical bytes never reach the diff tool.
    assert_eq!(differ.calls().len(), 1);

    assert_eq!(report.missing, vec!["screenshots/tests/baz.png"]);
    assert!(!dir.path().join("diff/screenshots/tests/baz.png").exists());
    assert!(report.results.iter().all(|r| r.path != "screenshots/tests/baz.png"));

    let annotation = sink.annotation();
    assert!(annotation.contains("bar.png"));
    assert!(annotation.contains("12.0"));
    assert!(!annotation.contains("foo.png"));
    assert!(annotation.contains("https://ci.example.org/engine/builds/42"));
    assert!(annotation.contains("https://ci.example.org/engine/builds/41#linux"));
    assert_eq!(
        sink.uploads(),
        vec![
            "diff/screenshots/tests/bar.png",
            "comparison/screenshots/tests/bar.png",
        ]
    );
}

/// Scenario D: a branch with no passing builds.
#[tokio::test]
async fn test_no_reference_build() {
    let (dir, config) = setup();
    let api = MemoryBuildkite::new();
    let differ = ScriptedDiffer::default();
    let sink = LogSink::new();

    let report = ScreenshotPipeline::run(&api, &differ, &sink, &config, &linux_agent())
        .await
        .expect("pipeline failed");

    assert_eq!(report.outcome, RunOutcome::NoReferenceBuild);
    assert!(report.results.is_empty());
    assert!(report.missing.is_empty());
    assert!(report.reference.is_none());
    assert!(differ.calls().is_empty());
    assert!(!dir.path().join("comparison").exists());
}

/// Scenario E: only the second job matches the agent.
#[tokio::test]
async fn test_index_comes_from_matching_job_only() {
    let (dir, config) = setup();
    let api = standard_history();
    let differ = ScriptedDiffer::default().with("bar.png", 1.0);
    let sink = LogSink::new();

    let report = ScreenshotPipeline::run(&api, &differ, &sink, &config, &linux_agent())
        .await
        .expect("pipeline failed");

    let reference = report.reference.as_ref().unwrap();
    assert_eq!(reference.build_number, 41);
    assert_eq!(reference.job_id.as_deref(), Some("linux"));

    assert!(api.requests().iter().all(|r| !r.contains("windows")));
    assert_eq!(
        std::fs::read(dir.path().join("comparison/screenshots/tests/foo.png")).unwrap(),
        b"foo-pixels"
    );
    assert!(!dir.path().join("comparison/screenshots/tests/qux.png").exists());
    assert!(!dir.path().join("comparison/logs").exists());
}

#[tokio::test]
async fn test_no_matching_job_reports_everything_missing() {
    let (_dir, config) = setup();
    let api = standard_history();
    let differ = ScriptedDiffer::default();
    let sink = LogSink::new();
    let mac = AgentMetadata::new().with("queue", "gpu").with("os", "macos");

    let report = ScreenshotPipeline::run(&api, &differ, &sink, &config, &mac)
        .await
        .expect("pipeline failed");

    assert_eq!(report.outcome, RunOutcome::NoMatchingJob);
    assert_eq!(report.missing.len(), 3);
    assert!(report.results.is_empty());
    assert_eq!(report.downloaded, 0);
    assert_eq!(report.reference.as_ref().unwrap().job_id, None);
}

#[tokio::test]
async fn test_diff_tool_failure_is_isolated() {
    let (dir, config) = setup();
    write_local(dir.path(), "foo.png", b"foo-changed");
    let api = standard_history();
    // No score scripted for foo.png: the differ fails for it.
    let differ = ScriptedDiffer::default().with("bar.png", 3.0);
    let sink = LogSink::new();

    let report = ScreenshotPipeline::run(&api, &differ, &sink, &config, &linux_agent())
        .await
        .expect("pipeline failed");

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].path, "screenshots/tests/bar.png");
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path, "screenshots/tests/foo.png");
    assert!(report.has_regressions());
    assert!(sink.annotation().is_empty());
}

#[tokio::test]
async fn test_download_failure_aborts_run() {
    let (_dir, config) = setup();
    let api = MemoryBuildkite::new()
        .with_build(reference_build())
        .with_artifact_pages(LINUX_ARTIFACTS, vec![vec![artifact("linux", "foo.png")]]);
    let differ = ScriptedDiffer::default();
    let sink = LogSink::new();

    let err = ScreenshotPipeline::run(&api, &differ, &sink, &config, &linux_agent())
        .await
        .unwrap_err();

    assert!(matches!(err, GateError::Network(ref m) if m.contains("404")));
    assert!(differ.calls().is_empty());
}

#[tokio::test]
async fn test_sink_failures_are_not_fatal() {
    let (_dir, config) = setup();
    let api = standard_history();
    let differ = ScriptedDiffer::default().with("bar.png", 25.0);

    let report = ScreenshotPipeline::run(&api, &differ, &BrokenSink, &config, &linux_agent())
        .await
        .expect("pipeline failed");

    assert_eq!(report.failed_count(), 1);
    // Two uploads and one annotate for bar.png.
    assert_eq!(report.sink_errors.len(), 3);
}

#[tokio::test]
async fn test_equal_score_fails_at_threshold() {
    let (_dir, config) = setup();
    let config = config.with_threshold(5.0);
    let api = standard_history();
    let differ = ScriptedDiffer::default().with("bar.png", 5.0);
    let sink = LogSink::new();

    let report = ScreenshotPipeline::run(&api, &differ, &sink, &config, &linux_agent())
        .await
        .expect("pipeline failed");

    assert_eq!(report.results[0].verdict, Verdict::Fail);
    assert!(sink.annotation().contains("5.00 &gt;= 5.00"));
}

/// With a zero threshold even identical bytes fail, so the diff image has to
/// exist for the annotation to point at it.
#[tokio::test]
async fn test_zero_threshold_diffs_identical_screenshots() {
    let (dir, config) = setup();
    let config = config.with_threshold(0.0);
    let api = standard_history();
    let differ = ScriptedDiffer::default()
        .with("bar.png", 12.0)
        .with("foo.png", 0.0);
    let sink = LogSink::new();

    let report = ScreenshotPipeline::run(&api, &differ, &sink, &config, &linux_agent())
        .await
        .expect("pipeline failed");

    let foo = &report.results[1];
    assert_eq!(foo.path, "screenshots/tests/foo.png");
    assert_eq!(foo.score, 0.0);
    assert_eq!(foo.verdict, Verdict::Fail);
    assert!(foo.diff.is_some());
    assert!(dir.path().join("diff/screenshots/tests/foo.png").is_file());
    assert_eq!(differ.calls().len(), 2);

    assert!(sink
        .uploads()
        .contains(&"diff/screenshots/tests/foo.png".to_string()));
    assert!(sink
        .annotation()
        .contains("src=\"artifact://diff/screenshots/tests/foo.png\""));
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let (_dir, config) = setup();
    let api = standard_history();
    let differ = ScriptedDiffer::default().with("bar.png", 12.0);

    let first = ScreenshotPipeline::run(&api, &differ, &LogSink::new(), &config, &linux_agent())
        .await
        .expect("first run failed");
    let second = ScreenshotPipeline::run(&api, &differ, &LogSink::new(), &config, &linux_agent())
        .await
        .expect("second run failed");

    let scores = |r: &shotdiff_ci::RunReport| {
        r.results
            .iter()
            .map(|c| (c.path.clone(), c.score, c.verdict))
            .collect::<Vec<_>>()
    };
    assert_eq!(scores(&first), scores(&second));
    assert_eq!(first.missing, second.missing);
}
