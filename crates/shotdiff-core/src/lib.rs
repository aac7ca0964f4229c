//! Screenshot Diff Core Library
//!
//! Domain types and pure logic shared by the build-history client and the
//! comparison pipeline:
//! - `domain`: builds, jobs, artifacts, comparison results and verdicts
//! - `agent`: matching historical jobs against the current agent's metadata
//! - `layout`: where current, reference and diff screenshots live on disk
//! - `telemetry`: tracing subscriber setup for binaries

pub mod agent;
pub mod domain;
pub mod layout;
pub mod telemetry;

pub use agent::{matches_agent, AgentMetadata, DEFAULT_META_DATA_PREFIX};
pub use domain::{
    Artifact, Build, ComparisonResult, GateError, IndexedArtifact, Job, JobRef, Result, RunState,
    Verdict, DEFAULT_THRESHOLD,
};
pub use layout::{digest_file, is_safe_artifact_path, ScreenshotLayout, SCREENSHOT_PREFIX};
pub use telemetry::init_tracing;
