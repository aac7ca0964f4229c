//! Screenshot Diff CI - visual regression reporting
//!
//! Provides the comparison pipeline that:
//! - Locates the reference build and downloads its screenshots
//! - Diffs every local screenshot against its reference counterpart
//! - Classifies each score against a threshold and annotates regressions

pub mod annotation;
pub mod config;
pub mod differ;
pub mod pipeline;
pub mod report;
pub mod reporter;
pub mod sink;

// Re-export key types
pub use annotation::{AnnotationStyle, ReferenceLinks};
pub use config::GateConfig;
pub use differ::{parse_score, CompareTool, DiffError, ImageDiffer};
pub use pipeline::ScreenshotPipeline;
pub use report::{ReferenceSummary, RunOutcome, RunReport, ScreenshotError};
pub use reporter::Reporter;
pub use sink::{AgentSink, BuildkiteAgent, LogSink, SinkError};
