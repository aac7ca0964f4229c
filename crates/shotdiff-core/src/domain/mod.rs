//! Domain models for screenshot-diff.
//!
//! Canonical definitions for the core entities:
//! - `Build` / `Job`: one CI pipeline execution and its units of work
//! - `Artifact`: a file a job uploaded, tagged with its owning job once indexed
//! - `ComparisonResult`: the outcome of diffing one screenshot

pub mod artifact;
pub mod build;
pub mod comparison;
pub mod error;

// Re-export main types and errors
pub use artifact::{Artifact, IndexedArtifact, JobRef};
pub use build::{Build, Job, RunState};
pub use comparison::{ComparisonResult, Verdict, DEFAULT_THRESHOLD};
pub use error::{GateError, Result};
