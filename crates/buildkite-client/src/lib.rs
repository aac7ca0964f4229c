//! Buildkite-Client: build-history access for screenshot-diff
//!
//! Resolves the reference build a screenshot comparison runs against:
//!
//! 1. [`locate_reference`] asks for the latest passing build on the trunk
//!    branch and picks the first passed job whose agent rules match ours.
//! 2. [`ArtifactIndex::collect`] pages through that job's artifacts and keeps
//!    the screenshots.
//! 3. [`fetch_artifacts`] downloads them under `<root>/comparison/`.
//!
//! All network access goes through the [`BuildHistory`] trait; the
//! [`HttpBuildkite`] implementation talks to the REST API and
//! [`fakes::MemoryBuildkite`] serves canned responses for tests.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod fakes;
pub mod fetch;
pub mod index;
pub mod locator;

pub use api::BuildHistory;
pub use client::HttpBuildkite;
pub use config::BuildkiteConfig;
pub use error::BuildkiteError;
pub use fetch::{fetch_artifacts, FetchSummary};
pub use index::ArtifactIndex;
pub use locator::{locate_reference, ReferenceLookup};

/// Result type for build-history operations
pub type Result<T> = std::result::Result<T, BuildkiteError>;
