//! Build-history API abstraction.
//!
//! The pipeline only needs three calls; keeping them behind a trait lets the
//! locator, index and fetcher run against [`crate::fakes::MemoryBuildkite`].

use async_trait::async_trait;
use shotdiff_core::{Artifact, Build};

use crate::Result;

/// Read-only access to builds and their artifacts.
///
/// Every call is a single request; implementations must not retry. Any
/// failure is returned to the caller, which aborts the run.
#[async_trait]
pub trait BuildHistory: Send + Sync {
    /// Most recent builds on `branch` with state `passed`, newest first,
    /// at most `per_page` of them.
    async fn passed_builds(&self, branch: &str, per_page: u32) -> Result<Vec<Build>>;

    /// One page (1-based) of a job's artifact listing. An empty page marks
    /// the end of the listing.
    async fn artifacts_page(&self, artifacts_url: &str, page: u32) -> Result<Vec<Artifact>>;

    /// Raw bytes of one artifact.
    async fn download(&self, download_url: &str) -> Result<Vec<u8>>;
}
