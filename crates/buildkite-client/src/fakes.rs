//! In-memory fake of the build-history API (testing only)
//!
//! `MemoryBuildkite` serves canned builds, artifact pages and blobs, and
//! records every request so tests can assert on pagination.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use shotdiff_core::{Artifact, Build};

use crate::api::BuildHistory;
use crate::error::BuildkiteError;
use crate::Result;

/// In-memory build history keyed by URL.
#[derive(Debug, Default)]
pub struct MemoryBuildkite {
    builds: Vec<Build>,
    artifact_pages: HashMap<String, Vec<Vec<Artifact>>>,
    blobs: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryBuildkite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a build; builds are returned in insertion order (newest first).
    pub fn with_build(mut self, build: Build) -> Self {
        self.builds.push(build);
        self
    }

    /// Serve `pages` for `artifacts_url`; any page past the end is empty.
    pub fn with_artifact_pages(mut self, artifacts_url: &str, pages: Vec<Vec<Artifact>>) -> Self {
        self.artifact_pages.insert(artifacts_url.to_string(), pages);
        self
    }

    /// Serve `bytes` for `download_url`; unknown URLs answer 404.
    pub fn with_blob(mut self, download_url: &str, bytes: &[u8]) -> Self {
        self.blobs.insert(download_url.to_string(), bytes.to_vec());
        self
    }

    /// Every request made so far, as `<kind> <target>` lines.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, line: String) {
        self.requests.lock().unwrap().push(line);
    }
}

#[async_trait]
impl BuildHistory for MemoryBuildkite {
    async fn passed_builds(&self, branch: &str, per_page: u32) -> Result<Vec<Build>> {
        self.record(format!("builds {branch}"));
        Ok(self
            .builds
            .iter()
            .filter(|b| b.state.is_passed())
            .filter(|b| b.branch.as_deref().map_or(true, |br| br == branch))
            .take(per_page as usize)
            .cloned()
            .collect())
    }

    async fn artifacts_page(&self, artifacts_url: &str, page: u32) -> Result<Vec<Artifact>> {
        self.record(format!("artifacts {artifacts_url} page={page}"));
        let pages = self.artifact_pages.get(artifacts_url).ok_or_else(|| {
            BuildkiteError::Status {
                url: artifacts_url.to_string(),
                status: 404,
            }
        })?;
        Ok(page
            .checked_sub(1)
            .and_then(|i| pages.get(i as usize))
            .cloned()
            .unwrap_or_default())
    }

    async fn download(&self, download_url: &str) -> Result<Vec<u8>> {
        self.record(format!("download {download_url}"));
        self.blobs
            .get(download_url)
            .cloned()
            .ok_or_else(|| BuildkiteError::Status {
                url: download_url.to_string(),
                status: 404,
            })
    }
}
