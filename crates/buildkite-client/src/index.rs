//! Screenshot artifacts of the reference job, keyed by path.

use std::collections::BTreeMap;

use shotdiff_core::{Artifact, IndexedArtifact, Job, JobRef, SCREENSHOT_PREFIX};
use tracing::{debug, info, warn};

use crate::api::BuildHistory;
use crate::Result;

/// Path → artifact map built from one job's artifact listing.
///
/// Only paths under [`SCREENSHOT_PREFIX`] are kept. Iteration is in path
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactIndex {
    entries: BTreeMap<String, IndexedArtifact>,
    duplicates: Vec<String>,
    pages_fetched: u32,
}

impl ArtifactIndex {
    /// Index with no entries, used when there is no reference job.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the index from an already-listed set of artifacts.
    ///
    /// A path listed twice is an anomaly: it is logged and recorded in
    /// [`ArtifactIndex::duplicates`], and the later listing wins.
    pub fn from_artifacts<I>(job: &JobRef, artifacts: I) -> Self
    where
        I: IntoIterator<Item = Artifact>,
    {
        let mut entries = BTreeMap::new();
        let mut duplicates = Vec::new();

        for artifact in artifacts {
            if !artifact.path.starts_with(SCREENSHOT_PREFIX) {
                continue;
            }
            let path = artifact.path.clone();
            let indexed = IndexedArtifact {
                artifact,
                job: job.clone(),
            };
            if entries.insert(path.clone(), indexed).is_some() {
                warn!(path = %path, job = %job.id, "Artifact path listed more than once");
                duplicates.push(path);
            }
        }

        ArtifactIndex {
            entries,
            duplicates,
            pages_fetched: 0,
        }
    }

    /// Page through `job`'s artifact listing until an empty page comes back.
    ///
    /// Page 1 is always requested. There is no upper bound on the page
    /// count; the API's pagination contract is trusted to end with an empty
    /// page.
    pub async fn collect(api: &dyn BuildHistory, job: &Job) -> Result<Self> {
        let Some(artifacts_url) = job.artifacts_url.as_deref() else {
            return Ok(Self::empty());
        };

        let mut listed = Vec::new();
        let mut page = 1u32;
        loop {
            let batch = api.artifacts_page(artifacts_url, page).await?;
            debug!(page, count = batch.len(), "Fetched artifact page");
            if batch.is_empty() {
                break;
            }
            listed.extend(batch);
            page += 1;
        }

        let job_ref = JobRef {
            id: job.id.clone(),
            web_url: job.web_url.clone(),
        };
        let mut index = Self::from_artifacts(&job_ref, listed);
        index.pages_fetched = page;

        info!(
            job = %job.id,
            screenshots = index.len(),
            pages = page,
            "Indexed reference artifacts"
        );
        Ok(index)
    }

    pub fn get(&self, path: &str) -> Option<&IndexedArtifact> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexedArtifact> {
        self.entries.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Paths that were listed more than once.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Number of listing pages requested, the terminating empty one included.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }
}
