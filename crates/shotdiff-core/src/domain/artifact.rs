//! Artifacts uploaded by a job.

use serde::{Deserialize, Serialize};

/// A file produced by a job, as listed by the artifacts endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    pub id: String,

    /// Path relative to the job's working directory, `/`-separated.
    pub path: String,

    /// Authenticated download endpoint.
    pub download_url: String,

    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Provenance of an indexed artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobRef {
    pub id: String,
    pub web_url: Option<String>,
}

/// An artifact tagged with the job it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedArtifact {
    pub artifact: Artifact,
    pub job: JobRef,
}

impl IndexedArtifact {
    pub fn path(&self) -> &str {
        &self.artifact.path
    }
}
