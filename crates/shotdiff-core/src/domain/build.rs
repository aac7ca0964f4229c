//! Builds and jobs as returned by the build-history API.

use serde::{Deserialize, Serialize};

/// State of a build or a job.
///
/// Only `Passed` matters for reference selection; every state the API may
/// add later deserializes as `Other`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Passed,
    Failed,
    Failing,
    Running,
    Scheduled,
    Blocked,
    Canceled,
    Canceling,
    Skipped,
    NotRun,
    Broken,
    #[default]
    #[serde(other)]
    Other,
}

impl RunState {
    pub fn is_passed(&self) -> bool {
        matches!(self, RunState::Passed)
    }
}

/// One CI pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Build {
    /// API identifier.
    pub id: String,

    /// Sequential build number within the pipeline.
    pub number: u64,

    /// Build state.
    #[serde(default)]
    pub state: RunState,

    #[serde(default)]
    pub branch: Option<String>,

    /// Link to the build page.
    #[serde(default)]
    pub web_url: Option<String>,

    /// Jobs in pipeline order.
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl Build {
    /// Jobs whose own state is `passed`, in pipeline order.
    pub fn passed_jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|job| job.state.is_passed())
    }
}

/// One unit of work within a build, tied to an agent through its query rules.
///
/// Waiter and block steps come back as jobs without rules or artifacts, so
/// everything except the id is optional on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub state: RunState,

    /// `key=value` constraints on the agent that ran this job.
    #[serde(default)]
    pub agent_query_rules: Vec<String>,

    /// Endpoint listing this job's artifacts.
    #[serde(default)]
    pub artifacts_url: Option<String>,

    #[serde(default)]
    pub web_url: Option<String>,
}
