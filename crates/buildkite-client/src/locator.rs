//! Reference build lookup.

use shotdiff_core::{matches_agent, AgentMetadata, Build, Job};
use tracing::{debug, info, warn};

use crate::api::BuildHistory;
use crate::Result;

/// Outcome of looking for a baseline to compare against.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceLookup {
    /// The branch has no passing build yet; there is nothing to compare.
    NoReferenceBuild,

    /// A passing build exists but none of its passed jobs ran on an agent
    /// like ours; every local screenshot will be reported missing.
    NoMatchingJob { build: Build },

    /// Baseline job found.
    Found { build: Build, job: Job },
}

impl ReferenceLookup {
    pub fn build(&self) -> Option<&Build> {
        match self {
            ReferenceLookup::NoReferenceBuild => None,
            ReferenceLookup::NoMatchingJob { build } | ReferenceLookup::Found { build, .. } => {
                Some(build)
            }
        }
    }

    pub fn job(&self) -> Option<&Job> {
        match self {
            ReferenceLookup::Found { job, .. } => Some(job),
            _ => None,
        }
    }
}

/// Find the latest passing build on `branch` and, within it, the first
/// passed job whose agent query rules all match `metadata`.
///
/// Jobs without an artifacts listing are never selected.
pub async fn locate_reference(
    api: &dyn BuildHistory,
    branch: &str,
    metadata: &AgentMetadata,
) -> Result<ReferenceLookup> {
    let build = match api.passed_builds(branch, 1).await?.into_iter().next() {
        Some(build) => build,
        None => {
            info!(branch, "No passing build to compare against");
            return Ok(ReferenceLookup::NoReferenceBuild);
        }
    };

    if !build.state.is_passed() {
        warn!(
            build = build.number,
            state = ?build.state,
            "Build history returned a build that did not pass; ignoring it"
        );
        return Ok(ReferenceLookup::NoReferenceBuild);
    }

    let selected = build
        .passed_jobs()
        .filter(|job| job.artifacts_url.is_some())
        .find(|job| {
            let matched = matches_agent(&job.agent_query_rules, metadata);
            debug!(job = %job.id, rules = ?job.agent_query_rules, matched, "Checking job");
            matched
        })
        .cloned();

    match selected {
        Some(job) => {
            info!(
                build = build.number,
                job = %job.id,
                artifacts_url = job.artifacts_url.as_deref().unwrap_or_default(),
                "Using job"
            );
            Ok(ReferenceLookup::Found { build, job })
        }
        None => {
            warn!(
                build = build.number,
                "No job in the reference build matches this agent's metadata"
            );
            Ok(ReferenceLookup::NoMatchingJob { build })
        }
    }
}
