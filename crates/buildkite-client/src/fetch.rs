//! Download indexed artifacts into the comparison directory.

use futures::stream::{self, StreamExt, TryStreamExt};
use shotdiff_core::{is_safe_artifact_path, IndexedArtifact, ScreenshotLayout};
use tracing::{debug, info};

use crate::api::BuildHistory;
use crate::error::BuildkiteError;
use crate::index::ArtifactIndex;
use crate::Result;

/// Totals for one fetch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub downloaded: usize,
    pub bytes: u64,
}

/// Download every indexed artifact to `<root>/comparison/<path>`.
///
/// Up to `concurrency` downloads are in flight at once (at least one).
/// Any failure aborts the whole fetch: a missing reference image would
/// otherwise hide a real regression. All paths are validated before the
/// first request is made.
pub async fn fetch_artifacts(
    api: &dyn BuildHistory,
    index: &ArtifactIndex,
    layout: &ScreenshotLayout,
    concurrency: usize,
) -> Result<FetchSummary> {
    if let Some(bad) = index.paths().find(|p| !is_safe_artifact_path(p)) {
        return Err(BuildkiteError::UnsafeArtifactPath(bad.to_string()));
    }

    info!(count = index.len(), "Downloading artifacts...");

    let summary = stream::iter(index.iter())
        .map(|entry| download_one(api, entry, layout))
        .buffer_unordered(concurrency.max(1))
        .try_fold(FetchSummary::default(), |mut acc, bytes| async move {
            acc.downloaded += 1;
            acc.bytes += bytes;
            Ok(acc)
        })
        .await?;

    info!(
        downloaded = summary.downloaded,
        bytes = summary.bytes,
        "Reference screenshots downloaded"
    );
    Ok(summary)
}

async fn download_one(
    api: &dyn BuildHistory,
    entry: &IndexedArtifact,
    layout: &ScreenshotLayout,
) -> Result<u64> {
    let bytes = api.download(&entry.artifact.download_url).await?;
    let dest = layout.comparison_path(entry.path());
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&dest, &bytes).await?;
    debug!(path = %entry.path(), dest = %dest.display(), "Downloaded");
    Ok(bytes.len() as u64)
}
