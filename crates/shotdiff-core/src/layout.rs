//! On-disk layout of screenshot directories.
//!
//! ```text
//! <root>/screenshots/tests/**/*.png              current build
//! <root>/comparison/screenshots/tests/**/*.png   reference build (downloaded)
//! <root>/diff/screenshots/tests/**/*.png         diff images
//! ```

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::domain::error::{GateError, Result};

/// Artifact paths outside this prefix are never indexed or compared.
pub const SCREENSHOT_PREFIX: &str = "screenshots/tests/";

const COMPARISON_DIR: &str = "comparison";
const DIFF_DIR: &str = "diff";

/// Resolves relative screenshot paths against a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotLayout {
    root: PathBuf,
}

impl ScreenshotLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ScreenshotLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the current build's screenshots.
    pub fn screenshots_dir(&self) -> PathBuf {
        join_relative(&self.root, SCREENSHOT_PREFIX)
    }

    pub fn comparison_dir(&self) -> PathBuf {
        self.root.join(COMPARISON_DIR)
    }

    pub fn diff_dir(&self) -> PathBuf {
        self.root.join(DIFF_DIR)
    }

    pub fn current_path(&self, rel: &str) -> PathBuf {
        join_relative(&self.root, rel)
    }

    pub fn comparison_path(&self, rel: &str) -> PathBuf {
        join_relative(&self.comparison_dir(), rel)
    }

    pub fn diff_path(&self, rel: &str) -> PathBuf {
        join_relative(&self.diff_dir(), rel)
    }

    /// Artifact name of the diff image, relative to the root.
    pub fn diff_artifact(rel: &str) -> String {
        format!("{DIFF_DIR}/{rel}")
    }

    /// Artifact name of the downloaded reference image, relative to the root.
    pub fn comparison_artifact(rel: &str) -> String {
        format!("{COMPARISON_DIR}/{rel}")
    }

    /// Every `*.png` under the screenshots directory, as `/`-separated paths
    /// relative to the root, sorted lexicographically.
    ///
    /// A missing screenshots directory yields an empty list.
    pub fn discover(&self) -> Result<Vec<String>> {
        let dir = self.screenshots_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for entry in walkdir::WalkDir::new(&dir).follow_links(true) {
            let entry = entry.map_err(|e| GateError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }
            match self.relative(entry.path()) {
                Some(rel) => found.push(rel),
                None => warn!(
                    path = %entry.path().display(),
                    "Skipping screenshot with a non UTF-8 path"
                ),
            }
        }

        found.sort();
        Ok(found)
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
        Some(parts?.join("/"))
    }
}

fn join_relative(base: &Path, rel: &str) -> PathBuf {
    rel.split('/')
        .filter(|segment| !segment.is_empty())
        .fold(base.to_path_buf(), |acc, segment| acc.join(segment))
}

/// Whether an API-supplied artifact path stays inside the directory it is
/// joined onto: relative, `/`-separated, no empty, `.` or `..` segments.
pub fn is_safe_artifact_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && !path.contains(':')
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// SHA-256 of a file's contents, hex encoded.
pub fn digest_file(path: &Path) -> Result<String> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}
