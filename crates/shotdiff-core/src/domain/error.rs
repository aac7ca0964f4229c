//! Error taxonomy for a screenshot-diff run.
//!
//! "No passing build", "no matching job" and screenshots missing from the
//! reference build are outcomes, not errors.

/// Errors produced while locating, fetching or comparing screenshots.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// An HTTP call failed, timed out, or returned a non-success status. Fatal.
    #[error("network failure: {0}")]
    Network(String),

    /// The diff tool failed or printed something that is not a score.
    #[error("diff tool failed for {path}: {message}")]
    DiffTool { path: String, message: String },

    /// An artifact path would escape the comparison directory.
    #[error("refusing unsafe artifact path: {0}")]
    UnsafeArtifactPath(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for screenshot-diff domain operations.
pub type Result<T> = std::result::Result<T, GateError>;
