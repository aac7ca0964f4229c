//! Error types for buildkite-client

use shotdiff_core::GateError;
use thiserror::Error;

/// Errors that can occur while talking to the build-history API
#[derive(Error, Debug)]
pub enum BuildkiteError {
    /// The server answered with a non-success status
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The request did not complete within the configured timeout
    #[error("GET {url} timed out")]
    Timeout { url: String },

    /// Connection, TLS or protocol failure
    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// The response body was not the expected JSON shape
    #[error("Unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    /// An artifact path would escape the comparison directory
    #[error("Unsafe artifact path: {0}")]
    UnsafeArtifactPath(String),

    /// Client configuration is unusable
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildkiteError {
    pub(crate) fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            BuildkiteError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            BuildkiteError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            BuildkiteError::Transport(err.to_string())
        }
    }
}

impl From<BuildkiteError> for GateError {
    fn from(err: BuildkiteError) -> Self {
        match err {
            BuildkiteError::UnsafeArtifactPath(path) => GateError::UnsafeArtifactPath(path),
            BuildkiteError::Io(e) => GateError::Io(e),
            other => GateError::Network(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_network_failure() {
        let err: GateError = BuildkiteError::Status {
            url: "https://api.example.org/builds".to_string(),
            status: 401,
        }
        .into();
        assert!(matches!(err, GateError::Network(ref m) if m.contains("401")));
    }

    #[test]
    fn test_unsafe_path_keeps_its_kind() {
        let err: GateError = BuildkiteError::UnsafeArtifactPath("../x".to_string()).into();
        assert!(matches!(err, GateError::UnsafeArtifactPath(_)));
    }
}
