//! Build-history client configuration

use std::time::Duration;

/// Public REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.buildkite.com/v2";

/// Per-request timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Build-history API configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildkiteConfig {
    /// API base URL, without trailing slash
    pub api_url: String,
    /// Bearer token
    pub token: Option<String>,
    /// Organization slug; together with `pipeline` narrows the build query
    pub organization: Option<String>,
    /// Pipeline slug
    pub pipeline: Option<String>,
    /// Applied to every request, downloads included
    pub timeout: Duration,
    pub user_agent: String,
}

impl BuildkiteConfig {
    /// Create config for a specific API endpoint
    pub fn new(api_url: &str) -> Self {
        BuildkiteConfig {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: None,
            organization: None,
            pipeline: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("screenshot-diff/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Restrict build queries to one pipeline
    pub fn with_pipeline(mut self, organization: &str, pipeline: &str) -> Self {
        self.organization = Some(organization.to_string());
        self.pipeline = Some(pipeline.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint listing builds.
    pub fn builds_url(&self) -> String {
        let base = self.api_url.trim_end_matches('/');
        match (&self.organization, &self.pipeline) {
            (Some(org), Some(pipeline)) => {
                format!("{base}/organizations/{org}/pipelines/{pipeline}/builds")
            }
            _ => format!("{base}/builds"),
        }
    }
}
