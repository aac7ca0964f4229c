//! REST implementation of [`BuildHistory`].

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use shotdiff_core::{Artifact, Build};
use tracing::debug;

use crate::api::BuildHistory;
use crate::config::BuildkiteConfig;
use crate::error::BuildkiteError;
use crate::Result;

/// Build-history client over HTTPS with bearer authentication
pub struct HttpBuildkite {
    config: BuildkiteConfig,
    http_client: reqwest::Client,
}

impl HttpBuildkite {
    /// Create a new client. The configured timeout applies to every request.
    pub fn new(config: BuildkiteConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| BuildkiteError::InvalidConfig(e.to_string()))?;

        Ok(HttpBuildkite {
            config,
            http_client,
        })
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let mut request = self
            .http_client
            .get(url)
            .query(query)
            .header(ACCEPT, "application/json, */*");
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BuildkiteError::from_reqwest(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BuildkiteError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self.get(url, query).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| BuildkiteError::from_reqwest(e, url))?;
        serde_json::from_slice(&body).map_err(|e| BuildkiteError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl BuildHistory for HttpBuildkite {
    async fn passed_builds(&self, branch: &str, per_page: u32) -> Result<Vec<Build>> {
        let url = self.config.builds_url();
        debug!(url = %url, branch, "Querying passed builds");
        self.get_json(
            &url,
            &[
                ("branch", branch.to_string()),
                ("state", "passed".to_string()),
                ("page", "1".to_string()),
                ("per_page", per_page.to_string()),
            ],
        )
        .await
    }

    async fn artifacts_page(&self, artifacts_url: &str, page: u32) -> Result<Vec<Artifact>> {
        debug!(url = %artifacts_url, page, "Listing artifacts");
        self.get_json(artifacts_url, &[("page", page.to_string())])
            .await
    }

    async fn download(&self, download_url: &str) -> Result<Vec<u8>> {
        let response = self.get(download_url, &[]).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BuildkiteError::from_reqwest(e, download_url))?;
        Ok(bytes.to_vec())
    }
}
