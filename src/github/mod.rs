//! Remote release source - GitHub Releases over the REST API.

use crate::config::GitHubConfig;
use crate::error::{Result, SyncError};
use crate::release::{ReleaseAsset, RemoteRelease};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use std::pin::Pin;

/// Raw asset bytes as they arrive from the network
pub type AssetStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Where releases and their assets come from
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// The `limit` most recent releases of `repo`, newest first.
    async fn list_recent_releases(&self, repo: &str, limit: usize) -> Result<Vec<RemoteRelease>>;

    /// Open a byte stream for one asset.
    async fn download_asset(&self, asset: &ReleaseAsset) -> Result<AssetStream>;
}

/// GitHub REST API client
#[derive(Clone, Debug)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// URL of the release listing endpoint
    pub fn releases_url(&self, repo: &str, limit: usize) -> String {
        format!("{}/repos/{}/releases?per_page={}", self.base_url, repo, limit)
    }

    fn headers(&self, accept: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        if let Some(token) = &self.token {
            // A token with bytes invalid in a header is dropped rather than sent mangled
            if let Ok(mut value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    async fn get(&self, url: &str, accept: &'static str) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(url)
            .headers(self.headers(accept))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Api {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ReleaseSource for GitHubClient {
    async fn list_recent_releases(&self, repo: &str, limit: usize) -> Result<Vec<RemoteRelease>> {
        let url = self.releases_url(repo, limit);
        tracing::debug!("listing releases: {}", url);

        let releases: Vec<RemoteRelease> = self
            .get(&url, "application/vnd.github+json")
            .await?
            .json()
            .await?;

        Ok(releases)
    }

    async fn download_asset(&self, asset: &ReleaseAsset) -> Result<AssetStream> {
        tracing::debug!("downloading asset {} from {}", asset.name, asset.url);

        let response = self.get(&asset.url, "application/octet-stream").await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(SyncError::from))
            .boxed())
    }
}
