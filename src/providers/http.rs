use crate::providers::util::with_retry;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tracing::debug;

const RETRY_DELAY_MS: u64 = 250;

/// Outbound GET returning the raw response body.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
    retries: usize,
}

impl ReqwestFetcher {
    pub fn new(user_agent: &str, retries: usize) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(ReqwestFetcher { client, retries })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!("Requesting {}", url);
        let response = with_retry(|| self.client.get(url).send(), self.retries, RETRY_DELAY_MS)
            .await
            .with_context(|| format!("Request error for URL: {url}"))?;

        debug!(response = ?response, "Received response");

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} when fetching {}",
                response.status(),
                url
            ));
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {url}"))
    }
}
