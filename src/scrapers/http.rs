use crate::error::ExtractError;
use crate::scrapers::traits::ListingSource;
use crate::scrapers::types::ScrapeConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

/// Page source that fetches raw server HTML without a browser.
///
/// Works for sites that render listings server-side; pages that need
/// JavaScript come back without their price element and are skipped.
pub struct HttpListingSource {
    client: Client,
    config: ScrapeConfig,
}

impl HttpListingSource {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.wait_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn index_page(&self) -> Result<String> {
        let url = &self.config.index_url;
        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch listing index")?;

        if !response.status().is_success() {
            warn!("Index returned status: {}", response.status());
            anyhow::bail!("Failed to fetch listing index: {}", response.status());
        }

        let html = response.text().await.context("Failed to read response body")?;
        debug!("Downloaded {} bytes of HTML", html.len());
        Ok(html)
    }

    async fn listing_page(&self, url: &str) -> Result<String, ExtractError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractError::Timeout {
                    selector: "response".to_string(),
                    seconds: self.config.wait_timeout.as_secs(),
                }
            } else {
                ExtractError::Navigation(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| ExtractError::Navigation(e.to_string()))
    }

    fn source_name(&self) -> &'static str {
        "AutoTrader (HTTP)"
    }
}
