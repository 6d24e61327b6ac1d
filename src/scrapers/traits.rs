use crate::error::ExtractError;
use anyhow::Result;
use async_trait::async_trait;

/// Something that can hand over rendered listing pages.
///
/// Implementations own their session (browser, HTTP client) and are driven
/// one page at a time by the collector.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch the listing index page. Failing here aborts the run.
    async fn index_page(&self) -> Result<String>;

    /// Fetch one detail page. Failing here skips that listing.
    async fn listing_page(&self, url: &str) -> Result<String, ExtractError>;

    /// Get the name of the page source
    fn source_name(&self) -> &'static str;
}
