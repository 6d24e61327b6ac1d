use crate::error::ExtractError;
use crate::models::{ListingFlag, RawListing};
use crate::scrapers::extract::{extract_listing, extract_listing_urls};
use crate::scrapers::traits::ListingSource;
use crate::scrapers::types::ScrapeConfig;
use anyhow::Result;
use tracing::{info, warn};

/// A listing URL that was visited but produced no record
#[derive(Debug, Clone)]
pub struct SkippedListing {
    pub url: String,
    pub reason: &'static str,
    pub message: String,
}

/// Outcome of one collection run
#[derive(Debug, Default)]
pub struct CollectReport {
    pub found_urls: usize,
    pub listings: Vec<RawListing>,
    pub skipped: Vec<SkippedListing>,
}

impl CollectReport {
    pub fn suspect_mileage(&self) -> usize {
        self.listings
            .iter()
            .filter(|l| l.has_flag(ListingFlag::SuspectMileage))
            .count()
    }
}

/// Run the full collection workflow against one page source.
///
/// Detail pages are fetched strictly one after another with a jittered pause
/// in between. Any single listing failure is logged and recorded in
/// `CollectReport::skipped`; only an index-page failure is an error.
pub async fn collect_listings(
    source: &dyn ListingSource,
    config: &ScrapeConfig,
) -> Result<CollectReport> {
    info!("🌐 Opening {} listing index...", source.source_name());
    let index_html = source.index_page().await?;

    let mut urls = extract_listing_urls(&index_html, &config.base_url);
    let found_urls = urls.len();
    info!("🎉 Found {} listings to scrape", found_urls);
    urls.truncate(config.max_listings);

    let mut report = CollectReport {
        found_urls,
        ..Default::default()
    };
    let total = urls.len();

    for (idx, url) in urls.into_iter().enumerate() {
        if idx > 0 {
            tokio::time::sleep(config.listing_delay.sample()).await;
        }
        info!("📋 Processing {}/{}: {}", idx + 1, total, url);

        let outcome = match source.listing_page(&url).await {
            Ok(html) => extract_listing(&url, &html),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(listing) => report.listings.push(listing),
            Err(e) => {
                warn!("🚨 Skipping {} ({}): {}", url, e.reason(), e);
                report.skipped.push(skipped(url, &e));
            }
        }
    }

    info!(
        "✅ Collected {} listings, skipped {}",
        report.listings.len(),
        report.skipped.len()
    );
    Ok(report)
}

fn skipped(url: String, err: &ExtractError) -> SkippedListing {
    SkippedListing {
        url,
        reason: err.reason(),
        message: err.to_string(),
    }
}
