use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_INDEX_URL: &str =
    "https://www.autotrader.ca/cars/?rcp=100&rcs=0&prx=100&loc=Toronto%20ON";
pub const DEFAULT_BASE_URL: &str = "https://www.autotrader.ca";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Inclusive range a jittered delay is drawn from
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub fn secs(min: f64, max: f64) -> Self {
        Self {
            min: Duration::from_secs_f64(min),
            max: Duration::from_secs_f64(max),
        }
    }

    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Draw a delay uniformly from the range
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rand::rng().random_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Settings for a collection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Listing index page the detail URLs are collected from
    pub index_url: String,
    /// Origin relative listing links are resolved against
    pub base_url: String,
    /// Upper bound on detail pages visited per run
    pub max_listings: usize,
    /// Bounded wait for a page's required element
    pub wait_timeout: Duration,
    /// Pause after scrolling the index page
    pub index_settle: DelayRange,
    /// Pause between two detail-page navigations
    pub listing_delay: DelayRange,
    pub headless: bool,
    pub user_agent: String,
    /// Where to dump the rendered index page, if anywhere
    pub debug_dir: Option<PathBuf>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_listings: 100,
            wait_timeout: Duration::from_secs(15),
            index_settle: DelayRange::secs(2.0, 3.0),
            listing_delay: DelayRange::secs(3.0, 5.0),
            headless: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            debug_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_in_range() {
        let range = DelayRange::secs(0.1, 0.2);
        for _ in 0..50 {
            let d = range.sample();
            assert!(d >= range.min && d <= range.max, "{:?}", d);
        }
    }

    #[test]
    fn degenerate_range_returns_min() {
        assert_eq!(DelayRange::none().sample(), Duration::ZERO);
        let inverted = DelayRange::secs(2.0, 1.0);
        assert_eq!(inverted.sample(), Duration::from_secs(2));
    }
}
