pub mod browser;
pub mod collect;
pub mod extract;
pub mod http;
pub mod traits;
pub mod types;

pub use browser::AutoTraderBrowserScraper;
pub use collect::{collect_listings, CollectReport, SkippedListing};
pub use extract::{extract_listing, extract_listing_urls, normalize_spec_key};
pub use http::HttpListingSource;
pub use traits::ListingSource;
pub use types::{DelayRange, ScrapeConfig};
