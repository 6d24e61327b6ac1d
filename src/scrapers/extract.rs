//! Turns rendered listing pages into `RawListing` records.
//!
//! Nothing here touches the network; the page sources hand over HTML and
//! these functions read it.

use crate::error::ExtractError;
use crate::models::{ListingFlag, RawListing, SpecValue, TITLE_PLACEHOLDER};
use chrono::Utc;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;
use tracing::{debug, warn};

static LISTING_LINK: LazyLock<Selector> = LazyLock::new(|| css("a.inner-link"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| css("p.hero-price"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| css("h1.hero-title"));
static SPEC_KEY: LazyLock<Selector> = LazyLock::new(|| css(r#"span[id^="spec-key-"]"#));
static SPEC_VALUE: LazyLock<Selector> = LazyLock::new(|| css(r#"span[id^="spec-value-"]"#));
static STRONG: LazyLock<Selector> = LazyLock::new(|| css("strong"));

/// Spec keys whose values are distances and get reduced to an integer
pub const MILEAGE_KEYS: [&str; 3] = ["kilometres", "km", "mileage"];

fn css(selector: &'static str) -> Selector {
    Selector::parse(selector).expect("static selector is valid CSS")
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Collect detail-page URLs from a listing index page.
///
/// Only links pointing at an ad (`/a/` in the path) are kept. Relative links
/// are resolved against `base_url`, query strings and fragments are dropped,
/// and duplicates are removed keeping first-seen order.
pub fn extract_listing_urls(html: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        warn!("Invalid base URL {}, no listing links resolved", base_url);
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for link in document.select(&LISTING_LINK) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !href.contains("/a/") {
            continue;
        }
        let Some(url) = canonical_url(&base, href) else {
            debug!("Skipping unresolvable link: {}", href);
            continue;
        };
        if seen.insert(url.clone()) {
            urls.push(url);
        }
    }

    urls
}

fn canonical_url(base: &Url, href: &str) -> Option<String> {
    let mut url = base.join(href).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

/// Normalize a spec label: lowercase, spaces to underscores, apostrophes and
/// hyphens removed.
pub fn normalize_spec_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace(['\'', '-'], "")
}

/// Read one listing detail page.
pub fn extract_listing(url: &str, html: &str) -> Result<RawListing, ExtractError> {
    if html.trim().is_empty() {
        return Err(ExtractError::EmptyPage);
    }

    let document = Html::parse_document(html);
    let mut flags = Vec::new();

    let price_el = document.select(&PRICE).next();
    let title_el = document.select(&TITLE).next();
    let spec_keys: Vec<_> = document.select(&SPEC_KEY).collect();

    if price_el.is_none() && title_el.is_none() && spec_keys.is_empty() {
        return Err(ExtractError::NotAListing);
    }

    let price = match price_el.map(element_text) {
        Some(text) => match parse_price(&text) {
            Some(p) => p,
            None => {
                warn!("Unreadable price '{}' on {}", text, url);
                flags.push(ListingFlag::MissingPrice);
                0
            }
        },
        None => {
            flags.push(ListingFlag::MissingPrice);
            0
        }
    };

    let title = match title_el.map(element_text).filter(|t| !t.is_empty()) {
        Some(t) => t,
        None => {
            flags.push(ListingFlag::MissingTitle);
            TITLE_PLACEHOLDER.to_string()
        }
    };

    let values: HashMap<&str, ElementRef<'_>> = document
        .select(&SPEC_VALUE)
        .filter_map(|el| el.value().id().map(|id| (id, el)))
        .collect();

    let mut specs = BTreeMap::new();
    for key_el in spec_keys {
        let key = normalize_spec_key(&element_text(key_el));
        if key.is_empty() {
            continue;
        }
        let Some(key_id) = key_el.value().id() else {
            continue;
        };
        let value_id = key_id.replace("key", "value");
        let Some(value_el) = values.get(value_id.as_str()) else {
            debug!("No value element {} for spec '{}' on {}", value_id, key, url);
            continue;
        };
        let raw_value = match value_el.select(&STRONG).next() {
            Some(strong) => element_text(strong),
            None => element_text(*value_el),
        };

        if MILEAGE_KEYS.contains(&key.as_str()) {
            let digits: String = raw_value.chars().filter(|c| c.is_ascii_digit()).collect();
            match digits.parse::<i64>() {
                Ok(km) => {
                    specs.insert(key, SpecValue::Integer(km));
                }
                Err(_) => {
                    warn!("⚠️  Invalid kilometre value '{}' on {}", raw_value, url);
                    specs.insert(key, SpecValue::Integer(0));
                    if !flags.contains(&ListingFlag::SuspectMileage) {
                        flags.push(ListingFlag::SuspectMileage);
                    }
                }
            }
        } else {
            specs.insert(key, SpecValue::Text(raw_value));
        }
    }

    Ok(RawListing {
        url: url.to_string(),
        title,
        price,
        specs,
        flags,
        scraped_at: Utc::now(),
    })
}

/// Whole-currency price; cents after the decimal point are dropped.
fn parse_price(text: &str) -> Option<i64> {
    let whole = text.split('.').next().unwrap_or_default();
    let digits: String = whole.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
