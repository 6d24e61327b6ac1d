use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Title used when a listing page has no title element
pub const TITLE_PLACEHOLDER: &str = "Title N/A";

/// Value of a single spec entry scraped from a listing page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SpecValue {
    Integer(i64),
    Text(String),
}

impl fmt::Display for SpecValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecValue::Integer(n) => write!(f, "{}", n),
            SpecValue::Text(s) => f.write_str(s),
        }
    }
}

/// Something the extractor had to paper over while reading a page
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListingFlag {
    MissingPrice,
    MissingTitle,
    /// A mileage spec had no digits and was recorded as 0
    SuspectMileage,
}

/// One listing as read from its detail page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListing {
    pub url: String,
    pub title: String,
    pub price: i64,
    /// Normalized spec keys (lowercase, underscores) mapped to their values
    pub specs: BTreeMap<String, SpecValue>,
    #[serde(default)]
    pub flags: Vec<ListingFlag>,
    pub scraped_at: DateTime<Utc>,
}

impl RawListing {
    pub fn has_flag(&self, flag: ListingFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Year, make and model pulled out of a listing title
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTitle {
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
}

/// A listing that passed the budget and seat filters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub title: String,
    /// Display label, `"<make> <model>"` or a fallback
    pub name: String,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub predicted_price: f64,
    pub kilometres: Option<f64>,
    pub seats: u32,
    pub url: String,
}
