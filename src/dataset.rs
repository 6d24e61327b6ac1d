//! CSV persistence for scraped listings.

use crate::models::RawListing;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// Columns every dataset starts with, in this order
pub const BASE_COLUMNS: [&str; 3] = ["url", "title", "price"];

/// One dataset row. Empty cells are absent from `fields`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetRow {
    fields: BTreeMap<String, String>,
}

impl DatasetRow {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        Self { fields }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn url(&self) -> &str {
        self.get("url").unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.get("title").unwrap_or_default()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl From<&RawListing> for DatasetRow {
    fn from(listing: &RawListing) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("url".to_string(), listing.url.clone());
        fields.insert("title".to_string(), listing.title.clone());
        fields.insert("price".to_string(), listing.price.to_string());
        for (key, value) in &listing.specs {
            if BASE_COLUMNS.contains(&key.as_str()) {
                continue;
            }
            let value = value.to_string();
            if !value.is_empty() {
                fields.insert(key.clone(), value);
            }
        }
        Self { fields }
    }
}

/// Rows plus the header they were read with
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<DatasetRow>,
}

impl Dataset {
    pub fn from_listings(listings: &[RawListing]) -> Self {
        Self {
            columns: dataset_columns(listings),
            rows: listings.iter().map(DatasetRow::from).collect(),
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `url`, `title`, `price`, then every other spec key seen, sorted.
pub fn dataset_columns(listings: &[RawListing]) -> Vec<String> {
    let extra: BTreeSet<&str> = listings
        .iter()
        .flat_map(|l| l.specs.keys())
        .map(String::as_str)
        .filter(|k| !BASE_COLUMNS.contains(k))
        .collect();

    BASE_COLUMNS
        .iter()
        .copied()
        .chain(extra)
        .map(str::to_string)
        .collect()
}

/// Write listings as CSV, one row each.
pub fn write_csv<W: Write>(writer: W, listings: &[RawListing]) -> Result<()> {
    let columns = dataset_columns(listings);
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&columns)?;

    for listing in listings {
        let row = DatasetRow::from(listing);
        wtr.write_record(columns.iter().map(|c| row.get(c).unwrap_or("")))?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_dataset(path: &Path, listings: &[RawListing]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv(file, listings)?;
    info!("💾 Data saved to {} ({} rows)", path.display(), listings.len());
    Ok(())
}

/// Read a dataset. Rows missing `url` or `title` are dropped with a warning.
pub fn read_csv<R: Read>(reader: R) -> Result<Dataset> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns: Vec<String> = rdr
        .headers()
        .context("Dataset has no header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Malformed dataset row {}", idx + 1))?;
        let row = DatasetRow::from_pairs(
            columns
                .iter()
                .zip(record.iter())
                .map(|(c, v)| (c.clone(), v.trim().to_string())),
        );
        if row.url().is_empty() || row.title().is_empty() {
            warn!("Dropping dataset row {}: missing url or title", idx + 1);
            continue;
        }
        rows.push(row);
    }

    Ok(Dataset { columns, rows })
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open dataset {}", path.display()))?;
    let dataset = read_csv(file)?;
    info!("Loaded {} rows from {}", dataset.len(), path.display());
    Ok(dataset)
}
