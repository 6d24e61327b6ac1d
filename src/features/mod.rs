//! Feature pipeline: dataset rows to a numeric matrix matching a
//! `FeatureSchema`.
//!
//! Training calls [`FeaturePipeline::fit`], which decides column types and
//! dummy columns from the data and freezes them into [`Preprocessing`].
//! Serving calls [`FeaturePipeline::transform`] with that frozen state and
//! aligns the result to the schema.

pub mod encoding;
pub mod frame;
pub mod numeric;
pub mod seats;
pub mod title;

pub use frame::{FeatureFrame, FeatureSchema};
pub use numeric::clean_numeric;
pub use seats::{estimate_seats, row_seats};
pub use title::{display_parts, parse_title, YearExtractor, DEFAULT_YEAR_PATTERN};

use crate::dataset::DatasetRow;
use crate::models::ParsedTitle;
use crate::scrapers::extract::MILEAGE_KEYS;
use chrono::Datelike;
use polars::prelude::PolarsResult;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub const YEAR: &str = "year";
pub const AGE: &str = "age";
pub const KILOMETRES: &str = "kilometres";
pub const MAKE: &str = "make";
pub const MODEL: &str = "model";

/// Columns never used as spec features
const RESERVED_COLUMNS: [&str; 8] = ["url", "title", "price", YEAR, MAKE, MODEL, AGE, KILOMETRES];

pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// Row filters applied before training
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidityBounds {
    pub min_year: i32,
    pub min_price: f64,
    pub max_price: f64,
    pub min_kilometres: f64,
    pub max_kilometres: f64,
}

impl Default for ValidityBounds {
    fn default() -> Self {
        Self {
            min_year: 1990,
            min_price: 500.0,
            max_price: 500_000.0,
            min_kilometres: 0.0,
            max_kilometres: 500_000.0,
        }
    }
}

/// Everything `transform` needs to reproduce the training features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessing {
    pub year_pattern: String,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    /// Training medians used for missing numeric values
    pub numeric_fill: BTreeMap<String, f64>,
}

/// Values derived from a row before any encoding
#[derive(Debug, Clone, PartialEq)]
pub struct RowFeatures {
    pub parsed: ParsedTitle,
    pub year: Option<i32>,
    pub price: Option<f64>,
    pub kilometres: Option<f64>,
}

/// Distance from whichever mileage column the row has
pub fn row_distance(row: &DatasetRow) -> Option<f64> {
    MILEAGE_KEYS
        .iter()
        .filter_map(|k| row.get(k))
        .find_map(clean_numeric)
}

/// Output of fitting on training rows
#[derive(Debug, Clone)]
pub struct FittedFeatures {
    pub frame: FeatureFrame,
    pub schema: FeatureSchema,
    pub preprocessing: Preprocessing,
}

#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    years: YearExtractor,
    current_year: i32,
}

impl FeaturePipeline {
    pub fn new(years: YearExtractor, current_year: i32) -> Self {
        Self {
            years,
            current_year,
        }
    }

    /// Rebuild the pipeline a model was trained with
    pub fn from_preprocessing(
        pre: &Preprocessing,
        current_year: i32,
    ) -> Result<Self, regex::Error> {
        Ok(Self::new(YearExtractor::new(&pre.year_pattern)?, current_year))
    }

    pub fn row_features(&self, row: &DatasetRow) -> RowFeatures {
        let title = row.title();
        let parsed = parse_title(title);
        let year = self.years.year(title, &parsed);
        RowFeatures {
            parsed,
            year,
            price: row.get("price").and_then(clean_numeric),
            kilometres: row_distance(row),
        }
    }

    /// Learn column types and dummy columns from training rows.
    pub fn fit(&self, rows: &[DatasetRow]) -> PolarsResult<FittedFeatures> {
        let derived: Vec<RowFeatures> = rows.iter().map(|r| self.row_features(r)).collect();
        let mut frame = self.base_frame(&derived)?;

        let spec_columns = spec_columns(rows);
        let (numeric, categorical): (Vec<String>, Vec<String>) =
            spec_columns.into_iter().partition(|c| {
                rows.iter()
                    .filter_map(|r| r.get(c))
                    .all(numeric::is_plain_number)
            });

        for column in &numeric {
            frame.insert(column.clone(), numeric_values(rows, column))?;
        }

        let mut categorical_columns = categorical;
        categorical_columns.push(MAKE.to_string());
        categorical_columns.push(MODEL.to_string());
        for column in &categorical_columns {
            let values = categorical_values(rows, &derived, column);
            for series in encoding::fit_dummies(column, &values) {
                frame.insert_series(series)?;
            }
        }

        let mut numeric_columns = vec![YEAR.to_string(), AGE.to_string(), KILOMETRES.to_string()];
        numeric_columns.extend(numeric);

        let numeric_fill = numeric_columns
            .iter()
            .filter_map(|c| frame.median(c).map(|m| (c.clone(), m)))
            .collect();

        let schema = FeatureSchema::new(frame.columns());
        debug!(
            "Fitted {} features ({} numeric, {} categorical sources)",
            schema.len(),
            numeric_columns.len(),
            categorical_columns.len()
        );

        Ok(FittedFeatures {
            frame,
            schema,
            preprocessing: Preprocessing {
                year_pattern: self.years.pattern().to_string(),
                numeric_columns,
                categorical_columns,
                numeric_fill,
            },
        })
    }

    /// Encode rows with frozen preprocessing. No rows are dropped.
    ///
    /// The result is not yet aligned; call [`FeatureFrame::align_to`] with
    /// the model's schema before building the matrix. A trained numeric
    /// column no row carries is left out, so alignment zero-fills it.
    pub fn transform(
        &self,
        rows: &[DatasetRow],
        pre: &Preprocessing,
    ) -> PolarsResult<FeatureFrame> {
        let derived: Vec<RowFeatures> = rows.iter().map(|r| self.row_features(r)).collect();
        let mut frame = self.base_frame(&derived)?;

        for column in &pre.numeric_columns {
            if frame.contains(column) || !rows.iter().any(|r| r.get(column).is_some()) {
                continue;
            }
            frame.insert(column.clone(), numeric_values(rows, column))?;
        }

        let known: BTreeSet<&str> = pre
            .numeric_columns
            .iter()
            .chain(&pre.categorical_columns)
            .map(String::as_str)
            .collect();
        let unseen = spec_columns(rows)
            .into_iter()
            .filter(|c| !known.contains(c.as_str()));

        for column in pre.categorical_columns.iter().cloned().chain(unseen) {
            let values = categorical_values(rows, &derived, &column);
            for series in encoding::one_hot(&column, &values) {
                frame.insert_series(series)?;
            }
        }

        Ok(frame)
    }

    fn base_frame(&self, derived: &[RowFeatures]) -> PolarsResult<FeatureFrame> {
        let mut frame = FeatureFrame::new(derived.len());
        frame.insert(YEAR, derived.iter().map(|d| d.year.map(f64::from)).collect())?;
        frame.insert(
            AGE,
            derived
                .iter()
                .map(|d| d.year.map(|y| f64::from(self.current_year - y)))
                .collect(),
        )?;
        frame.insert(KILOMETRES, derived.iter().map(|d| d.kilometres).collect())?;
        Ok(frame)
    }
}

/// Spec columns present in any row, sorted, excluding reserved and mileage columns
fn spec_columns(rows: &[DatasetRow]) -> Vec<String> {
    let columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|r| r.columns())
        .filter(|c| !RESERVED_COLUMNS.contains(c) && !MILEAGE_KEYS.contains(c))
        .collect();
    columns.into_iter().map(str::to_string).collect()
}

fn numeric_values(rows: &[DatasetRow], column: &str) -> Vec<Option<f64>> {
    rows.iter()
        .map(|r| r.get(column).and_then(clean_numeric))
        .collect()
}

fn categorical_values<'a>(
    rows: &'a [DatasetRow],
    derived: &'a [RowFeatures],
    column: &str,
) -> Vec<Option<&'a str>> {
    match column {
        MAKE => derived.iter().map(|d| d.parsed.make.as_deref()).collect(),
        MODEL => derived.iter().map(|d| d.parsed.model.as_deref()).collect(),
        _ => rows.iter().map(|r| r.get(column)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(title: &str, km: &str, extra: &[(&str, &str)]) -> DatasetRow {
        let mut pairs = vec![
            ("url".to_string(), format!("https://x/a/{}", title.len())),
            ("title".to_string(), title.to_string()),
            ("price".to_string(), "20000".to_string()),
            ("kilometres".to_string(), km.to_string()),
        ];
        pairs.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        DatasetRow::from_pairs(pairs)
    }

    fn pipeline() -> FeaturePipeline {
        FeaturePipeline::new(YearExtractor::default(), 2025)
    }

    fn training_rows() -> Vec<DatasetRow> {
        vec![
            row(
                "2020 Honda Civic LX",
                "50,000 km",
                &[("doors", "4"), ("transmission", "Automatic")],
            ),
            row(
                "2018 Toyota Corolla",
                "80000",
                &[("doors", "2"), ("transmission", "Manual")],
            ),
            row("2015 Ford Escape SE", "", &[("doors", "5")]),
        ]
    }

    fn aligned_matrix(
        p: &FeaturePipeline,
        fitted: &FittedFeatures,
        rows: &[DatasetRow],
    ) -> Vec<Vec<f64>> {
        let mut frame = p.transform(rows, &fitted.preprocessing).unwrap();
        frame.align_to(&fitted.schema).unwrap();
        frame
            .to_matrix(&fitted.schema, &fitted.preprocessing.numeric_fill)
            .unwrap()
    }

    #[test]
    fn fit_types_and_encodes_columns() {
        let fitted = pipeline().fit(&training_rows()).unwrap();
        assert_eq!(
            fitted.schema.columns(),
            &[
                "year",
                "age",
                "kilometres",
                "doors",
                "transmission_Manual",
                "transmission_nan",
                "make_Honda",
                "make_Toyota",
                "make_nan",
                "model_Corolla",
                "model_Escape SE",
                "model_nan",
            ]
            .map(String::from)
        );
        assert_eq!(
            fitted.preprocessing.categorical_columns,
            vec!["transmission", "make", "model"]
        );
        assert_eq!(
            fitted.frame.column("age"),
            Some(vec![Some(5.0), Some(7.0), Some(10.0)])
        );
        assert_eq!(
            fitted.frame.column("kilometres"),
            Some(vec![Some(50_000.0), Some(80_000.0), None])
        );
        assert_eq!(
            fitted.preprocessing.numeric_fill.get("kilometres"),
            Some(&65_000.0)
        );
        assert_eq!(fitted.preprocessing.numeric_fill.get("doors"), Some(&4.0));
    }

    #[test]
    fn transform_reproduces_trained_columns() {
        let p = pipeline();
        let fitted = p.fit(&training_rows()).unwrap();
        let serve = vec![row("2019 Honda Civic LX", "10 km", &[("colour", "Blue")])];

        let mut frame = p.transform(&serve, &fitted.preprocessing).unwrap();
        assert!(frame.contains("colour_Blue"));
        assert!(!frame.contains("doors"));
        let added = frame.align_to(&fitted.schema).unwrap();
        assert!(added.contains(&"doors".to_string()));

        let matrix = frame
            .to_matrix(&fitted.schema, &fitted.preprocessing.numeric_fill)
            .unwrap();
        let at = |c: &str| matrix[0][fitted.schema.position(c).unwrap()];
        assert_eq!(at("year"), 2019.0);
        assert_eq!(at("kilometres"), 10.0);
        assert_eq!(at("make_Honda"), 1.0);
        assert_eq!(at("make_nan"), 0.0);
        // reference category for model ("Civic LX") has no column of its own
        assert_eq!(at("model_Corolla"), 0.0);
        // no transmission value, so the missing indicator is set
        assert_eq!(at("transmission_nan"), 1.0);
        // no serving row has doors: zero-filled by alignment
        assert_eq!(at("doors"), 0.0);
        assert_eq!(matrix[0].len(), fitted.schema.len());
    }

    #[test]
    fn per_row_gaps_take_the_training_median() {
        let p = pipeline();
        let fitted = p.fit(&training_rows()).unwrap();
        let serve = vec![
            row("2019 Honda Civic LX", "", &[("doors", "2")]),
            row("2017 Toyota Corolla", "", &[]),
        ];

        let matrix = aligned_matrix(&p, &fitted, &serve);
        let doors = fitted.schema.position("doors").unwrap();
        let km = fitted.schema.position("kilometres").unwrap();
        assert_eq!(matrix[0][doors], 2.0);
        assert_eq!(matrix[1][doors], 4.0);
        assert_eq!(matrix[1][km], 65_000.0);
    }

    #[test]
    fn missing_year_has_no_age() {
        let rows = vec![row("Great Car Cheap", "1", &[])];
        let fitted = pipeline().fit(&rows).unwrap();
        let frame = pipeline().transform(&rows, &fitted.preprocessing).unwrap();
        assert_eq!(frame.column("year"), Some(vec![None]));
        assert_eq!(frame.column("age"), Some(vec![None]));
    }

    #[test]
    fn transform_is_idempotent() {
        let p = pipeline();
        let fitted = p.fit(&training_rows()).unwrap();
        assert_eq!(
            aligned_matrix(&p, &fitted, &training_rows()),
            aligned_matrix(&p, &fitted, &training_rows())
        );
    }

    #[test]
    fn distance_reads_any_mileage_key() {
        let r = DatasetRow::from_pairs([("title", "t"), ("mileage", "12,000 mi")]);
        assert_eq!(row_distance(&r), Some(12_000.0));
        let r = DatasetRow::from_pairs([("title", "t"), ("km", "km")]);
        assert_eq!(row_distance(&r), None);
    }
}
