//! Indicator columns for categorical values.
//!
//! Column names follow `<column>_<value>`; a missing value is flagged in
//! `<column>_nan`.

use polars::prelude::*;
use std::collections::BTreeSet;

pub fn dummy_name(column: &str, value: &str) -> String {
    format!("{}_{}", column, value)
}

pub fn missing_name(column: &str) -> String {
    format!("{}_nan", column)
}

/// Dummy encoding for training: one indicator per level plus a missing
/// indicator, with the first level in sorted order dropped as the reference.
pub fn fit_dummies(column: &str, values: &[Option<&str>]) -> Vec<Series> {
    let levels: BTreeSet<&str> = values.iter().flatten().copied().collect();

    levels
        .into_iter()
        .map(Some)
        .chain(std::iter::once(None))
        .skip(1)
        .map(|level| indicator(column, level, values))
        .collect()
}

/// Full one-hot encoding used at prediction time. Every observed level gets
/// a column, so whichever levels the trained schema kept can be selected;
/// the missing indicator is only emitted when a value is actually missing.
pub fn one_hot(column: &str, values: &[Option<&str>]) -> Vec<Series> {
    let levels: BTreeSet<&str> = values.iter().flatten().copied().collect();
    let mut encoded: Vec<Series> = levels
        .into_iter()
        .map(|level| indicator(column, Some(level), values))
        .collect();
    if values.iter().any(Option::is_none) {
        encoded.push(indicator(column, None, values));
    }
    encoded
}

fn indicator(column: &str, level: Option<&str>, values: &[Option<&str>]) -> Series {
    let name = match level {
        Some(v) => dummy_name(column, v),
        None => missing_name(column),
    };
    let flags: Vec<f64> = values
        .iter()
        .map(|v| if *v == level { 1.0 } else { 0.0 })
        .collect();
    Series::new(name.as_str().into(), flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(encoded: &[Series]) -> Vec<String> {
        encoded.iter().map(|s| s.name().to_string()).collect()
    }

    fn flags(series: &Series) -> Vec<Option<f64>> {
        series.f64().unwrap().into_iter().collect()
    }

    #[test]
    fn drops_first_sorted_level() {
        let values = [Some("Toyota"), Some("Ford"), None, Some("Honda")];
        let encoded = fit_dummies("make", &values);
        assert_eq!(names(&encoded), vec!["make_Honda", "make_Toyota", "make_nan"]);
        assert_eq!(flags(&encoded[0]), vec![Some(0.0), Some(0.0), Some(0.0), Some(1.0)]);
        assert_eq!(flags(&encoded[2]), vec![Some(0.0), Some(0.0), Some(1.0), Some(0.0)]);
    }

    #[test]
    fn single_level_keeps_only_missing_indicator() {
        let encoded = fit_dummies("fuel", &[Some("Gas"), Some("Gas")]);
        assert_eq!(names(&encoded), vec!["fuel_nan"]);
        assert_eq!(flags(&encoded[0]), vec![Some(0.0), Some(0.0)]);
    }

    #[test]
    fn all_missing_yields_nothing() {
        assert!(fit_dummies("trim", &[None, None]).is_empty());
    }

    #[test]
    fn one_hot_keeps_every_level() {
        let encoded = one_hot("make", &[Some("Ford"), Some("Honda")]);
        assert_eq!(names(&encoded), vec!["make_Ford", "make_Honda"]);
        let encoded = one_hot("make", &[Some("Ford"), None]);
        assert_eq!(names(&encoded), vec!["make_Ford", "make_nan"]);
    }
}
