use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered feature columns a trained model expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

/// Float64 feature table over a polars `DataFrame`; nulls mark missing values.
#[derive(Debug, Clone, Default)]
pub struct FeatureFrame {
    rows: usize,
    df: DataFrame,
}

impl FeatureFrame {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            df: DataFrame::default(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(|c| c.to_string())
            .collect()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.df.get_column_index(column).is_some()
    }

    /// Values of one column, `None` for nulls
    pub fn column(&self, column: &str) -> Option<Vec<Option<f64>>> {
        let ca = self.floats(column)?;
        Some(ca.into_iter().collect())
    }

    /// Median of the non-null values in `column`
    pub fn median(&self, column: &str) -> Option<f64> {
        self.floats(column)?.median()
    }

    /// Add or replace a column.
    pub fn insert(
        &mut self,
        column: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> PolarsResult<()> {
        if values.len() != self.rows {
            return Err(shape_mismatch(format!(
                "column has {} values, frame has {} rows",
                values.len(),
                self.rows
            )));
        }
        let name: String = column.into();
        self.insert_series(Series::new(name.as_str().into(), values))
    }

    pub fn insert_series(&mut self, series: Series) -> PolarsResult<()> {
        if series.len() != self.rows {
            return Err(shape_mismatch(format!(
                "series `{}` has {} values, frame has {} rows",
                series.name(),
                series.len(),
                self.rows
            )));
        }
        let series = series.cast(&DataType::Float64)?;
        self.df.with_column(series)?;
        Ok(())
    }

    /// Add every schema column this frame lacks, filled with zeros.
    ///
    /// Existing columns, including ones the schema doesn't know, are kept.
    /// Returns the names of the columns that were added.
    pub fn align_to(&mut self, schema: &FeatureSchema) -> PolarsResult<Vec<String>> {
        let missing: Vec<String> = schema
            .columns()
            .iter()
            .filter(|c| !self.contains(c))
            .cloned()
            .collect();
        for column in &missing {
            self.insert(column.clone(), vec![Some(0.0); self.rows])?;
        }
        Ok(missing)
    }

    /// Row-major matrix of exactly the schema's columns, in schema order.
    ///
    /// Nulls take the column's entry in `fill`, or 0. Fails if a schema
    /// column is absent, so callers must `align_to` first.
    pub fn to_matrix(
        &self,
        schema: &FeatureSchema,
        fill: &BTreeMap<String, f64>,
    ) -> PolarsResult<Vec<Vec<f64>>> {
        let selected = self.df.select(schema.columns().iter().map(String::as_str))?;

        let mut matrix = vec![Vec::with_capacity(schema.len()); self.rows];
        for name in schema.columns() {
            let default = fill.get(name).copied().unwrap_or(0.0);
            let ca = selected.column(name)?.as_materialized_series().f64()?;
            for (row, value) in matrix.iter_mut().zip(ca.into_iter()) {
                row.push(value.unwrap_or(default));
            }
        }
        Ok(matrix)
    }

    fn floats(&self, column: &str) -> Option<&Float64Chunked> {
        self.df
            .column(column)
            .ok()?
            .as_materialized_series()
            .f64()
            .ok()
    }
}

fn shape_mismatch(message: String) -> PolarsError {
    PolarsError::ShapeMismatch(message.into())
}
