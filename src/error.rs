//! Typed failures for each pipeline stage.
//!
//! Every variant exposes a stable `reason()` code so callers (batch logs, the
//! HTTP layer) can report what went wrong without matching on message text.

use std::path::PathBuf;

/// A single listing could not be turned into a `RawListing`.
///
/// The batch collector treats all of these as "skip this listing".
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("page content is empty")]
    EmptyPage,

    #[error("page has no price, title or spec elements")]
    NotAListing,

    #[error("timed out after {seconds}s waiting for `{selector}`")]
    Timeout { selector: String, seconds: u64 },

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

impl ExtractError {
    pub fn reason(&self) -> &'static str {
        match self {
            ExtractError::EmptyPage => "empty_page",
            ExtractError::NotAListing => "not_a_listing",
            ExtractError::Timeout { .. } => "timeout",
            ExtractError::Navigation(_) => "navigation",
            ExtractError::Status(_) => "http_status",
        }
    }
}

/// A dataset-wide quality gate failed during an offline training run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("dataset is empty")]
    EmptyDataset,

    #[error(
        "{failed} of {total} rows ({percent:.1}%) have no parseable year in their title; \
         the limit is {limit_percent:.0}%"
    )]
    UnparseableYears {
        failed: usize,
        total: usize,
        percent: f64,
        limit_percent: f64,
    },

    #[error("only {found} valid samples - need at least {required}")]
    InsufficientRows { found: usize, required: usize },

    #[error("dataset has no `{0}` column")]
    MissingColumn(String),

    #[error("feature encoding failed: {0}")]
    Features(#[from] polars::prelude::PolarsError),

    #[error("estimator failed: {0}")]
    Estimator(String),
}

impl PipelineError {
    pub fn reason(&self) -> &'static str {
        match self {
            PipelineError::EmptyDataset => "empty_dataset",
            PipelineError::UnparseableYears { .. } => "unparseable_years",
            PipelineError::InsufficientRows { .. } => "insufficient_rows",
            PipelineError::MissingColumn(_) => "missing_column",
            PipelineError::Features(_) => "features",
            PipelineError::Estimator(_) => "estimator",
        }
    }
}

/// Failures surfaced by the recommender to the serving layer.
#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("model artifact not found at {}", path.display())]
    ModelMissing { path: PathBuf },

    #[error("model artifact at {} is unreadable: {message}", path.display())]
    ModelCorrupt { path: PathBuf, message: String },

    #[error("model preprocessing is invalid: {0}")]
    InvalidPreprocessing(String),

    #[error("listing dataset unavailable: {0}")]
    DatasetUnavailable(String),

    #[error("feature schema mismatch: model expects {expected} features, schema has {found}")]
    SchemaMismatch { expected: usize, found: usize },

    #[error("price prediction failed: {0}")]
    Prediction(String),

    #[error("no cars found within a budget of {budget} with at least {min_seats} seats")]
    NoMatches { budget: f64, min_seats: u32 },
}

impl RecommendError {
    pub fn reason(&self) -> &'static str {
        match self {
            RecommendError::InvalidRequest(_) => "invalid_request",
            RecommendError::ModelMissing { .. } => "model_missing",
            RecommendError::ModelCorrupt { .. } | RecommendError::InvalidPreprocessing(_) => {
                "model_corrupt"
            }
            RecommendError::DatasetUnavailable(_) => "dataset_unavailable",
            RecommendError::SchemaMismatch { .. } => "schema_mismatch",
            RecommendError::Prediction(_) => "prediction_failed",
            RecommendError::NoMatches { .. } => "no_matches",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_gate_message_names_the_ratio() {
        let err = PipelineError::UnparseableYears {
            failed: 4,
            total: 10,
            percent: 40.0,
            limit_percent: 30.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("4 of 10 rows (40.0%)"));
        assert!(msg.contains("30%"));
        assert_eq!(err.reason(), "unparseable_years");
    }

    #[test]
    fn no_matches_is_readable() {
        let err = RecommendError::NoMatches {
            budget: 1000.0,
            min_seats: 7,
        };
        assert_eq!(
            err.to_string(),
            "no cars found within a budget of 1000 with at least 7 seats"
        );
    }
}
