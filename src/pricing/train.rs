use crate::dataset::{Dataset, DatasetRow};
use crate::error::PipelineError;
use crate::features::{FeaturePipeline, ValidityBounds, YearExtractor};
use crate::pricing::artifact::{TrainedModel, FORMAT_VERSION};
use crate::pricing::forest::{ForestParams, PriceForest};
use crate::pricing::metrics::{mean_absolute_error, permutation_importance, r2_score};
use crate::pricing::split::train_test_split;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Settings for an offline training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Fewest valid rows a model may be trained on
    pub min_rows: usize,
    /// Largest share of rows allowed to have no parseable year
    pub max_unparseable_years: f64,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub forest: ForestParams,
    pub bounds: ValidityBounds,
    /// How many features to list in the report
    pub top_features: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            min_rows: 100,
            max_unparseable_years: 0.3,
            test_fraction: 0.2,
            split_seed: 42,
            forest: ForestParams::default(),
            bounds: ValidityBounds::default(),
            top_features: 10,
        }
    }
}

/// Offline diagnostics from a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub rows_loaded: usize,
    pub rows_valid: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub stratified: bool,
    pub features: usize,
    pub mae: f64,
    pub r2: f64,
    pub top_features: Vec<(String, f64)>,
}

/// Clean, validate, featurize and fit a price model.
pub fn train(
    dataset: &Dataset,
    config: &TrainConfig,
    current_year: i32,
) -> Result<(TrainedModel, TrainReport), PipelineError> {
    if dataset.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }
    for column in ["title", "price"] {
        if !dataset.has_column(column) {
            return Err(PipelineError::MissingColumn(column.to_string()));
        }
    }

    let pipeline = FeaturePipeline::new(YearExtractor::default(), current_year);
    let total = dataset.len();
    info!("Initial data: {} rows", total);

    let derived: Vec<_> = dataset.rows.iter().map(|r| pipeline.row_features(r)).collect();

    let failed = derived.iter().filter(|d| d.year.is_none()).count();
    let share = failed as f64 / total as f64;
    if share > config.max_unparseable_years {
        return Err(PipelineError::UnparseableYears {
            failed,
            total,
            percent: share * 100.0,
            limit_percent: config.max_unparseable_years * 100.0,
        });
    }

    let bounds = config.bounds;
    let mut valid: Vec<DatasetRow> = Vec::new();
    let mut prices = Vec::new();
    let mut years = Vec::new();
    for (row, d) in dataset.rows.iter().zip(&derived) {
        let (Some(year), Some(price), Some(km)) = (d.year, d.price, d.kilometres) else {
            continue;
        };
        if year < bounds.min_year || year > current_year {
            continue;
        }
        if price < bounds.min_price || price > bounds.max_price {
            continue;
        }
        if km < bounds.min_kilometres || km > bounds.max_kilometres {
            continue;
        }
        valid.push(row.clone());
        prices.push(price);
        years.push(year);
    }
    info!("Filtered {} invalid rows", total - valid.len());

    if valid.len() < config.min_rows {
        return Err(PipelineError::InsufficientRows {
            found: valid.len(),
            required: config.min_rows,
        });
    }

    let fitted = pipeline.fit(&valid)?;
    let x = fitted
        .frame
        .to_matrix(&fitted.schema, &fitted.preprocessing.numeric_fill)?;

    let split = train_test_split(
        valid.len(),
        Some(years.as_slice()),
        config.test_fraction,
        config.split_seed,
    );
    if !split.stratified {
        warn!("Year distribution too sparse to stratify, using a plain split");
    }
    let pick_x = |idx: &[usize]| idx.iter().map(|&i| x[i].clone()).collect::<Vec<_>>();
    let pick_y = |idx: &[usize]| idx.iter().map(|&i| prices[i]).collect::<Vec<_>>();
    let (x_train, y_train) = (pick_x(&split.train), pick_y(&split.train));
    let (x_test, y_test) = (pick_x(&split.test), pick_y(&split.test));

    info!(
        "Training forest on {} rows × {} features ({} held out)",
        x_train.len(),
        fitted.schema.len(),
        x_test.len()
    );
    let estimator =
        PriceForest::fit(&x_train, &y_train, config.forest).map_err(PipelineError::Estimator)?;

    let predictions = estimator.predict(&x_test).map_err(PipelineError::Estimator)?;
    let mae = mean_absolute_error(&y_test, &predictions);
    let r2 = r2_score(&y_test, &predictions);

    let importance = permutation_importance(&estimator, &x_test, &y_test, config.split_seed)
        .map_err(PipelineError::Estimator)?;
    let top_features = importance
        .into_iter()
        .take(config.top_features)
        .map(|(i, score)| (fitted.schema.columns()[i].clone(), score))
        .collect();

    let report = TrainReport {
        rows_loaded: total,
        rows_valid: valid.len(),
        train_rows: x_train.len(),
        test_rows: x_test.len(),
        stratified: split.stratified,
        features: fitted.schema.len(),
        mae,
        r2,
        top_features,
    };

    let model = TrainedModel {
        format_version: FORMAT_VERSION,
        trained_at: Utc::now(),
        reference_year: current_year,
        schema: fitted.schema,
        preprocessing: fitted.preprocessing,
        estimator,
    };

    Ok((model, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecommendError;

    const MAKES: [(&str, &str, f64); 4] = [
        ("Honda", "Civic", 1.0),
        ("Toyota", "Corolla", 1.1),
        ("Ford", "Escape", 1.3),
        ("BMW", "Xdrive", 2.0),
    ];

    fn synthetic_dataset(n: usize, unparseable: usize) -> Dataset {
        let mut rows = Vec::new();
        for i in 0..n {
            let (make, model, factor) = MAKES[i % MAKES.len()];
            let year = 2012 + (i % 10) as i32;
            let km = 10_000 + (i * 1_537) % 150_000;
            let price = (8_000.0 + (year - 2012) as f64 * 1_500.0 - km as f64 * 0.02) * factor;
            let transmission = if i % 2 == 0 { "Automatic" } else { "Manual" };
            let title = if i < unparseable {
                format!("Great {} deal {}", make, i)
            } else {
                format!("{} {} {} Base", year, make, model)
            };
            rows.push(DatasetRow::from_pairs([
                ("url".to_string(), format!("https://cars.test/a/{}", i)),
                ("title".to_string(), title),
                ("price".to_string(), format!("{:.0}", price)),
                ("kilometres".to_string(), format!("{} km", km)),
                ("transmission".to_string(), transmission.to_string()),
            ]));
        }
        Dataset {
            columns: ["url", "title", "price", "kilometres", "transmission"]
                .map(String::from)
                .to_vec(),
            rows,
        }
    }

    fn fast_config() -> TrainConfig {
        TrainConfig {
            forest: ForestParams {
                n_trees: 15,
                ..ForestParams::default()
            },
            ..TrainConfig::default()
        }
    }

    #[test]
    fn trains_and_reports() {
        let dataset = synthetic_dataset(150, 0);
        let (model, report) = train(&dataset, &fast_config(), 2025).unwrap();
        assert_eq!(report.rows_valid, 150);
        assert_eq!(report.train_rows + report.test_rows, 150);
        assert!(report.stratified);
        assert_eq!(report.top_features.len(), 10);
        assert!(report.mae.is_finite());
        assert_eq!(model.schema.len(), model.estimator.n_features());
        assert_eq!(model.preprocessing.year_pattern, r"(?:19|20)\d{2}");
        assert!(model.schema.position("make_Honda").is_some());
    }

    #[test]
    fn too_many_unparseable_years_fails_fast() {
        let dataset = synthetic_dataset(150, 60);
        let err = train(&dataset, &fast_config(), 2025).unwrap_err();
        match err {
            PipelineError::UnparseableYears { failed, total, .. } => {
                assert_eq!((failed, total), (60, 150));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn year_gate_allows_exactly_the_limit() {
        let dataset = synthetic_dataset(150, 45);
        let config = TrainConfig {
            min_rows: 10,
            ..fast_config()
        };
        let (_, report) = train(&dataset, &config, 2025).unwrap();
        assert_eq!(report.rows_valid, 105);
    }

    #[test]
    fn insufficient_rows_is_an_error() {
        let dataset = synthetic_dataset(80, 0);
        let err = train(&dataset, &fast_config(), 2025).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientRows {
                found: 80,
                required: 100
            }
        ));
    }

    #[test]
    fn future_years_are_excluded() {
        // years run to 2021; pretending it is 2016 drops the later ones
        let dataset = synthetic_dataset(300, 0);
        let config = TrainConfig {
            min_rows: 10,
            ..fast_config()
        };
        let (_, report) = train(&dataset, &config, 2016).unwrap();
        assert_eq!(report.rows_valid, 150);
    }

    #[test]
    fn missing_price_column_is_reported() {
        let mut dataset = synthetic_dataset(10, 0);
        dataset.columns.retain(|c| c != "price");
        assert!(matches!(
            train(&dataset, &fast_config(), 2025),
            Err(PipelineError::MissingColumn(c)) if c == "price"
        ));
    }

    #[test]
    fn artifact_round_trip() {
        let (model, _) = train(&synthetic_dataset(120, 0), &fast_config(), 2025).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("car_price_model.json");
        model.save(&path).unwrap();

        let loaded = TrainedModel::load(&path).unwrap();
        assert_eq!(loaded.schema, model.schema);
        assert_eq!(loaded.preprocessing, model.preprocessing);

        let row = vec![vec![1.0; model.schema.len()]];
        assert_eq!(loaded.predict(&row).unwrap(), model.predict(&row).unwrap());
    }

    #[test]
    fn load_reports_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            TrainedModel::load(&missing),
            Err(RecommendError::ModelMissing { .. })
        ));

        let corrupt = dir.path().join("bad.json");
        std::fs::write(&corrupt, "{not json").unwrap();
        assert!(matches!(
            TrainedModel::load(&corrupt),
            Err(RecommendError::ModelCorrupt { .. })
        ));
    }
}
