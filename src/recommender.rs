//! Budget and seat filtering over model-priced listings.
//!
//! The model and dataset are loaded once. Every listing is priced at
//! construction, so a request only filters precomputed candidates and the
//! recommender can be shared read-only between handlers.

use crate::dataset::{load_dataset, Dataset};
use crate::error::RecommendError;
use crate::features::{display_parts, row_distance, row_seats, FeaturePipeline};
use crate::models::Recommendation;
use crate::pricing::TrainedModel;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Recommender {
    candidates: Vec<Recommendation>,
}

impl Recommender {
    /// Load the model artifact and listing dataset from disk.
    pub fn load(
        model_path: &Path,
        dataset_path: &Path,
        current_year: i32,
    ) -> Result<Self, RecommendError> {
        let model = TrainedModel::load(model_path)?;
        if !dataset_path.exists() {
            return Err(RecommendError::DatasetUnavailable(format!(
                "{} does not exist",
                dataset_path.display()
            )));
        }
        let dataset = load_dataset(dataset_path)
            .map_err(|e| RecommendError::DatasetUnavailable(format!("{:#}", e)))?;
        Self::new(&model, &dataset, current_year)
    }

    /// Price every listing in `dataset` with `model`.
    pub fn new(
        model: &TrainedModel,
        dataset: &Dataset,
        current_year: i32,
    ) -> Result<Self, RecommendError> {
        model.check_schema()?;
        if dataset.is_empty() {
            return Err(RecommendError::DatasetUnavailable(
                "dataset has no usable rows".to_string(),
            ));
        }

        if model.reference_year != current_year {
            warn!(
                "Model ages were computed against {}, serving in {}",
                model.reference_year, current_year
            );
        }

        let pre = &model.preprocessing;
        let pipeline = FeaturePipeline::from_preprocessing(pre, current_year)
            .map_err(|e| RecommendError::InvalidPreprocessing(e.to_string()))?;

        let features = |e: polars::prelude::PolarsError| RecommendError::Prediction(e.to_string());
        let mut frame = pipeline.transform(&dataset.rows, pre).map_err(features)?;
        let added = frame.align_to(&model.schema).map_err(features)?;
        if !added.is_empty() {
            debug!("Zero-filled {} schema columns absent from the dataset", added.len());
        }
        let x = frame
            .to_matrix(&model.schema, &pre.numeric_fill)
            .map_err(features)?;
        let prices = model.predict(&x)?;
        if prices.len() != dataset.len() {
            return Err(RecommendError::Prediction(format!(
                "expected {} predictions, got {}",
                dataset.len(),
                prices.len()
            )));
        }

        let candidates = dataset
            .rows
            .iter()
            .zip(prices)
            .map(|(row, predicted_price)| {
                let features = pipeline.row_features(row);
                let (make, model, name) = display_parts(&features.parsed);
                Recommendation {
                    title: row.title().to_string(),
                    name,
                    make,
                    model,
                    year: features.year,
                    predicted_price,
                    kilometres: row_distance(row),
                    seats: row_seats(row),
                    url: row.url().to_string(),
                }
            })
            .collect::<Vec<_>>();

        info!("🚗 Priced {} listings for recommendation", candidates.len());
        Ok(Self { candidates })
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Listings whose predicted price fits `budget` and that seat at least
    /// `min_seats`, in dataset order.
    pub fn recommend(
        &self,
        budget: f64,
        min_seats: u32,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        if !budget.is_finite() || budget <= 0.0 {
            return Err(RecommendError::InvalidRequest(
                "budget must be a positive number".to_string(),
            ));
        }
        if min_seats == 0 {
            return Err(RecommendError::InvalidRequest(
                "min_seats must be at least 1".to_string(),
            ));
        }

        let matches: Vec<Recommendation> = self
            .candidates
            .iter()
            .filter(|c| c.predicted_price <= budget && c.seats >= min_seats)
            .cloned()
            .collect();

        debug!(
            "{} of {} listings within {} for {}+ seats",
            matches.len(),
            self.candidates.len(),
            budget,
            min_seats
        );
        if matches.is_empty() {
            return Err(RecommendError::NoMatches { budget, min_seats });
        }
        Ok(matches)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dataset::DatasetRow;
    use crate::features::title::{UNKNOWN_MAKE, UNKNOWN_MODEL, UNKNOWN_NAME};
    use crate::pricing::{train, ForestParams, TrainConfig};

    fn listing(i: usize, title: &str, price: f64, km: usize) -> DatasetRow {
        DatasetRow::from_pairs([
            ("url".to_string(), format!("https://cars.test/a/{}", i)),
            ("title".to_string(), title.to_string()),
            ("price".to_string(), format!("{:.0}", price)),
            ("kilometres".to_string(), format!("{} km", km)),
        ])
    }

    pub(crate) fn training_set() -> Dataset {
        let makes = [("Honda", "Civic", 1.0), ("Toyota", "Rav", 1.4), ("Kia", "Sedona", 1.2)];
        let rows = (0..120)
            .map(|i| {
                let (make, model, factor) = makes[i % makes.len()];
                let year = 2014 + (i % 8) as i32;
                let km = 20_000 + (i * 977) % 120_000;
                let price = (9_000.0 + (year - 2014) as f64 * 1_800.0 - km as f64 * 0.03) * factor;
                let body = if make == "Kia" { "Minivan" } else { "Sedan" };
                listing(i, &format!("{} {} {} {}", year, make, model, body), price, km)
            })
            .collect();
        Dataset {
            columns: ["url", "title", "price", "kilometres"].map(String::from).to_vec(),
            rows,
        }
    }

    pub(crate) fn trained_model() -> TrainedModel {
        let config = TrainConfig {
            forest: ForestParams {
                n_trees: 10,
                ..ForestParams::default()
            },
            ..TrainConfig::default()
        };
        train(&training_set(), &config, 2025).unwrap().0
    }

    #[test]
    fn results_respect_budget_and_seats() {
        let model = trained_model();
        let recommender = Recommender::new(&model, &training_set(), 2025).unwrap();
        assert_eq!(recommender.len(), 120);

        let budget = 15_000.0;
        let results = recommender.recommend(budget, 7).unwrap();
        assert!(!results.is_empty());
        for r in &results {
            assert!(r.predicted_price <= budget);
            assert!(r.seats >= 7);
            assert_eq!(r.make, "Kia");
        }
    }

    #[test]
    fn results_keep_dataset_order() {
        let model = trained_model();
        let recommender = Recommender::new(&model, &training_set(), 2025).unwrap();
        let results = recommender.recommend(1_000_000.0, 1).unwrap();
        assert_eq!(results.len(), 120);
        assert_eq!(results[0].url, "https://cars.test/a/0");
        assert_eq!(results[119].url, "https://cars.test/a/119");
    }

    #[test]
    fn unparseable_titles_get_display_fallbacks() {
        let model = trained_model();
        let dataset = Dataset {
            columns: ["url", "title", "price"].map(String::from).to_vec(),
            rows: vec![DatasetRow::from_pairs([
                ("url", "https://cars.test/a/odd"),
                ("title", "Great Car Cheap"),
                ("price", "1000"),
            ])],
        };
        let recommender = Recommender::new(&model, &dataset, 2025).unwrap();
        let results = recommender.recommend(1_000_000.0, 1).unwrap();
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.make, UNKNOWN_MAKE);
        assert_eq!(r.model, UNKNOWN_MODEL);
        assert_eq!(r.name, UNKNOWN_NAME);
        assert_eq!(r.year, None);
        assert_eq!(r.kilometres, None);
        assert!(r.predicted_price.is_finite());
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let model = trained_model();
        let recommender = Recommender::new(&model, &training_set(), 2025).unwrap();
        for budget in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                recommender.recommend(budget, 5),
                Err(RecommendError::InvalidRequest(_))
            ));
        }
        assert!(matches!(
            recommender.recommend(20_000.0, 0),
            Err(RecommendError::InvalidRequest(_))
        ));
    }

    #[test]
    fn nothing_affordable_is_no_matches() {
        let model = trained_model();
        let recommender = Recommender::new(&model, &training_set(), 2025).unwrap();
        let err = recommender.recommend(1.0, 5).unwrap_err();
        assert_eq!(err.reason(), "no_matches");
        assert!(matches!(
            recommender.recommend(1_000_000.0, 9),
            Err(RecommendError::NoMatches { min_seats: 9, .. })
        ));
    }

    #[test]
    fn load_distinguishes_missing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        let dataset_path = dir.path().join("cars.csv");

        let err = Recommender::load(&model_path, &dataset_path, 2025).unwrap_err();
        assert_eq!(err.reason(), "model_missing");

        trained_model().save(&model_path).unwrap();
        let err = Recommender::load(&model_path, &dataset_path, 2025).unwrap_err();
        assert_eq!(err.reason(), "dataset_unavailable");
    }
}
