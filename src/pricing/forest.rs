use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fmt;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 10,
            min_samples_leaf: 5,
            seed: 42,
        }
    }
}

/// Random-forest price regressor over a fixed-width feature matrix
#[derive(Serialize, Deserialize)]
pub struct PriceForest {
    n_features: usize,
    params: ForestParams,
    forest: Forest,
}

impl fmt::Debug for PriceForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceForest")
            .field("n_features", &self.n_features)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl PriceForest {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: ForestParams) -> Result<Self, String> {
        let n_features = x.first().map(Vec::len).unwrap_or(0);
        if x.is_empty() || n_features == 0 {
            return Err("no training samples or no features".to_string());
        }
        if x.len() != y.len() {
            return Err(format!("{} samples but {} targets", x.len(), y.len()));
        }

        let parameters = RandomForestRegressorParameters::default()
            .with_n_trees(params.n_trees)
            .with_max_depth(params.max_depth)
            .with_min_samples_leaf(params.min_samples_leaf)
            .with_seed(params.seed);

        let matrix = DenseMatrix::from_2d_vec(&x.to_vec());
        let forest = RandomForestRegressor::fit(&matrix, &y.to_vec(), parameters)
            .map_err(|e| e.to_string())?;

        Ok(Self {
            n_features,
            params,
            forest,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Predict one price per row. Rows must be `n_features` wide.
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, String> {
        if x.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(row) = x.iter().find(|r| r.len() != self.n_features) {
            return Err(format!(
                "row has {} features, model expects {}",
                row.len(),
                self.n_features
            ));
        }
        let matrix = DenseMatrix::from_2d_vec(&x.to_vec());
        self.forest.predict(&matrix).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ForestParams {
        ForestParams {
            n_trees: 10,
            max_depth: 6,
            min_samples_leaf: 1,
            seed: 7,
        }
    }

    #[test]
    fn learns_a_step_function() {
        let x: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = (0..60).map(|i| if i < 30 { 10_000.0 } else { 30_000.0 }).collect();
        let forest = PriceForest::fit(&x, &y, params()).unwrap();

        let preds = forest.predict(&[vec![5.0, 1.0], vec![55.0, 0.0]]).unwrap();
        assert!(preds[0] < 20_000.0, "{:?}", preds);
        assert!(preds[1] > 20_000.0, "{:?}", preds);
    }

    #[test]
    fn rejects_wrong_width() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let forest = PriceForest::fit(&x, &y, params()).unwrap();
        assert!(forest.predict(&[vec![1.0, 2.0]]).is_err());
        assert_eq!(forest.predict(&[]).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn refuses_empty_training_data() {
        assert!(PriceForest::fit(&[], &[], params()).is_err());
    }
}
