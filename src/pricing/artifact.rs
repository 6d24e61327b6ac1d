use crate::error::RecommendError;
use crate::features::{FeatureSchema, Preprocessing};
use crate::pricing::forest::PriceForest;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::path::Path;
use tracing::info;

pub const FORMAT_VERSION: u32 = 1;

/// Fitted forest bundled with the schema and preprocessing it was trained with
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainedModel {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    /// Calendar year ages were computed against at training time
    pub reference_year: i32,
    pub schema: FeatureSchema,
    pub preprocessing: Preprocessing,
    pub estimator: PriceForest,
}

impl TrainedModel {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)
            .context("Failed to serialize model")?;
        info!("💾 Model saved to {}", path.display());
        Ok(())
    }

    /// Load and check an artifact
    pub fn load(path: &Path) -> Result<Self, RecommendError> {
        let file = std::fs::File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RecommendError::ModelMissing {
                    path: path.to_path_buf(),
                }
            } else {
                RecommendError::ModelCorrupt {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }
        })?;

        let model: TrainedModel =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| RecommendError::ModelCorrupt {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if model.format_version != FORMAT_VERSION {
            return Err(RecommendError::ModelCorrupt {
                path: path.to_path_buf(),
                message: format!(
                    "format version {} is not supported (expected {})",
                    model.format_version, FORMAT_VERSION
                ),
            });
        }
        model.check_schema()?;

        info!(
            "Loaded model from {} ({} features, trained {})",
            path.display(),
            model.schema.len(),
            model.trained_at.format("%Y-%m-%d")
        );
        Ok(model)
    }

    /// The schema must be non-empty and exactly as wide as the estimator input
    pub fn check_schema(&self) -> Result<(), RecommendError> {
        let expected = self.estimator.n_features();
        let found = self.schema.len();
        if found == 0 || found != expected {
            return Err(RecommendError::SchemaMismatch { expected, found });
        }
        Ok(())
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, RecommendError> {
        self.estimator.predict(x).map_err(RecommendError::Prediction)
    }
}
