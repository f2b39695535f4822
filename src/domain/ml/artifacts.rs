//! Persisted artifacts and the summaries returned to callers.
//!
//! Artifacts are serialized with camelCase keys; this is the on-disk format
//! and existing model runs must stay readable.

use super::feature_registry::{FEATURE_COUNT, FeatureVector, matches_schema};
use super::keys::{PredictionId, RunId};
use crate::domain::errors::ForecastError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-feature z-score parameters fitted on a training set.
///
/// Every entry of `std_devs` is strictly positive; the standardizer replaces a
/// zero deviation by 1 before constructing this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizationParams {
    pub means: FeatureVector,
    pub std_devs: FeatureVector,
}

/// Validation-set error metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub directional_accuracy: f64,
}

/// A trained linear model. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainedModel {
    pub run_id: RunId,
    pub asset: String,
    pub timeframe: String,
    pub trained_at: DateTime<Utc>,
    pub feature_schema: Vec<String>,
    pub means: Vec<f64>,
    pub std_devs: Vec<f64>,
    pub weights: Vec<f64>,
    pub bias: f64,
    pub metrics: ModelMetrics,
}

fn to_feature_vector(name: &str, values: &[f64]) -> Result<FeatureVector, ForecastError> {
    FeatureVector::try_from(values).map_err(|_| ForecastError::SchemaMismatch {
        reason: format!(
            "{} has {} entries, expected {}",
            name,
            values.len(),
            FEATURE_COUNT
        ),
    })
}

impl TrainedModel {
    /// Checks that the artifact can be applied to the current feature schema.
    pub fn validate(&self) -> Result<(), ForecastError> {
        if !matches_schema(&self.feature_schema) {
            return Err(ForecastError::SchemaMismatch {
                reason: format!("featureSchema is {:?}", self.feature_schema),
            });
        }
        self.standardization()?;
        self.weight_vector()?;
        if self.std_devs.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(ForecastError::SchemaMismatch {
                reason: "stdDevs must be strictly positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn standardization(&self) -> Result<StandardizationParams, ForecastError> {
        Ok(StandardizationParams {
            means: to_feature_vector("means", &self.means)?,
            std_devs: to_feature_vector("stdDevs", &self.std_devs)?,
        })
    }

    pub fn weight_vector(&self) -> Result<FeatureVector, ForecastError> {
        to_feature_vector("weights", &self.weights)
    }
}

/// Record of one forecast. Never mutated after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionArtifact {
    pub prediction_id: PredictionId,
    pub generated_at: DateTime<Utc>,
    pub asset: String,
    pub horizon: u32,
    pub timeframe: String,
    pub model_run_id: RunId,
    pub predicted_one_step_return: f64,
    pub predicted_return: f64,
    pub latest_close: f64,
    pub predicted_close: f64,
}

/// Summary returned by a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainResult {
    pub run_id: RunId,
    pub asset: String,
    pub timeframe: String,
    pub sample_count: usize,
    pub split_index: usize,
    pub feature_count: usize,
    pub metrics: ModelMetrics,
    pub model_path: String,
}

/// Summary returned by a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub prediction_id: PredictionId,
    pub asset: String,
    pub horizon: u32,
    pub timeframe: String,
    pub model_run_id: RunId,
    pub generated_at: DateTime<Utc>,
    pub predicted_one_step_return: f64,
    pub predicted_return: f64,
    pub latest_close: f64,
    pub predicted_close: f64,
    pub model_path: String,
    pub prediction_path: String,
}
