use super::features::FeatureBuilder;
use super::linear_regression::LinearModel;
use super::standardizer::Standardizer;
use crate::domain::errors::ForecastError;
use crate::domain::ml::keys::validate_identifier;
use crate::domain::ml::{PredictionArtifact, PredictionId, PredictionResult};
use crate::domain::ports::{CandleSource, ModelStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Compounds a one-step return over `horizon` steps, assuming the same return
/// repeats every step: `(1 + r)^horizon - 1`.
pub fn compound_return(one_step_return: f64, horizon: u32) -> f64 {
    (1.0 + one_step_return).powf(f64::from(horizon)) - 1.0
}

/// Produces forecasts from the latest persisted model of an asset.
pub struct Predictor {
    candles: Arc<dyn CandleSource>,
    store: Arc<dyn ModelStore>,
}

impl Predictor {
    pub fn new(candles: Arc<dyn CandleSource>, store: Arc<dyn ModelStore>) -> Self {
        Self { candles, store }
    }

    pub async fn predict(
        &self,
        asset: &str,
        horizon: u32,
    ) -> Result<PredictionResult, ForecastError> {
        if horizon < 1 {
            return Err(ForecastError::InvalidHorizon { horizon });
        }
        validate_identifier(asset)?;

        let model = self.store.latest_model(asset).await?;

        let candles = self
            .candles
            .fetch_candles(asset, &model.timeframe)
            .await
            .map_err(|source| ForecastError::CandleSource {
                asset: asset.to_string(),
                timeframe: model.timeframe.clone(),
                source,
            })?;

        let raw = FeatureBuilder::latest_features(&candles)?;
        let standardized = Standardizer::apply_vector(&raw, &model.standardization()?);
        let linear = LinearModel::new(model.weight_vector()?, model.bias);

        let predicted_one_step_return = linear.predict(&standardized);
        let predicted_return = compound_return(predicted_one_step_return, horizon);
        // latest_features guarantees at least one candle
        let latest_close = candles[candles.len() - 1].close;
        let predicted_close = latest_close * (1.0 + predicted_return);

        let prediction_id = PredictionId::new(asset, horizon)?;
        let artifact = PredictionArtifact {
            prediction_id: prediction_id.clone(),
            generated_at: Utc::now(),
            asset: asset.to_string(),
            horizon,
            timeframe: model.timeframe.clone(),
            model_run_id: model.run_id.clone(),
            predicted_one_step_return,
            predicted_return,
            latest_close,
            predicted_close,
        };
        let prediction_path = self.store.save_prediction(&artifact).await?;

        info!(
            "Prediction {} for {} (h={}, model {}): return {:+.4}%, close {:.4} -> {:.4}",
            prediction_id,
            asset,
            horizon,
            model.run_id,
            predicted_return * 100.0,
            latest_close,
            predicted_close
        );

        Ok(PredictionResult {
            prediction_id,
            asset: artifact.asset,
            horizon,
            timeframe: artifact.timeframe,
            model_run_id: artifact.model_run_id,
            generated_at: artifact.generated_at,
            predicted_one_step_return,
            predicted_return,
            latest_close,
            predicted_close,
            model_path: self.store.model_location(&model.run_id),
            prediction_path,
        })
    }
}
