use super::features::FeatureBuilder;
use super::linear_regression::{LinearModel, evaluate, fit_gradient_descent};
use super::standardizer::Standardizer;
use crate::domain::errors::ForecastError;
use crate::domain::market::Candle;
use crate::domain::ml::keys::validate_identifier;
use crate::domain::ml::{
    FEATURE_COUNT, ModelMetrics, RunId, StandardizationParams, TrainResult, TrainedModel,
    feature_registry::feature_schema,
};
use crate::domain::ports::{CandleSource, ModelStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Share of rows (chronological prefix) used for fitting; the rest validates.
pub const TRAIN_FRACTION: f64 = 0.8;

/// Output of the pure fitting step, before anything is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    pub standardization: StandardizationParams,
    pub model: LinearModel,
    pub metrics: ModelMetrics,
    pub sample_count: usize,
    pub split_index: usize,
}

/// Builds features, splits forward in time (never shuffled), standardizes on
/// the training prefix only, fits by gradient descent and scores the
/// validation suffix.
pub fn fit_model(candles: &[Candle]) -> Result<FittedModel, ForecastError> {
    let rows = FeatureBuilder::build_rows(candles)?;
    let split_index = (rows.len() as f64 * TRAIN_FRACTION).floor() as usize;
    let (train_rows, validation_rows) = rows.split_at(split_index);

    debug!(
        "Split {} rows: {} training, {} validation",
        rows.len(),
        train_rows.len(),
        validation_rows.len()
    );

    let standardization = Standardizer::fit(train_rows);
    let train_std = Standardizer::apply(train_rows, &standardization);
    let validation_std = Standardizer::apply(validation_rows, &standardization);

    let model = fit_gradient_descent(&train_std);

    let actual: Vec<f64> = validation_std.iter().map(|row| row.target).collect();
    let predicted = model.predict_batch(&validation_std);
    let metrics = evaluate(&actual, &predicted);

    Ok(FittedModel {
        standardization,
        model,
        metrics,
        sample_count: rows.len(),
        split_index,
    })
}

/// Trains and persists one model per (asset, timeframe) call.
///
/// Holds no mutable state, so independent pairs can be trained concurrently
/// from a shared `Arc<Trainer>`.
pub struct Trainer {
    candles: Arc<dyn CandleSource>,
    store: Arc<dyn ModelStore>,
}

impl Trainer {
    pub fn new(candles: Arc<dyn CandleSource>, store: Arc<dyn ModelStore>) -> Self {
        Self { candles, store }
    }

    pub async fn train(&self, asset: &str, timeframe: &str) -> Result<TrainResult, ForecastError> {
        validate_identifier(asset)?;
        validate_identifier(timeframe)?;

        let candles = self
            .candles
            .fetch_candles(asset, timeframe)
            .await
            .map_err(|source| ForecastError::CandleSource {
                asset: asset.to_string(),
                timeframe: timeframe.to_string(),
                source,
            })?;
        info!(
            "Training {}/{} on {} candles",
            asset,
            timeframe,
            candles.len()
        );

        let fitted = fit_model(&candles)?;
        info!(
            "{}/{} validation: MAE={:.6}, RMSE={:.6}, directional accuracy={:.1}%",
            asset,
            timeframe,
            fitted.metrics.mae,
            fitted.metrics.rmse,
            fitted.metrics.directional_accuracy * 100.0
        );

        let run_id = RunId::new(asset, timeframe)?;
        let model = TrainedModel {
            run_id: run_id.clone(),
            asset: asset.to_string(),
            timeframe: timeframe.to_string(),
            trained_at: Utc::now(),
            feature_schema: feature_schema(),
            means: fitted.standardization.means.to_vec(),
            std_devs: fitted.standardization.std_devs.to_vec(),
            weights: fitted.model.weights.to_vec(),
            bias: fitted.model.bias,
            metrics: fitted.metrics,
        };

        let model_path = self.store.save_model(&model).await?;
        info!("Saved model run {} to {}", run_id, model_path);

        Ok(TrainResult {
            run_id,
            asset: asset.to_string(),
            timeframe: timeframe.to_string(),
            sample_count: fitted.sample_count,
            split_index: fitted.split_index,
            feature_count: FEATURE_COUNT,
            metrics: fitted.metrics,
            model_path,
        })
    }
}
