use crate::domain::errors::ForecastError;
use crate::domain::market::Candle;
use crate::domain::ml::{PredictionArtifact, PredictionId, RunId, TrainedModel};
use anyhow::Result;
use async_trait::async_trait;

/// Supplies historical candles. Implementations must return candles in
/// ascending timestamp order; the pipeline does not re-sort.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_candles(&self, asset: &str, timeframe: &str) -> Result<Vec<Candle>>;
}

/// Append-only persistence for model runs and predictions.
///
/// Keys are timestamp-prefixed (see `domain::ml::keys`), so the greatest
/// `RunId` for an asset is its most recent model. Writes must be atomic:
/// a concurrent `latest_model` may never observe a partially written artifact.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Persists a model and returns its location. Fails if the key exists.
    async fn save_model(&self, model: &TrainedModel) -> Result<String, ForecastError>;

    /// Persists a prediction and returns its location. Fails if the key exists.
    async fn save_prediction(
        &self,
        prediction: &PredictionArtifact,
    ) -> Result<String, ForecastError>;

    /// All run ids recorded for `asset`, in ascending order.
    async fn list_models(&self, asset: &str) -> Result<Vec<RunId>, ForecastError>;

    /// Loads and validates a model against the current feature schema.
    async fn load_model(&self, run_id: &RunId) -> Result<TrainedModel, ForecastError>;

    async fn load_prediction(
        &self,
        prediction_id: &PredictionId,
    ) -> Result<PredictionArtifact, ForecastError>;

    /// Location `save_model` reported (or would report) for `run_id`.
    fn model_location(&self, run_id: &RunId) -> String;

    /// The most recent model for `asset`.
    async fn latest_model(&self, asset: &str) -> Result<TrainedModel, ForecastError> {
        let latest = self
            .list_models(asset)
            .await?
            .into_iter()
            .max()
            .ok_or_else(|| ForecastError::NoModelFound {
                asset: asset.to_string(),
            })?;
        self.load_model(&latest).await
    }
}
