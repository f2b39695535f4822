//! In-Memory Adapters
//!
//! Thread-safe, in-memory implementations of the `CandleSource` and
//! `ModelStore` ports.
//!
//! # Features
//!
//! - **Thread-safe**: Uses `Arc<RwLock>` for concurrent access
//! - **Async**: All operations are async-ready
//! - **Testing**: Ideal for unit tests and embedding the pipeline in another service
//!
//! # Limitations
//!
//! - Artifacts are lost on restart
//! - No sharing across processes
//!
//! For durable storage use `FileModelStore`.

use crate::domain::errors::ForecastError;
use crate::domain::market::Candle;
use crate::domain::ml::{PredictionArtifact, PredictionId, RunId, TrainedModel};
use crate::domain::ports::{CandleSource, ModelStore};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Candle source backed by a map of (asset, timeframe) to candles.
#[derive(Clone, Default)]
pub struct InMemoryCandleSource {
    candles: Arc<RwLock<HashMap<(String, String), Vec<Candle>>>>,
}

impl InMemoryCandleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the series for (asset, timeframe).
    pub async fn insert(&self, asset: &str, timeframe: &str, candles: Vec<Candle>) {
        self.candles
            .write()
            .await
            .insert((asset.to_string(), timeframe.to_string()), candles);
    }
}

#[async_trait]
impl CandleSource for InMemoryCandleSource {
    async fn fetch_candles(&self, asset: &str, timeframe: &str) -> Result<Vec<Candle>> {
        self.candles
            .read()
            .await
            .get(&(asset.to_string(), timeframe.to_string()))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No candles for {}/{}", asset, timeframe))
    }
}

/// Model store keeping artifacts in ordered maps keyed by their string key.
#[derive(Clone, Default)]
pub struct InMemoryModelStore {
    models: Arc<RwLock<BTreeMap<String, TrainedModel>>>,
    predictions: Arc<RwLock<BTreeMap<String, PredictionArtifact>>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn model_count(&self) -> usize {
        self.models.read().await.len()
    }

    pub async fn prediction_count(&self) -> usize {
        self.predictions.read().await.len()
    }
}

fn insert_once<T: Clone>(
    map: &mut BTreeMap<String, T>,
    key: String,
    artifact: &T,
) -> Result<(), ForecastError> {
    if map.contains_key(&key) {
        return Err(ForecastError::ArtifactExists { key });
    }
    map.insert(key, artifact.clone());
    Ok(())
}

#[async_trait]
impl ModelStore for InMemoryModelStore {
    async fn save_model(&self, model: &TrainedModel) -> Result<String, ForecastError> {
        let key = model.run_id.to_string();
        insert_once(&mut *self.models.write().await, key, model)?;
        Ok(self.model_location(&model.run_id))
    }

    async fn save_prediction(
        &self,
        prediction: &PredictionArtifact,
    ) -> Result<String, ForecastError> {
        let key = prediction.prediction_id.to_string();
        let location = format!("memory://predictions/{}", key);
        insert_once(&mut *self.predictions.write().await, key, prediction)?;
        Ok(location)
    }

    async fn list_models(&self, asset: &str) -> Result<Vec<RunId>, ForecastError> {
        let mut run_ids: Vec<RunId> = self
            .models
            .read()
            .await
            .values()
            .map(|model| model.run_id.clone())
            .filter(|run_id| run_id.asset() == asset)
            .collect();
        run_ids.sort();
        Ok(run_ids)
    }

    async fn load_model(&self, run_id: &RunId) -> Result<TrainedModel, ForecastError> {
        let model = self
            .models
            .read()
            .await
            .get(&run_id.to_string())
            .cloned()
            .ok_or_else(|| ForecastError::NoModelFound {
                asset: run_id.asset().to_string(),
            })?;
        model.validate()?;
        Ok(model)
    }

    async fn load_prediction(
        &self,
        prediction_id: &PredictionId,
    ) -> Result<PredictionArtifact, ForecastError> {
        self.predictions
            .read()
            .await
            .get(&prediction_id.to_string())
            .cloned()
            .ok_or_else(|| ForecastError::PredictionNotFound {
                key: prediction_id.to_string(),
            })
    }

    fn model_location(&self, run_id: &RunId) -> String {
        format!("memory://model_runs/{}", run_id)
    }
}
