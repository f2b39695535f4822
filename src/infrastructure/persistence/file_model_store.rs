//! File-backed model store.
//!
//! Each artifact is one pretty-printed JSON file named `<key>.json`, model
//! runs and predictions in separate directories. Writes go to a hidden temp
//! file first and are hard-linked into place, so readers only ever see
//! complete artifacts and an existing artifact is never replaced.

use crate::config::ForecastConfig;
use crate::domain::errors::ForecastError;
use crate::domain::ml::{PredictionArtifact, PredictionId, RunId, TrainedModel};
use crate::domain::ports::ModelStore;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const ARTIFACT_EXTENSION: &str = ".json";

pub struct FileModelStore {
    model_dir: PathBuf,
    prediction_dir: PathBuf,
}

impl FileModelStore {
    pub fn new(model_dir: impl Into<PathBuf>, prediction_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            prediction_dir: prediction_dir.into(),
        }
    }

    pub fn from_config(config: &ForecastConfig) -> Self {
        Self::new(
            config.model_runs_dir.clone(),
            config.predictions_dir.clone(),
        )
    }

    fn artifact_path(dir: &Path, key: &str) -> PathBuf {
        dir.join(format!("{}{}", key, ARTIFACT_EXTENSION))
    }

    async fn write_atomic<T: Serialize>(
        dir: &Path,
        key: &str,
        artifact: &T,
    ) -> Result<PathBuf, ForecastError> {
        fs::create_dir_all(dir).await?;

        let path = Self::artifact_path(dir, key);
        let content = serde_json::to_string_pretty(artifact)?;
        let exists = || ForecastError::ArtifactExists {
            key: key.to_string(),
        };

        // create_new also catches a concurrent writer of the same key
        let temp_path = dir.join(format!(".{}{}.tmp", key, ARTIFACT_EXTENSION));
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => exists(),
                _ => ForecastError::Io(e),
            })?;

        let published = Self::flush_and_publish(file, &content, &temp_path, &path).await;
        fs::remove_file(&temp_path).await.ok();
        match published {
            Ok(()) => {
                debug!("Wrote artifact {:?}", path);
                Ok(path)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(exists()),
            Err(e) => Err(e.into()),
        }
    }

    /// Hard-links the finished temp file into place; unlike a rename, the
    /// link never replaces an existing artifact.
    async fn flush_and_publish(
        mut file: fs::File,
        content: &str,
        temp_path: &Path,
        path: &Path,
    ) -> std::io::Result<()> {
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        fs::hard_link(temp_path, path).await
    }

    async fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ForecastError> {
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl ModelStore for FileModelStore {
    async fn save_model(&self, model: &TrainedModel) -> Result<String, ForecastError> {
        let key = model.run_id.to_string();
        let path = Self::write_atomic(&self.model_dir, &key, model).await?;
        Ok(path.display().to_string())
    }

    async fn save_prediction(
        &self,
        prediction: &PredictionArtifact,
    ) -> Result<String, ForecastError> {
        let key = prediction.prediction_id.to_string();
        let path = Self::write_atomic(&self.prediction_dir, &key, prediction).await?;
        Ok(path.display().to_string())
    }

    async fn list_models(&self, asset: &str) -> Result<Vec<RunId>, ForecastError> {
        let mut entries = match fs::read_dir(&self.model_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut run_ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let Some(key) = name.strip_suffix(ARTIFACT_EXTENSION) else {
                continue;
            };
            match key.parse::<RunId>() {
                Ok(run_id) if run_id.asset() == asset => run_ids.push(run_id),
                Ok(_) => {}
                Err(e) => warn!(
                    "Ignoring unrecognised file in model directory: {} ({})",
                    name, e
                ),
            }
        }

        run_ids.sort();
        Ok(run_ids)
    }

    async fn load_model(&self, run_id: &RunId) -> Result<TrainedModel, ForecastError> {
        let path = Self::artifact_path(&self.model_dir, &run_id.to_string());
        let model: TrainedModel = match Self::read_artifact(&path).await {
            Err(ForecastError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(ForecastError::NoModelFound {
                    asset: run_id.asset().to_string(),
                });
            }
            other => other?,
        };
        model.validate()?;
        Ok(model)
    }

    async fn load_prediction(
        &self,
        prediction_id: &PredictionId,
    ) -> Result<PredictionArtifact, ForecastError> {
        let key = prediction_id.to_string();
        let path = Self::artifact_path(&self.prediction_dir, &key);
        match Self::read_artifact(&path).await {
            Err(ForecastError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                Err(ForecastError::PredictionNotFound { key })
            }
            other => other,
        }
    }

    fn model_location(&self, run_id: &RunId) -> String {
        Self::artifact_path(&self.model_dir, &run_id.to_string())
            .display()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::feature_registry::feature_schema;
    use crate::domain::ml::ModelMetrics;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn create_test_dir() -> PathBuf {
        let unique_id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let temp_dir = std::env::temp_dir().join(format!(
            "forecaster_test_{}_{}_store",
            std::process::id(),
            unique_id
        ));
        std::fs::create_dir_all(&temp_dir).expect("Failed to create test temp dir");
        temp_dir
    }

    fn cleanup_test_dir(temp_dir: PathBuf) {
        std::fs::remove_dir_all(temp_dir).ok();
    }

    fn store_in(dir: &Path) -> FileModelStore {
        FileModelStore::new(dir.join("model_runs"), dir.join("predictions"))
    }

    fn model(run_id: RunId) -> TrainedModel {
        TrainedModel {
            asset: run_id.asset().to_string(),
            timeframe: run_id.timeframe().to_string(),
            run_id,
            trained_at: Utc::now(),
            feature_schema: feature_schema(),
            means: vec![0.1 / 3.0, -1e-7, 0.0, 1.0 / 7.0, 2.5, -0.333, 1e-12, 0.7],
            std_devs: vec![0.017, 1.0, 0.2, 3.0, 1e-9, 0.4, 0.5, 0.6],
            weights: vec![0.123456789, -2.0 / 3.0, 1e-17, 0.1, 0.2, 0.3, -0.4, 5e-5],
            bias: std::f64::consts::PI * 1e-4,
            metrics: ModelMetrics {
                mae: 0.001,
                rmse: 0.002,
                directional_accuracy: 0.55,
            },
        }
    }

    #[tokio::test]
    async fn test_save_and_load_is_bit_identical() {
        let dir = create_test_dir();
        let store = store_in(&dir);
        let original = model(RunId::at(1_700_000_000_000, "BTC-USD", "1h").unwrap());

        let location = store.save_model(&original).await.unwrap();
        assert!(location.ends_with("1700000000000_BTC-USD_1h.json"));
        assert_eq!(location, store.model_location(&original.run_id));

        let loaded = store.load_model(&original.run_id).await.unwrap();
        for (a, b) in loaded.weights.iter().zip(&original.weights) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        for (a, b) in loaded.means.iter().zip(&original.means) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        for (a, b) in loaded.std_devs.iter().zip(&original.std_devs) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        assert_eq!(loaded.bias.to_bits(), original.bias.to_bits());
        assert_eq!(loaded, original);
        cleanup_test_dir(dir);
    }

    #[tokio::test]
    async fn test_latest_model_by_creation_time() {
        let dir = create_test_dir();
        let store = store_in(&dir);
        for millis in [999, 1_000, 20_000] {
            let run_id = RunId::at(millis, "ETH-USD", "1h").unwrap();
            store.save_model(&model(run_id)).await.unwrap();
        }
        store
            .save_model(&model(RunId::at(50_000, "ETH-BTC", "1h").unwrap()))
            .await
            .unwrap();

        let listed = store.list_models("ETH-USD").await.unwrap();
        let millis: Vec<i64> = listed.iter().map(|r| r.created_at_ms()).collect();
        assert_eq!(millis, vec![999, 1_000, 20_000]);

        let latest = store.latest_model("ETH-USD").await.unwrap();
        assert_eq!(latest.run_id.created_at_ms(), 20_000);
        cleanup_test_dir(dir);
    }

    #[tokio::test]
    async fn test_missing_directory_means_no_model() {
        let dir = create_test_dir();
        let store = store_in(&dir);

        assert!(store.list_models("BTC-USD").await.unwrap().is_empty());
        let err = store.latest_model("BTC-USD").await.unwrap_err();
        assert!(matches!(err, ForecastError::NoModelFound { .. }));
        cleanup_test_dir(dir);
    }

    #[tokio::test]
    async fn test_duplicate_run_rejected_and_no_temp_files() {
        let dir = create_test_dir();
        let store = store_in(&dir);
        let run_id = RunId::at(42, "BTC-USD", "1h").unwrap();

        store.save_model(&model(run_id.clone())).await.unwrap();
        let err = store.save_model(&model(run_id)).await.unwrap_err();
        assert!(matches!(err, ForecastError::ArtifactExists { .. }));

        let names: Vec<String> = std::fs::read_dir(dir.join("model_runs"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["0000000000042_BTC-USD_1h.json"]);
        cleanup_test_dir(dir);
    }

    #[tokio::test]
    async fn test_existing_file_never_overwritten() {
        let dir = create_test_dir();
        let store = store_in(&dir);
        let run_id = RunId::at(43, "BTC-USD", "1h").unwrap();
        let model_dir = dir.join("model_runs");
        std::fs::create_dir_all(&model_dir).unwrap();
        let path = FileModelStore::artifact_path(&model_dir, &run_id.to_string());
        std::fs::write(&path, "written by another process").unwrap();

        let err = store.save_model(&model(run_id)).await.unwrap_err();
        assert!(matches!(err, ForecastError::ArtifactExists { .. }));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "written by another process"
        );
        assert_eq!(std::fs::read_dir(&model_dir).unwrap().count(), 1);
        cleanup_test_dir(dir);
    }

    #[tokio::test]
    async fn test_unpadded_key_skipped_when_listing() {
        let dir = create_test_dir();
        let store = store_in(&dir);
        let older = RunId::at(3, "BTC-USD", "1h").unwrap();
        let newer = RunId::at(5, "BTC-USD", "1h").unwrap();
        store.save_model(&model(older)).await.unwrap();
        store.save_model(&model(newer.clone())).await.unwrap();

        let model_dir = dir.join("model_runs");
        std::fs::rename(
            FileModelStore::artifact_path(&model_dir, &newer.to_string()),
            model_dir.join("5_BTC-USD_1h.json"),
        )
        .unwrap();

        let listed = store.list_models("BTC-USD").await.unwrap();
        let millis: Vec<i64> = listed.iter().map(|r| r.created_at_ms()).collect();
        assert_eq!(millis, vec![3]);
        let latest = store.latest_model("BTC-USD").await.unwrap();
        assert_eq!(latest.run_id.created_at_ms(), 3);
        cleanup_test_dir(dir);
    }

    #[tokio::test]
    async fn test_missing_prediction_not_found() {
        let dir = create_test_dir();
        let store = store_in(&dir);
        let id = PredictionId::at(9, "BTC-USD", 2).unwrap();

        let err = store.load_prediction(&id).await.unwrap_err();
        assert!(matches!(
            err,
            ForecastError::PredictionNotFound { key } if key == "0000000000009_BTC-USD_h2"
        ));
        cleanup_test_dir(dir);
    }

    #[tokio::test]
    async fn test_tampered_schema_rejected_on_load() {
        let dir = create_test_dir();
        let store = store_in(&dir);
        let run_id = RunId::at(7, "BTC-USD", "1h").unwrap();
        store.save_model(&model(run_id.clone())).await.unwrap();

        let path = FileModelStore::artifact_path(&dir.join("model_runs"), &run_id.to_string());
        let content = std::fs::read_to_string(&path).unwrap();
        let mut json: serde_json::Value = serde_json::from_str(&content).unwrap();
        json["featureSchema"][0] = serde_json::Value::String("return_2".to_string());
        std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

        let err = store.load_model(&run_id).await.unwrap_err();
        assert!(matches!(err, ForecastError::SchemaMismatch { .. }));
        cleanup_test_dir(dir);
    }

    #[tokio::test]
    async fn test_stray_files_ignored_when_listing() {
        let dir = create_test_dir();
        let store = store_in(&dir);
        store
            .save_model(&model(RunId::at(1, "BTC-USD", "1h").unwrap()))
            .await
            .unwrap();
        let model_dir = dir.join("model_runs");
        std::fs::write(model_dir.join("notes.txt"), "x").unwrap();
        std::fs::write(model_dir.join("garbage.json"), "{}").unwrap();
        std::fs::write(model_dir.join(".0000000000002_BTC-USD_1h.json.tmp"), "").unwrap();

        let listed = store.list_models("BTC-USD").await.unwrap();
        assert_eq!(listed.len(), 1);
        cleanup_test_dir(dir);
    }

    #[tokio::test]
    async fn test_prediction_round_trip() {
        let dir = create_test_dir();
        let store = store_in(&dir);
        let artifact = PredictionArtifact {
            prediction_id: PredictionId::at(1_700_000_000_123, "BTC-USD", 5).unwrap(),
            generated_at: Utc::now(),
            asset: "BTC-USD".to_string(),
            horizon: 5,
            timeframe: "1h".to_string(),
            model_run_id: RunId::at(1_700_000_000_000, "BTC-USD", "1h").unwrap(),
            predicted_one_step_return: 0.001,
            predicted_return: 1.001_f64.powi(5) - 1.0,
            latest_close: 42_000.0,
            predicted_close: 42_000.0 * 1.001_f64.powi(5),
        };

        let location = store.save_prediction(&artifact).await.unwrap();
        assert!(location.ends_with("1700000000123_BTC-USD_h5.json"));

        let loaded = store
            .load_prediction(&artifact.prediction_id)
            .await
            .unwrap();
        assert_eq!(loaded, artifact);
        cleanup_test_dir(dir);
    }
}
