use crate::domain::ml::keys::validate_identifier;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Runtime configuration, read from the environment (and `.env` when the
/// binary loads it). Training hyperparameters are fixed and not part of it.
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub candles_dir: PathBuf,
    pub model_runs_dir: PathBuf,
    pub predictions_dir: PathBuf,
    pub assets: Vec<String>,
    pub timeframe: String,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            candles_dir: PathBuf::from("data/candles"),
            model_runs_dir: PathBuf::from("model_runs"),
            predictions_dir: PathBuf::from("predictions"),
            assets: vec!["BTC-USD".to_string(), "ETH-USD".to_string()],
            timeframe: "1h".to_string(),
        }
    }
}

impl ForecastConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let candles_dir = lookup("CANDLES_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.candles_dir);
        let model_runs_dir = lookup("MODEL_RUNS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_runs_dir);
        let predictions_dir = lookup("PREDICTIONS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.predictions_dir);

        let assets = match lookup("FORECAST_ASSETS") {
            Some(raw) => parse_assets(&raw)?,
            None => defaults.assets,
        };

        let timeframe = lookup("FORECAST_TIMEFRAME")
            .map(|s| s.trim().to_string())
            .unwrap_or(defaults.timeframe);
        validate_identifier(&timeframe)
            .with_context(|| format!("Invalid FORECAST_TIMEFRAME: {}", timeframe))?;

        Ok(Self {
            candles_dir,
            model_runs_dir,
            predictions_dir,
            assets,
            timeframe,
        })
    }
}

fn parse_assets(raw: &str) -> Result<Vec<String>> {
    let assets: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if assets.is_empty() {
        anyhow::bail!("FORECAST_ASSETS must name at least one asset");
    }
    for asset in &assets {
        validate_identifier(asset)
            .with_context(|| format!("Invalid FORECAST_ASSETS entry: {}", asset))?;
    }
    Ok(assets)
}
