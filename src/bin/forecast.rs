//! Forecast CLI
//!
//! Trains per-asset linear return models from stored candles and produces
//! multi-step price forecasts from the latest trained model.
//!
//! # Usage
//! ```sh
//! forecast train --asset BTC-USD --asset ETH-USD --timeframe 1h
//! forecast predict --asset BTC-USD --horizon 5
//! forecast models --asset BTC-USD
//! ```
//!
//! # Environment Variables
//! - `CANDLES_DIR` - Directory of candle files (default: data/candles)
//! - `MODEL_RUNS_DIR` - Where model runs are written (default: model_runs)
//! - `PREDICTIONS_DIR` - Where predictions are written (default: predictions)
//! - `FORECAST_ASSETS` - Assets trained when no `--asset` is given (default: BTC-USD,ETH-USD)
//! - `FORECAST_TIMEFRAME` - Timeframe trained when none is given (default: 1h)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forecaster::application::ml::{Predictor, Trainer};
use forecaster::config::ForecastConfig;
use forecaster::domain::ports::{CandleSource, ModelStore};
use forecaster::infrastructure::{FileCandleSource, FileModelStore};
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Candle-based price forecaster", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train one model per asset and persist it
    Train {
        /// Asset to train (repeatable). Defaults to FORECAST_ASSETS
        #[arg(short, long)]
        asset: Vec<String>,

        /// Candle timeframe. Defaults to FORECAST_TIMEFRAME
        #[arg(short, long)]
        timeframe: Option<String>,
    },
    /// Forecast with the latest model of an asset
    Predict {
        #[arg(short, long)]
        asset: String,

        /// Number of timeframe steps ahead (>= 1)
        #[arg(long, default_value_t = 1)]
        horizon: u32,
    },
    /// List persisted model runs for an asset, oldest first
    Models {
        #[arg(short, long)]
        asset: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs on stderr; stdout carries the JSON results
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(Level::INFO.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();

    let cli = Cli::parse();
    let config = ForecastConfig::from_env()?;

    let candles: Arc<dyn CandleSource> = Arc::new(FileCandleSource::from_config(&config));
    let store: Arc<dyn ModelStore> = Arc::new(FileModelStore::from_config(&config));

    match cli.command {
        Commands::Train { asset, timeframe } => {
            let assets = if asset.is_empty() {
                config.assets.clone()
            } else {
                asset
            };
            let timeframe = timeframe.unwrap_or_else(|| config.timeframe.clone());
            let trainer = Arc::new(Trainer::new(candles, store));
            run_training(trainer, assets, timeframe).await
        }
        Commands::Predict { asset, horizon } => {
            let predictor = Predictor::new(candles, store);
            let result = predictor
                .predict(&asset, horizon)
                .await
                .with_context(|| format!("Prediction failed for {}", asset))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Commands::Models { asset } => {
            let run_ids = store.list_models(&asset).await?;
            if run_ids.is_empty() {
                info!("No model runs for {}", asset);
            }
            for run_id in run_ids {
                println!("{}\t{}", run_id, store.model_location(&run_id));
            }
            Ok(())
        }
    }
}

/// Trains every asset concurrently; each run is independent.
async fn run_training(
    trainer: Arc<Trainer>,
    assets: Vec<String>,
    timeframe: String,
) -> Result<()> {
    info!(
        "Training {} asset(s) on {}: {:?}",
        assets.len(),
        timeframe,
        assets
    );

    let handles: Vec<_> = assets
        .into_iter()
        .map(|asset| {
            let trainer = trainer.clone();
            let timeframe = timeframe.clone();
            tokio::spawn(async move {
                let result = trainer.train(&asset, &timeframe).await;
                (asset, result)
            })
        })
        .collect();

    let mut failures = 0;
    for outcome in futures::future::join_all(handles).await {
        let (asset, result) = outcome.context("Training task panicked")?;
        match result {
            Ok(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            Err(e) => {
                error!("Training failed for {}: {}", asset, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} training run(s) failed", failures);
    }
    Ok(())
}
