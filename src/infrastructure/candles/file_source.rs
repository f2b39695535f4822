use crate::config::ForecastConfig;
use crate::domain::market::Candle;
use crate::domain::ports::CandleSource;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandleFormat {
    Json,
    Csv,
}

/// Reads candle series from a directory of JSON or CSV files.
///
/// For `BTC-USD` / `1h` the first existing file among `BTC-USD_1h`,
/// `BTC-USD-1h` and `BTC-USD.1h` is used, JSON before CSV. JSON files hold an
/// array of candle objects; CSV files have a
/// `timestamp,open,high,low,close,volume` header.
pub struct FileCandleSource {
    candles_dir: PathBuf,
}

impl FileCandleSource {
    pub fn new(candles_dir: impl Into<PathBuf>) -> Self {
        Self {
            candles_dir: candles_dir.into(),
        }
    }

    pub fn from_config(config: &ForecastConfig) -> Self {
        Self::new(config.candles_dir.clone())
    }

    fn candidates(asset: &str, timeframe: &str) -> Vec<(String, CandleFormat)> {
        let stems = [
            format!("{}_{}", asset, timeframe),
            format!("{}-{}", asset, timeframe),
            format!("{}.{}", asset, timeframe),
        ];
        [(CandleFormat::Json, "json"), (CandleFormat::Csv, "csv")]
            .into_iter()
            .flat_map(|(format, ext)| {
                stems
                    .iter()
                    .map(move |stem| (format!("{}.{}", stem, ext), format))
            })
            .collect()
    }

    async fn read_file(path: &Path, format: CandleFormat) -> Result<Vec<Candle>> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read candle file {:?}", path))?;

        match format {
            CandleFormat::Json => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse candle JSON {:?}", path)),
            CandleFormat::Csv => parse_csv(&content)
                .with_context(|| format!("Failed to parse candle CSV {:?}", path)),
        }
    }
}

fn parse_csv(content: &str) -> Result<Vec<Candle>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut candles = Vec::new();
    for record in reader.deserialize() {
        let candle: Candle = record?;
        candles.push(candle);
    }
    Ok(candles)
}

#[async_trait]
impl CandleSource for FileCandleSource {
    async fn fetch_candles(&self, asset: &str, timeframe: &str) -> Result<Vec<Candle>> {
        let candidates = Self::candidates(asset, timeframe);

        for (name, format) in &candidates {
            let path = self.candles_dir.join(name);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                let candles = Self::read_file(&path, *format).await?;
                debug!("Loaded {} candles from {:?}", candles.len(), path);
                return Ok(candles);
            }
        }

        let names: Vec<&str> = candidates.iter().map(|(name, _)| name.as_str()).collect();
        bail!(
            "No candle file found for {}/{} in {:?}. Expected one of: {}",
            asset,
            timeframe,
            self.candles_dir,
            names.join(", ")
        )
    }
}
