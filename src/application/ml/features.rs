//! Feature engineering over candle closes.
//!
//! Every row is computed from fixed trailing windows ending at the anchor
//! index `i`, in `FEATURE_NAMES` order:
//!
//! | feature     | definition                                              |
//! |-------------|---------------------------------------------------------|
//! | lagClose1-3 | `close[i-1]`, `close[i-2]`, `close[i-3]`                |
//! | ret1        | return from `close[i-1]` to `close[i]`                  |
//! | ret3        | return from `close[i-3]` to `close[i]`                  |
//! | ma5, ma10   | mean close over the 5 / 10 candles ending at `i`        |
//! | vol5        | population std of the 5 returns over `close[i-4..=i]`   |
//!
//! The first of the five `vol5` returns has no prior close inside the window
//! and is taken as 0.

use super::stats::{mean, population_std_dev, simple_return};
use crate::domain::errors::ForecastError;
use crate::domain::market::Candle;
use crate::domain::ml::FeatureVector;

/// Raw candles required before a training run is attempted.
pub const MIN_TRAINING_CANDLES: usize = 30;
/// Rows required after windowing.
pub const MIN_FEATURE_ROWS: usize = 20;
/// Candles required to derive a single inference vector.
pub const MIN_INFERENCE_CANDLES: usize = 11;

/// First anchor index with a full 10-candle lookback.
const FIRST_ANCHOR: usize = 10;
const SHORT_WINDOW: usize = 5;
const LONG_WINDOW: usize = 10;

/// One labeled training example. `target` is the realized next-step return.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub timestamp: i64,
    pub features: FeatureVector,
    pub target: f64,
}

pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Builds labeled rows for anchors `10..=len-2`.
    pub fn build_rows(candles: &[Candle]) -> Result<Vec<FeatureRow>, ForecastError> {
        if candles.len() < MIN_TRAINING_CANDLES {
            return Err(ForecastError::DatasetTooSmall {
                kind: "candles",
                count: candles.len(),
                required: MIN_TRAINING_CANDLES,
            });
        }

        let closes = validated_closes(candles, 0)?;
        let rows: Vec<FeatureRow> = (FIRST_ANCHOR..closes.len() - 1)
            .map(|i| FeatureRow {
                timestamp: candles[i].timestamp,
                features: features_at(&closes, i),
                target: simple_return(closes[i], closes[i + 1]),
            })
            .collect();

        if rows.len() < MIN_FEATURE_ROWS {
            return Err(ForecastError::DatasetTooSmall {
                kind: "feature rows",
                count: rows.len(),
                required: MIN_FEATURE_ROWS,
            });
        }

        Ok(rows)
    }

    /// Feature vector anchored at the last candle, for inference.
    pub fn latest_features(candles: &[Candle]) -> Result<FeatureVector, ForecastError> {
        if candles.len() < MIN_INFERENCE_CANDLES {
            return Err(ForecastError::InsufficientHistory {
                count: candles.len(),
                required: MIN_INFERENCE_CANDLES,
            });
        }

        // Only the trailing window feeds the vector
        let start = candles.len() - LONG_WINDOW;
        let closes = validated_closes(&candles[start..], start)?;
        Ok(features_at(&closes, closes.len() - 1))
    }
}

/// `offset` is the index of `candles[0]` in the full series, for error reporting.
fn validated_closes(candles: &[Candle], offset: usize) -> Result<Vec<f64>, ForecastError> {
    candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            if candle.close.is_finite() && candle.close > 0.0 {
                Ok(candle.close)
            } else {
                Err(ForecastError::InvalidCandle {
                    index: offset + i,
                    close: candle.close,
                })
            }
        })
        .collect()
}

/// Requires `i >= LONG_WINDOW - 1`.
fn features_at(closes: &[f64], i: usize) -> FeatureVector {
    let close = closes[i];
    let lag_close1 = closes[i - 1];
    let lag_close2 = closes[i - 2];
    let lag_close3 = closes[i - 3];

    let short = &closes[i + 1 - SHORT_WINDOW..=i];
    let long = &closes[i + 1 - LONG_WINDOW..=i];

    let short_returns: Vec<f64> = std::iter::once(0.0)
        .chain(short.windows(2).map(|pair| simple_return(pair[0], pair[1])))
        .collect();

    [
        lag_close1,
        lag_close2,
        lag_close3,
        simple_return(lag_close1, close),
        simple_return(lag_close3, close),
        mean(short),
        mean(long),
        population_std_dev(&short_returns),
    ]
}
