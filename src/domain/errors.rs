use thiserror::Error;

/// Errors surfaced by the training and prediction pipeline.
///
/// None of these are retried internally; the caller decides what to do.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Dataset too small: {count} {kind} available, at least {required} required")]
    DatasetTooSmall {
        kind: &'static str,
        count: usize,
        required: usize,
    },

    #[error("No trained model runs found for asset {asset}. Train a model first")]
    NoModelFound { asset: String },

    #[error("Insufficient history: {count} candles available, at least {required} required")]
    InsufficientHistory { count: usize, required: usize },

    #[error("Invalid horizon {horizon}: must be >= 1")]
    InvalidHorizon { horizon: u32 },

    #[error("Invalid candle at index {index}: close {close} must be finite and positive")]
    InvalidCandle { index: usize, close: f64 },

    #[error("Invalid identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: &'static str },

    #[error("No prediction stored under {key}")]
    PredictionNotFound { key: String },

    #[error("Malformed artifact key: {key}")]
    InvalidArtifactKey { key: String },

    #[error("Model artifact does not match the feature schema: {reason}")]
    SchemaMismatch { reason: String },

    #[error("Artifact already exists: {key}")]
    ArtifactExists { key: String },

    #[error("Candle source failed for {asset}/{timeframe}: {source}")]
    CandleSource {
        asset: String,
        timeframe: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_too_small_formatting() {
        let error = ForecastError::DatasetTooSmall {
            kind: "candles",
            count: 12,
            required: 30,
        };

        let msg = error.to_string();
        assert!(msg.contains("12 candles"));
        assert!(msg.contains("30"));
    }

    #[test]
    fn test_candle_source_keeps_cause() {
        let error = ForecastError::CandleSource {
            asset: "BTC-USD".to_string(),
            timeframe: "1h".to_string(),
            source: anyhow::anyhow!("exchange unavailable"),
        };

        assert!(error.to_string().contains("BTC-USD/1h"));
        let cause = std::error::Error::source(&error).map(|e| e.to_string());
        assert_eq!(cause.as_deref(), Some("exchange unavailable"));
    }
}
