//! Artifact keys.
//!
//! Keys are `<millis>_<asset>_<suffix>` with the millisecond creation time
//! zero-padded to 13 digits, so the lexicographic order of the string form is
//! the chronological order for a given asset. Stores rely on this: "latest"
//! is simply the greatest key. Asset and timeframe identifiers may therefore
//! never contain the `_` separator.

use crate::domain::errors::ForecastError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rejects identifiers that would make a key ambiguous or unsafe as a file name.
pub fn validate_identifier(value: &str) -> Result<(), ForecastError> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value.contains('_') {
        Some("must not contain '_'")
    } else if value.contains(['/', '\\']) || value.starts_with('.') {
        Some("must not contain path components")
    } else if value.chars().any(char::is_whitespace) {
        Some("must not contain whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ForecastError::InvalidIdentifier {
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn parse_millis(key: &str, part: Option<&str>) -> Result<i64, ForecastError> {
    part.filter(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|p| p.parse::<i64>().ok())
        .ok_or_else(|| ForecastError::InvalidArtifactKey {
            key: key.to_string(),
        })
}

/// A parsed key must render back to exactly `key`. Stores rebuild file names
/// from `Display`, so an unpadded `5_BTC-USD_1h` would name a different file.
fn require_canonical<T: fmt::Display>(key: &str, id: T) -> Result<T, ForecastError> {
    if id.to_string() != key {
        return Err(ForecastError::InvalidArtifactKey {
            key: key.to_string(),
        });
    }
    Ok(id)
}

/// Identifies one training run: `<millis>_<asset>_<timeframe>`.
///
/// Field order matters: the derived `Ord` sorts by creation time first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId {
    created_at_ms: i64,
    asset: String,
    timeframe: String,
}

impl RunId {
    /// A run id stamped with the current time.
    pub fn new(asset: &str, timeframe: &str) -> Result<Self, ForecastError> {
        Self::at(Utc::now().timestamp_millis(), asset, timeframe)
    }

    pub fn at(created_at_ms: i64, asset: &str, timeframe: &str) -> Result<Self, ForecastError> {
        validate_identifier(asset)?;
        validate_identifier(timeframe)?;
        if created_at_ms < 0 {
            return Err(ForecastError::InvalidArtifactKey {
                key: format!("{}_{}_{}", created_at_ms, asset, timeframe),
            });
        }
        Ok(Self {
            created_at_ms,
            asset: asset.to_string(),
            timeframe: timeframe.to_string(),
        })
    }

    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:013}_{}_{}",
            self.created_at_ms, self.asset, self.timeframe
        )
    }
}

impl FromStr for RunId {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '_');
        let millis = parse_millis(s, parts.next())?;
        let (asset, timeframe) = match (parts.next(), parts.next()) {
            (Some(asset), Some(timeframe)) => (asset, timeframe),
            _ => {
                return Err(ForecastError::InvalidArtifactKey { key: s.to_string() });
            }
        };
        let id = Self::at(millis, asset, timeframe)?;
        require_canonical(s, id)
    }
}

impl TryFrom<String> for RunId {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.to_string()
    }
}

/// Identifies one prediction: `<millis>_<asset>_h<horizon>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PredictionId {
    created_at_ms: i64,
    asset: String,
    horizon: u32,
}

impl PredictionId {
    pub fn new(asset: &str, horizon: u32) -> Result<Self, ForecastError> {
        Self::at(Utc::now().timestamp_millis(), asset, horizon)
    }

    pub fn at(created_at_ms: i64, asset: &str, horizon: u32) -> Result<Self, ForecastError> {
        validate_identifier(asset)?;
        if created_at_ms < 0 {
            return Err(ForecastError::InvalidArtifactKey {
                key: format!("{}_{}_h{}", created_at_ms, asset, horizon),
            });
        }
        Ok(Self {
            created_at_ms,
            asset: asset.to_string(),
            horizon,
        })
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn horizon(&self) -> u32 {
        self.horizon
    }
}

impl fmt::Display for PredictionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:013}_{}_h{}", self.created_at_ms, self.asset, self.horizon)
    }
}

impl FromStr for PredictionId {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ForecastError::InvalidArtifactKey { key: s.to_string() };
        let mut parts = s.splitn(3, '_');
        let millis = parse_millis(s, parts.next())?;
        let asset = parts.next().ok_or_else(invalid)?;
        let horizon = parts
            .next()
            .and_then(|h| h.strip_prefix('h'))
            .and_then(|h| h.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        let id = Self::at(millis, asset, horizon)?;
        require_canonical(s, id)
    }
}

impl TryFrom<String> for PredictionId {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PredictionId> for String {
    fn from(id: PredictionId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_format() {
        let id = RunId::at(1_700_000_000_123, "BTC-USD", "1h").unwrap();
        assert_eq!(id.to_string(), "1700000000123_BTC-USD_1h");
    }

    #[test]
    fn test_run_id_parse_roundtrip() {
        let id: RunId = "1700000000123_ETH-USD_4h".parse().unwrap();
        assert_eq!(id.created_at_ms(), 1_700_000_000_123);
        assert_eq!(id.asset(), "ETH-USD");
        assert_eq!(id.timeframe(), "4h");
    }

    #[test]
    fn test_ordering_matches_lexicographic_order() {
        let mut ids = vec![
            RunId::at(20, "BTC-USD", "1h").unwrap(),
            RunId::at(3, "BTC-USD", "1h").unwrap(),
            RunId::at(1_700_000_000_000, "BTC-USD", "1d").unwrap(),
            RunId::at(100, "BTC-USD", "1d").unwrap(),
        ];
        let mut keys: Vec<String> = ids.iter().map(|id| id.to_string()).collect();

        ids.sort();
        keys.sort();

        let sorted_keys: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        assert_eq!(sorted_keys, keys);
        assert_eq!(ids.last().unwrap().created_at_ms(), 1_700_000_000_000);
    }

    #[test]
    fn test_identifier_with_separator_rejected() {
        let result = RunId::at(1, "BTC_USD", "1h");
        assert!(matches!(
            result,
            Err(ForecastError::InvalidIdentifier { .. })
        ));
        assert!(validate_identifier("../etc").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_malformed_keys_rejected() {
        assert!("notanumber_BTC-USD_1h".parse::<RunId>().is_err());
        assert!("1700000000000_BTC-USD".parse::<RunId>().is_err());
        assert!("1700000000000_BTC-USD_1h_extra".parse::<RunId>().is_err());
    }

    #[test]
    fn test_prediction_id_roundtrip() {
        let id = PredictionId::at(42, "BTC-USD", 5).unwrap();
        assert_eq!(id.to_string(), "0000000000042_BTC-USD_h5");

        let parsed: PredictionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.horizon(), 5);
    }

    #[test]
    fn test_non_canonical_keys_rejected() {
        assert!("5_BTC-USD_1h".parse::<RunId>().is_err());
        assert!("00000000000005_BTC-USD_1h".parse::<RunId>().is_err());
        assert!("0000000000005_BTC-USD_1h".parse::<RunId>().is_ok());

        assert!("42_BTC-USD_h5".parse::<PredictionId>().is_err());
        assert!("0000000000042_BTC-USD_h05".parse::<PredictionId>().is_err());
        assert!("0000000000042_BTC-USD_h5".parse::<PredictionId>().is_ok());
    }

    #[test]
    fn test_negative_millis_rejected() {
        assert!(matches!(
            RunId::at(-1, "BTC-USD", "1h"),
            Err(ForecastError::InvalidArtifactKey { .. })
        ));
        assert!(matches!(
            PredictionId::at(-1, "BTC-USD", 5),
            Err(ForecastError::InvalidArtifactKey { .. })
        ));
    }

    #[test]
    fn test_run_id_serializes_as_string() {
        let id = RunId::at(7, "XRP", "1d").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0000000000007_XRP_1d\"");

        let back: RunId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
