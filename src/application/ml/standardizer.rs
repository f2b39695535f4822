use super::features::FeatureRow;
use super::stats::{mean, population_std_dev};
use crate::domain::ml::{FEATURE_COUNT, FeatureVector, StandardizationParams};

/// Z-score transform. Parameters are fitted once on the training rows and
/// then applied unchanged to validation rows and inference vectors.
pub struct Standardizer;

impl Standardizer {
    /// Per-feature population mean and standard deviation. A deviation of
    /// exactly 0 becomes 1, so a constant feature standardizes to 0.
    pub fn fit(rows: &[FeatureRow]) -> StandardizationParams {
        let mut means = [0.0; FEATURE_COUNT];
        let mut std_devs = [1.0; FEATURE_COUNT];

        for j in 0..FEATURE_COUNT {
            let column: Vec<f64> = rows.iter().map(|row| row.features[j]).collect();
            means[j] = mean(&column);
            let std_dev = population_std_dev(&column);
            std_devs[j] = if std_dev == 0.0 { 1.0 } else { std_dev };
        }

        StandardizationParams { means, std_devs }
    }

    /// Returns standardized copies of `rows`; timestamps and targets are kept.
    pub fn apply(rows: &[FeatureRow], params: &StandardizationParams) -> Vec<FeatureRow> {
        rows.iter()
            .map(|row| FeatureRow {
                features: Self::apply_vector(&row.features, params),
                ..row.clone()
            })
            .collect()
    }

    pub fn apply_vector(features: &FeatureVector, params: &StandardizationParams) -> FeatureVector {
        let mut out = [0.0; FEATURE_COUNT];
        for (j, value) in features.iter().enumerate() {
            out[j] = (value - params.means[j]) / params.std_devs[j];
        }
        out
    }
}
