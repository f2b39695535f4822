pub mod artifacts;
pub mod feature_registry;
pub mod keys;

pub use artifacts::{
    ModelMetrics, PredictionArtifact, PredictionResult, StandardizationParams, TrainResult,
    TrainedModel,
};
pub use feature_registry::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};
pub use keys::{PredictionId, RunId};
