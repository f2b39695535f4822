pub mod features;
pub mod linear_regression;
pub mod predictor;
pub mod standardizer;
pub mod stats;
pub mod trainer;

pub use features::{FeatureBuilder, FeatureRow};
pub use predictor::Predictor;
pub use standardizer::Standardizer;
pub use trainer::Trainer;
