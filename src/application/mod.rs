// Feature engineering, training and inference
pub mod ml;
