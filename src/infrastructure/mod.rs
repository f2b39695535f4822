pub mod candles;
pub mod persistence;
pub mod repositories;

pub use candles::FileCandleSource;
pub use persistence::FileModelStore;
pub use repositories::{InMemoryCandleSource, InMemoryModelStore};
