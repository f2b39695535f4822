// Market data types
pub mod market;

// Model artifacts, keys and feature schema
pub mod ml;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
