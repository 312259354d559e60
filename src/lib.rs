//! Cache-aside weather gateway.
//!
//! Coordinates are resolved to a stable address hash and a provider location
//! key, weather is read through a key/value cache partitioned by forecaster
//! and kind, and background cleaners age out entries nobody refreshed.

pub mod api;
pub mod app;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod gateway;
pub mod location;
pub mod model;
pub mod providers;
pub mod scheduler;
pub mod storage;
pub mod store;
pub mod tasks;
pub mod validation;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use error::{GatewayError, ProviderError, StoreError, ValidationError};
pub use gateway::WeatherGateway;
