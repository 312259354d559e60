//! Error types for the gateway.

use thiserror::Error;

use crate::model::WeatherForecaster;

/// Rejected request parameters. Raised before any I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("coords are required")]
    EmptyCoords,

    #[error("coords are out of range")]
    InvalidCoords,

    #[error("locale is required")]
    EmptyLocale,

    #[error("city is required")]
    EmptyCity,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Cache miss. Not a failure for read paths.
    #[error("entry not found in store")]
    NotFound,

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("store codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request URL is stripped, since query strings carry API keys.
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("{provider} API error (status={status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{0} rejected the request: rate limited or unauthorized")]
    RateLimited(&'static str),

    #[error("{0} rejected the coordinates")]
    InvalidCoords(&'static str),

    #[error("{0} returned an empty response")]
    EmptyResponse(&'static str),

    #[error("{0} API key not configured")]
    MissingApiKey(&'static str),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

/// Everything a caller of the gateway can see.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("forecaster {0} is not configured")]
    UnknownForecaster(WeatherForecaster),
}

pub type Result<T, E = GatewayError> = std::result::Result<T, E>;
