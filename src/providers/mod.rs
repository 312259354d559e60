//! Upstream weather and geocoding collaborators.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::ProviderError;
use crate::model::{
    Address, Coords, CurrentWeather, DailyWeather, Geocoding, GeocodingRequest, HourlyWeather,
    ProviderRequest, WeatherForecaster,
};

mod accu_weather;
mod api_ninjas;
mod geocoding;
mod icons;
mod open_weather;

pub use accu_weather::AccuWeatherClient;
pub use api_ninjas::ApiNinjasClient;
pub use geocoding::HttpGeocoder;
pub use open_weather::OpenWeatherClient;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn forecaster(&self) -> WeatherForecaster;

    fn description(&self) -> &str;

    async fn current(&self, request: &ProviderRequest) -> Result<CurrentWeather, ProviderError>;

    async fn hourly(&self, request: &ProviderRequest) -> Result<Vec<HourlyWeather>, ProviderError>;

    async fn daily(&self, request: &ProviderRequest) -> Result<Vec<DailyWeather>, ProviderError>;
}

#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// Country, state and locality for a point.
    async fn reverse_geocode(&self, coords: &Coords) -> Result<Address, ProviderError>;

    /// The upstream weather provider's own identifier for a point, or
    /// `None` when no provider that needs one is configured.
    async fn geo_position_search(&self, coords: &Coords) -> Result<Option<String>, ProviderError>;

    async fn find_geocoding(
        &self,
        request: &GeocodingRequest,
    ) -> Result<Vec<Geocoding>, ProviderError>;
}

pub(crate) fn http_client() -> Result<Client, ProviderError> {
    Ok(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Decodes a successful body or turns the status into a `ProviderError`.
pub(crate) async fn decode_response<T: DeserializeOwned>(
    provider: &'static str,
    response: Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    if matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    ) {
        return Err(ProviderError::RateLimited(provider));
    }

    let message = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        provider,
        status: status.as_u16(),
        message,
    })
}
