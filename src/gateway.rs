//! Dispatch across configured forecasters.

use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::error::GatewayError;
use crate::location::LocationResolver;
use crate::model::{
    CurrentWeather, DailyWeather, Geocoding, GeocodingRequest, HourlyWeather, WeatherForecaster,
    WeatherRequest,
};
use crate::workflow::WeatherService;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecasterInfo {
    pub name: WeatherForecaster,
    pub description: String,
    pub default: bool,
}

/// One [`WeatherService`] per configured forecaster. Requests that name no
/// forecaster go to the default one, which is the first registered.
#[derive(Clone)]
pub struct WeatherGateway {
    services: HashMap<WeatherForecaster, WeatherService>,
    default_forecaster: Option<WeatherForecaster>,
    resolver: LocationResolver,
}

impl WeatherGateway {
    pub fn new(resolver: LocationResolver) -> Self {
        Self {
            services: HashMap::new(),
            default_forecaster: None,
            resolver,
        }
    }

    pub fn register(&mut self, service: WeatherService) {
        let forecaster = service.forecaster();
        info!(%forecaster, "🔌 forecaster registered");
        self.default_forecaster.get_or_insert(forecaster);
        self.services.insert(forecaster, service);
    }

    fn service(&self, forecaster: Option<WeatherForecaster>) -> Result<&WeatherService, GatewayError> {
        let forecaster = forecaster
            .or(self.default_forecaster)
            .unwrap_or(WeatherForecaster::OpenWeather);
        self.services
            .get(&forecaster)
            .ok_or(GatewayError::UnknownForecaster(forecaster))
    }

    pub async fn current(
        &self,
        forecaster: Option<WeatherForecaster>,
        request: &WeatherRequest,
    ) -> Result<CurrentWeather, GatewayError> {
        self.service(forecaster)?.current(request).await
    }

    pub async fn hourly(
        &self,
        forecaster: Option<WeatherForecaster>,
        request: &WeatherRequest,
    ) -> Result<Vec<HourlyWeather>, GatewayError> {
        self.service(forecaster)?.hourly(request).await
    }

    pub async fn daily(
        &self,
        forecaster: Option<WeatherForecaster>,
        request: &WeatherRequest,
    ) -> Result<Vec<DailyWeather>, GatewayError> {
        self.service(forecaster)?.daily(request).await
    }

    pub async fn find_geocoding(
        &self,
        request: &GeocodingRequest,
    ) -> Result<Vec<Geocoding>, GatewayError> {
        self.resolver.find_geocoding(request).await
    }

    /// Configured forecasters in declaration order.
    pub fn forecasters(&self) -> Vec<ForecasterInfo> {
        WeatherForecaster::ALL
            .iter()
            .filter_map(|forecaster| {
                self.services.get(forecaster).map(|service| ForecasterInfo {
                    name: *forecaster,
                    description: service.description().to_string(),
                    default: self.default_forecaster == Some(*forecaster),
                })
            })
            .collect()
    }
}
