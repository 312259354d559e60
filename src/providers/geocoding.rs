use async_trait::async_trait;

use super::{AccuWeatherClient, ApiNinjasClient, GeocodingProvider};
use crate::error::ProviderError;
use crate::model::{Address, Coords, Geocoding, GeocodingRequest};

/// API Ninjas for addresses, AccuWeather for its own location keys.
pub struct HttpGeocoder {
    ninjas: Option<ApiNinjasClient>,
    accu_weather: Option<AccuWeatherClient>,
}

impl HttpGeocoder {
    pub fn new(ninjas: Option<ApiNinjasClient>, accu_weather: Option<AccuWeatherClient>) -> Self {
        Self {
            ninjas,
            accu_weather,
        }
    }

    fn ninjas(&self) -> Result<&ApiNinjasClient, ProviderError> {
        self.ninjas
            .as_ref()
            .ok_or(ProviderError::MissingApiKey("ApiNinjas"))
    }
}

#[async_trait]
impl GeocodingProvider for HttpGeocoder {
    async fn reverse_geocode(&self, coords: &Coords) -> Result<Address, ProviderError> {
        self.ninjas()?.reverse_geocode(coords).await
    }

    async fn geo_position_search(&self, coords: &Coords) -> Result<Option<String>, ProviderError> {
        match &self.accu_weather {
            Some(client) => client.geo_position_search(coords).await.map(Some),
            None => Ok(None),
        }
    }

    async fn find_geocoding(
        &self,
        request: &GeocodingRequest,
    ) -> Result<Vec<Geocoding>, ProviderError> {
        self.ninjas()?.geocoding(request).await
    }
}
