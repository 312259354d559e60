use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{decode_response, http_client};
use crate::error::ProviderError;
use crate::model::{Address, Coords, Geocoding, GeocodingRequest};

const NAME: &str = "ApiNinjas";
const BASE_URL: &str = "https://api.api-ninjas.com";
const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Deserialize)]
struct ReverseGeocodingResponse {
    name: String,
    country: String,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    name: String,
    latitude: f64,
    longitude: f64,
    country: String,
    #[serde(default)]
    state: Option<String>,
}

/// Forward and reverse geocoding.
pub struct ApiNinjasClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ApiNinjasClient {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// First match wins; an empty answer is an error.
    pub async fn reverse_geocode(&self, coords: &Coords) -> Result<Address, ProviderError> {
        info!("📍 Reverse geocoding {}", coords);

        let lat = coords.latitude.to_string();
        let lon = coords.longitude.to_string();
        let response = self
            .client
            .get(format!("{}/v1/reversegeocoding", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("lat", lat.as_str()), ("lon", lon.as_str())])
            .send()
            .await?;

        let places: Vec<ReverseGeocodingResponse> = decode_response(NAME, response).await?;
        let place = places
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse(NAME))?;

        Ok(Address {
            country: place.country,
            state: place.state.unwrap_or_default(),
            locality: place.name,
        })
    }

    pub async fn geocoding(&self, request: &GeocodingRequest) -> Result<Vec<Geocoding>, ProviderError> {
        info!("📍 Geocoding city {}", request.city);

        let mut query = vec![("city", request.city.as_str())];
        if let Some(state) = &request.state {
            query.push(("state", state.as_str()));
        }
        if let Some(country) = &request.country {
            query.push(("country", country.as_str()));
        }

        let response = self
            .client
            .get(format!("{}/v1/geocoding", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .query(&query)
            .send()
            .await?;

        let places: Vec<GeocodingResponse> = decode_response(NAME, response).await?;
        Ok(places
            .into_iter()
            .map(|place| Geocoding {
                name: place.name,
                coords: Coords::new(place.latitude, place.longitude),
                country: place.country,
                state: place.state,
            })
            .collect())
    }
}
