use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A point on the globe. Latitude in `[-90, 90]`, longitude in `[-180, 180)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coords {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..180.0).contains(&self.longitude)
    }

    /// Fixed-precision form used as a hash field in the store.
    pub fn cache_field(&self) -> String {
        format!("{:.6},{:.6}", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_field())
    }
}

/// Hex MD5 digest of `country + state + locality`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressHash(String);

impl AddressHash {
    pub fn from_address(address: &Address) -> Self {
        use md5::{Digest, Md5};

        let mut hasher = Md5::new();
        hasher.update(address.country.as_bytes());
        hasher.update(address.state.as_bytes());
        hasher.update(address.locality.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AddressHash {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AddressHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Semantic address returned by reverse geocoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub country: String,
    pub state: String,
    pub locality: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub coords: Coords,
    pub provider_location_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub coords: Coords,
    pub address_hash: AddressHash,
    pub provider_location_key: String,
}

/// Forward geocoding hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geocoding {
    pub name: String,
    pub coords: Coords,
    pub country: String,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodingRequest {
    #[serde(default)]
    pub city: String,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherForecaster {
    AccuWeather,
    OpenWeather,
}

impl WeatherForecaster {
    pub const ALL: [WeatherForecaster; 2] = [Self::AccuWeather, Self::OpenWeather];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccuWeather => "AccuWeather",
            Self::OpenWeather => "OpenWeather",
        }
    }
}

impl fmt::Display for WeatherForecaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeatherForecaster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherKind {
    Current,
    Hourly,
    Daily,
}

impl WeatherKind {
    pub const ALL: [WeatherKind; 3] = [Self::Current, Self::Hourly, Self::Daily];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        }
    }
}

impl fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Metric,
    Imperial,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrecipitationType {
    #[default]
    None,
    Rain,
    Snow,
    Ice,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: Option<f64>,
    pub degrees: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    pub epoch_time: i64,
    pub visibility: Option<f64>,
    pub current_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub feels_like_temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind: Option<Wind>,
    pub icon_resource: Option<String>,
    pub summary: Option<String>,
    pub mobile_link: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyWeather {
    pub epoch_time: i64,
    pub current_temperature: Option<f64>,
    pub feels_like_temperature: Option<f64>,
    pub uv_index: Option<u8>,
    pub probability_of_precipitation: Option<f64>,
    pub precipitation_type: PrecipitationType,
    pub amount_of_precipitation: Option<f64>,
    pub wind: Option<Wind>,
    pub icon_resource: Option<String>,
    pub mobile_link: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyWeather {
    pub epoch_time: i64,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub uv_index: Option<f64>,
    pub sunrise_time: Option<i64>,
    pub sunset_time: Option<i64>,
    pub wind: Option<Wind>,
    pub probability_of_precipitation: Option<f64>,
    pub precipitation_type: PrecipitationType,
    pub icon_resource: Option<String>,
    pub mobile_link: String,
    pub link: String,
}

/// Inbound request, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRequest {
    pub coords: Option<Coords>,
    pub locale: String,
    pub unit: Unit,
}

/// What a weather provider receives once the location has been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub location: LocationInfo,
    pub locale: String,
    pub unit: Unit,
}
