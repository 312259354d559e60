use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::icons::open_weather_icon;
use super::{decode_response, http_client, WeatherProvider};
use crate::error::ProviderError;
use crate::model::{
    CurrentWeather, DailyWeather, HourlyWeather, PrecipitationType, ProviderRequest,
    WeatherForecaster, Wind,
};

const NAME: &str = "OpenWeather";
const BASE_URL: &str = "https://api.openweathermap.org";

/// The forecast endpoint returns 5 days in 3-hour steps.
const ENTRIES_PER_DAY: usize = 8;

#[derive(Debug, Default, Deserialize)]
struct MainInfo {
    temp: Option<f64>,
    feels_like: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WeatherInfo {
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WindInfo {
    speed: Option<f64>,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PrecipitationInfo {
    #[serde(rename = "1h")]
    last_hour: Option<f64>,
    #[serde(rename = "3h")]
    last_three_hours: Option<f64>,
}

impl PrecipitationInfo {
    fn amount(&self) -> Option<f64> {
        self.last_three_hours.or(self.last_hour)
    }
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    dt: i64,
    visibility: Option<f64>,
    #[serde(default)]
    main: MainInfo,
    #[serde(default)]
    weather: Vec<WeatherInfo>,
    wind: Option<WindInfo>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: i64,
    #[serde(default)]
    main: MainInfo,
    #[serde(default)]
    weather: Vec<WeatherInfo>,
    #[serde(default)]
    wind: WindInfo,
    pop: Option<f64>,
    rain: Option<PrecipitationInfo>,
    snow: Option<PrecipitationInfo>,
}

impl ForecastEntry {
    fn precipitation(&self) -> (PrecipitationType, Option<f64>) {
        if let Some(rain) = &self.rain {
            (PrecipitationType::Rain, rain.amount())
        } else if let Some(snow) = &self.snow {
            (PrecipitationType::Snow, snow.amount())
        } else {
            (PrecipitationType::None, None)
        }
    }

    fn icon(&self) -> Option<String> {
        self.weather
            .first()
            .and_then(|w| w.icon.as_deref())
            .map(|icon| open_weather_icon(icon).to_string())
    }

    fn wind(&self) -> Wind {
        Wind {
            speed: self.wind.speed,
            degrees: self.wind.deg.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CityInfo {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
    #[serde(default)]
    city: CityInfo,
}

pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
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

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        request: &ProviderRequest,
    ) -> Result<T, ProviderError> {
        let coords = request.location.coords;
        info!("🌤️  Fetching {} from OpenWeather for {}", endpoint, coords);

        let lat = coords.latitude.to_string();
        let lon = coords.longitude.to_string();
        let response = self
            .client
            .get(format!("{}/data/2.5/{}", self.base_url, endpoint))
            .query(&[
                ("appid", self.api_key.as_str()),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("units", request.unit.as_str()),
                ("lang", request.locale.as_str()),
            ])
            .send()
            .await?;

        decode_response(NAME, response).await.map_err(|e| match e {
            ProviderError::Api { ref message, .. }
                if message.contains("wrong latitude") || message.contains("wrong longitude") =>
            {
                ProviderError::InvalidCoords(NAME)
            }
            other => other,
        })
    }

    fn to_hourly(entry: &ForecastEntry) -> HourlyWeather {
        let (precipitation_type, amount) = entry.precipitation();
        HourlyWeather {
            epoch_time: entry.dt,
            current_temperature: entry.main.temp,
            feels_like_temperature: entry.main.feels_like,
            uv_index: None,
            probability_of_precipitation: entry.pop,
            precipitation_type,
            amount_of_precipitation: amount,
            wind: Some(entry.wind()),
            icon_resource: entry.icon(),
            ..Default::default()
        }
    }

    /// Folds one day's worth of 3-hour entries into a daily summary.
    fn to_daily(day: &[ForecastEntry], city: Option<&CityInfo>) -> Option<DailyWeather> {
        let first = day.first()?;
        let midday = day.get(day.len() / 2).unwrap_or(first);

        let min_temperature = day
            .iter()
            .filter_map(|e| e.main.temp_min.or(e.main.temp))
            .reduce(f64::min);
        let max_temperature = day
            .iter()
            .filter_map(|e| e.main.temp_max.or(e.main.temp))
            .reduce(f64::max);
        let humidities: Vec<f64> = day.iter().filter_map(|e| e.main.humidity).collect();
        let humidity = (!humidities.is_empty())
            .then(|| humidities.iter().sum::<f64>() / humidities.len() as f64 / 100.0);
        let probability_of_precipitation = day.iter().filter_map(|e| e.pop).reduce(f64::max);
        let precipitation_type = day
            .iter()
            .map(|e| e.precipitation().0)
            .find(|t| *t != PrecipitationType::None)
            .unwrap_or_default();

        Some(DailyWeather {
            epoch_time: first.dt,
            min_temperature,
            max_temperature,
            humidity,
            uv_index: None,
            sunrise_time: city.and_then(|c| c.sunrise),
            sunset_time: city.and_then(|c| c.sunset),
            wind: Some(midday.wind()),
            probability_of_precipitation,
            precipitation_type,
            icon_resource: midday.icon(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    fn forecaster(&self) -> WeatherForecaster {
        WeatherForecaster::OpenWeather
    }

    fn description(&self) -> &str {
        "OpenWeather provider - current conditions and 5 day / 3 hour forecast"
    }

    async fn current(&self, request: &ProviderRequest) -> Result<CurrentWeather, ProviderError> {
        let resp: CurrentResponse = self.fetch("weather", request).await?;
        let condition = resp.weather.first();

        Ok(CurrentWeather {
            epoch_time: resp.dt,
            visibility: resp.visibility,
            current_temperature: resp.main.temp,
            min_temperature: resp.main.temp_min,
            max_temperature: resp.main.temp_max,
            feels_like_temperature: resp.main.feels_like,
            humidity: resp.main.humidity.map(|h| h / 100.0),
            wind: resp.wind.map(|w| Wind {
                speed: w.speed,
                degrees: w.deg.unwrap_or_default(),
            }),
            icon_resource: condition
                .and_then(|c| c.icon.as_deref())
                .map(|icon| open_weather_icon(icon).to_string()),
            summary: condition.and_then(|c| c.description.clone()),
            ..Default::default()
        })
    }

    async fn hourly(&self, request: &ProviderRequest) -> Result<Vec<HourlyWeather>, ProviderError> {
        let resp: ForecastResponse = self.fetch("forecast", request).await?;
        Ok(resp
            .list
            .iter()
            .take(ENTRIES_PER_DAY)
            .map(Self::to_hourly)
            .collect())
    }

    async fn daily(&self, request: &ProviderRequest) -> Result<Vec<DailyWeather>, ProviderError> {
        let resp: ForecastResponse = self.fetch("forecast", request).await?;
        Ok(resp
            .list
            .chunks(ENTRIES_PER_DAY)
            .enumerate()
            .filter_map(|(i, day)| Self::to_daily(day, (i == 0).then_some(&resp.city)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AddressHash, Coords, LocationInfo, Unit};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ProviderRequest {
        ProviderRequest {
            location: LocationInfo {
                coords: Coords::new(50.4536, 30.5164),
                address_hash: AddressHash::from("hash".to_string()),
                provider_location_key: "324505".to_string(),
            },
            locale: "uk".to_string(),
            unit: Unit::Metric,
        }
    }

    fn forecast_entry(dt: i64, temp: f64) -> serde_json::Value {
        serde_json::json!({
            "dt": dt,
            "main": {"temp": temp, "feels_like": temp - 1.0, "temp_min": temp - 2.0, "temp_max": temp + 2.0, "humidity": 50},
            "weather": [{"description": "light rain", "icon": "10d"}],
            "wind": {"speed": 3.5, "deg": 180},
            "pop": 0.4,
            "rain": {"3h": 0.7}
        })
    }

    #[tokio::test]
    async fn test_current_weather() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("appid", "key"))
            .and(query_param("units", "metric"))
            .and(query_param("lang", "uk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "dt": 1700000000,
                "visibility": 10000,
                "main": {"temp": 4.2, "feels_like": 1.1, "temp_min": 3.0, "temp_max": 5.0, "humidity": 81},
                "weather": [{"description": "overcast clouds", "icon": "04d"}],
                "wind": {"speed": 4.1, "deg": 230}
            })))
            .mount(&mock_server)
            .await;

        let client = OpenWeatherClient::with_base_url("key".to_string(), &mock_server.uri()).unwrap();
        let current = client.current(&request()).await.unwrap();

        assert_eq!(current.epoch_time, 1700000000);
        assert_eq!(current.current_temperature, Some(4.2));
        assert_eq!(current.humidity, Some(0.81));
        assert_eq!(current.icon_resource.as_deref(), Some("cloudy"));
        assert_eq!(current.summary.as_deref(), Some("overcast clouds"));
    }

    #[tokio::test]
    async fn test_transport_errors_do_not_leak_the_api_key() {
        let client =
            OpenWeatherClient::with_base_url("SECRET_OW_KEY".to_string(), "http://127.0.0.1:1").unwrap();

        let err = client.current(&request()).await.unwrap_err();

        assert!(matches!(err, ProviderError::Http(_)));
        assert!(!err.to_string().contains("SECRET_OW_KEY"), "{}", err);
    }

    #[tokio::test]
    async fn test_decode_errors_do_not_leak_the_api_key() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&mock_server)
            .await;

        let client =
            OpenWeatherClient::with_base_url("SECRET_OW_KEY".to_string(), &mock_server.uri()).unwrap();
        let err = client.current(&request()).await.unwrap_err();

        assert!(!err.to_string().contains("SECRET_OW_KEY"), "{}", err);
    }

    #[tokio::test]
    async fn test_hourly_and_daily_from_forecast() {
        let mock_server = MockServer::start().await;
        let list: Vec<_> = (0..16)
            .map(|i| forecast_entry(1700000000 + i * 10800, 10.0 + i as f64))
            .collect();

        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "list": list,
                "city": {"sunrise": 1699990000, "sunset": 1700020000}
            })))
            .mount(&mock_server)
            .await;

        let client = OpenWeatherClient::with_base_url("key".to_string(), &mock_server.uri()).unwrap();

        let hourly = client.hourly(&request()).await.unwrap();
        assert_eq!(hourly.len(), ENTRIES_PER_DAY);
        assert_eq!(hourly[0].precipitation_type, PrecipitationType::Rain);
        assert_eq!(hourly[0].amount_of_precipitation, Some(0.7));

        let daily = client.daily(&request()).await.unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].min_temperature, Some(8.0));
        assert_eq!(daily[0].max_temperature, Some(19.0));
        assert_eq!(daily[0].sunrise_time, Some(1699990000));
        assert_eq!(daily[1].sunrise_time, None);
    }

    #[tokio::test]
    async fn test_wrong_latitude_maps_to_invalid_coords() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "cod": "400", "message": "wrong latitude"
            })))
            .mount(&mock_server)
            .await;

        let client = OpenWeatherClient::with_base_url("key".to_string(), &mock_server.uri()).unwrap();
        let err = client.current(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidCoords(_)));
    }

    #[tokio::test]
    async fn test_unauthorized_is_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "cod": 401, "message": "Invalid API key"
            })))
            .mount(&mock_server)
            .await;

        let client = OpenWeatherClient::with_base_url("bad".to_string(), &mock_server.uri()).unwrap();
        let err = client.hourly(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited("OpenWeather")));
    }
}
