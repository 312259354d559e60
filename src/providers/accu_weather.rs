use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::icons::accu_weather_icon;
use super::{decode_response, http_client, WeatherProvider};
use crate::error::ProviderError;
use crate::model::{
    Coords, CurrentWeather, DailyWeather, HourlyWeather, PrecipitationType, ProviderRequest, Unit,
    WeatherForecaster, Wind,
};

const NAME: &str = "AccuWeather";
const BASE_URL: &str = "http://dataservice.accuweather.com";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Measure {
    value: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UnitMeasure {
    #[serde(default)]
    metric: Measure,
    #[serde(default)]
    imperial: Measure,
}

impl UnitMeasure {
    fn value(&self, unit: Unit) -> Option<f64> {
        match unit {
            Unit::Metric => self.metric.value,
            Unit::Imperial => self.imperial.value,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Direction {
    degrees: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CurrentWind {
    #[serde(default)]
    direction: Direction,
    #[serde(default)]
    speed: UnitMeasure,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ForecastWind {
    #[serde(default)]
    direction: Direction,
    #[serde(default)]
    speed: Measure,
}

impl ForecastWind {
    fn to_wind(&self) -> Wind {
        Wind {
            speed: self.speed.value,
            degrees: self.direction.degrees.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CurrentResponse {
    epoch_time: i64,
    weather_text: Option<String>,
    weather_icon: Option<u8>,
    #[serde(default)]
    temperature: UnitMeasure,
    #[serde(default)]
    real_feel_temperature: UnitMeasure,
    relative_humidity: Option<f64>,
    #[serde(default)]
    visibility: UnitMeasure,
    wind: Option<CurrentWind>,
    #[serde(default)]
    mobile_link: String,
    #[serde(default)]
    link: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HourlyResponse {
    epoch_date_time: i64,
    weather_icon: Option<u8>,
    #[serde(default)]
    temperature: Measure,
    #[serde(default)]
    real_feel_temperature: Measure,
    #[serde(rename = "UVIndex")]
    uv_index: Option<u8>,
    precipitation_probability: Option<f64>,
    #[serde(default)]
    has_precipitation: bool,
    precipitation_type: Option<String>,
    #[serde(default)]
    total_liquid: Measure,
    #[serde(default)]
    wind: ForecastWind,
    #[serde(default)]
    mobile_link: String,
    #[serde(default)]
    link: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SunInfo {
    epoch_rise: Option<i64>,
    epoch_set: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TemperatureRange {
    #[serde(default)]
    minimum: Measure,
    #[serde(default)]
    maximum: Measure,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DayPart {
    icon: Option<u8>,
    #[serde(default)]
    has_precipitation: bool,
    precipitation_type: Option<String>,
    precipitation_probability: Option<f64>,
    relative_humidity: Option<HumidityRange>,
    #[serde(default)]
    wind: ForecastWind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HumidityRange {
    average: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AirAndPollen {
    name: String,
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DailyForecast {
    epoch_date: i64,
    sun: Option<SunInfo>,
    #[serde(default)]
    temperature: TemperatureRange,
    #[serde(default)]
    day: DayPart,
    #[serde(default)]
    air_and_pollen: Vec<AirAndPollen>,
    #[serde(default)]
    mobile_link: String,
    #[serde(default)]
    link: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DailyResponse {
    #[serde(default)]
    daily_forecasts: Vec<DailyForecast>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GeoPositionResponse {
    key: String,
}

fn precipitation_type(has_precipitation: bool, kind: Option<&str>) -> PrecipitationType {
    if !has_precipitation {
        return PrecipitationType::None;
    }
    match kind {
        Some("Snow") => PrecipitationType::Snow,
        Some("Ice") | Some("Mixed") => PrecipitationType::Ice,
        _ => PrecipitationType::Rain,
    }
}

#[derive(Clone)]
pub struct AccuWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AccuWeatherClient {
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
        let key = &request.location.provider_location_key;
        info!("🌦️  Fetching {} from AccuWeather for location {}", endpoint, key);

        let metric = (request.unit == Unit::Metric).to_string();
        let response = self
            .client
            .get(format!("{}/{}/{}", self.base_url, endpoint, key))
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("language", request.locale.as_str()),
                ("details", "true"),
                ("metric", metric.as_str()),
            ])
            .send()
            .await?;

        decode_response(NAME, response).await
    }

    pub async fn geo_position_search(&self, coords: &Coords) -> Result<String, ProviderError> {
        let q = format!("{},{}", coords.latitude, coords.longitude);
        let response = self
            .client
            .get(format!(
                "{}/locations/v1/cities/geoposition/search",
                self.base_url
            ))
            .query(&[("apikey", self.api_key.as_str()), ("q", q.as_str())])
            .send()
            .await?;

        let resp: GeoPositionResponse = decode_response(NAME, response).await?;
        Ok(resp.key)
    }
}

#[async_trait]
impl WeatherProvider for AccuWeatherClient {
    fn forecaster(&self) -> WeatherForecaster {
        WeatherForecaster::AccuWeather
    }

    fn description(&self) -> &str {
        "AccuWeather provider - 12 hour hourly and 5 day daily forecasts"
    }

    async fn current(&self, request: &ProviderRequest) -> Result<CurrentWeather, ProviderError> {
        let resp: Vec<CurrentResponse> = self.fetch("currentconditions/v1", request).await?;
        let current = resp
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse(NAME))?;
        let unit = request.unit;

        Ok(CurrentWeather {
            epoch_time: current.epoch_time,
            visibility: current.visibility.value(unit),
            current_temperature: current.temperature.value(unit),
            min_temperature: None,
            max_temperature: None,
            feels_like_temperature: current.real_feel_temperature.value(unit),
            humidity: current.relative_humidity.map(|h| h / 100.0),
            wind: current.wind.map(|w| Wind {
                speed: w.speed.value(unit),
                degrees: w.direction.degrees.unwrap_or_default(),
            }),
            icon_resource: current
                .weather_icon
                .map(|icon| accu_weather_icon(icon).to_string()),
            summary: current.weather_text,
            mobile_link: current.mobile_link,
            link: current.link,
        })
    }

    async fn hourly(&self, request: &ProviderRequest) -> Result<Vec<HourlyWeather>, ProviderError> {
        let resp: Vec<HourlyResponse> = self
            .fetch("forecasts/v1/hourly/12hour", request)
            .await?;

        Ok(resp
            .into_iter()
            .map(|hour| HourlyWeather {
                epoch_time: hour.epoch_date_time,
                current_temperature: hour.temperature.value,
                feels_like_temperature: hour.real_feel_temperature.value,
                uv_index: hour.uv_index,
                probability_of_precipitation: hour.precipitation_probability.map(|p| p / 100.0),
                precipitation_type: precipitation_type(
                    hour.has_precipitation,
                    hour.precipitation_type.as_deref(),
                ),
                amount_of_precipitation: hour.total_liquid.value,
                wind: Some(hour.wind.to_wind()),
                icon_resource: hour
                    .weather_icon
                    .map(|icon| accu_weather_icon(icon).to_string()),
                mobile_link: hour.mobile_link,
                link: hour.link,
            })
            .collect())
    }

    async fn daily(&self, request: &ProviderRequest) -> Result<Vec<DailyWeather>, ProviderError> {
        let resp: DailyResponse = self.fetch("forecasts/v1/daily/5day", request).await?;

        Ok(resp
            .daily_forecasts
            .into_iter()
            .map(|day| {
                let uv_index = day
                    .air_and_pollen
                    .iter()
                    .find(|a| a.name == "UVIndex")
                    .and_then(|a| a.value);
                DailyWeather {
                    epoch_time: day.epoch_date,
                    min_temperature: day.temperature.minimum.value,
                    max_temperature: day.temperature.maximum.value,
                    humidity: day
                        .day
                        .relative_humidity
                        .as_ref()
                        .and_then(|h| h.average)
                        .map(|h| h / 100.0),
                    uv_index,
                    sunrise_time: day.sun.as_ref().and_then(|s| s.epoch_rise),
                    sunset_time: day.sun.as_ref().and_then(|s| s.epoch_set),
                    wind: Some(day.day.wind.to_wind()),
                    probability_of_precipitation: day
                        .day
                        .precipitation_probability
                        .map(|p| p / 100.0),
                    precipitation_type: precipitation_type(
                        day.day.has_precipitation,
                        day.day.precipitation_type.as_deref(),
                    ),
                    icon_resource: day.day.icon.map(|icon| accu_weather_icon(icon).to_string()),
                    mobile_link: day.mobile_link,
                    link: day.link,
                }
            })
            .collect())
    }
}
