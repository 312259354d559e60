//! HTTP/JSON surface over [`WeatherGateway`].

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};
use tracing::warn;

use crate::error::{GatewayError, ProviderError};
use crate::gateway::{ForecasterInfo, WeatherGateway};
use crate::model::{
    Coords, CurrentWeather, DailyWeather, Geocoding, GeocodingRequest, HourlyWeather, Unit,
    WeatherForecaster, WeatherRequest,
};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<WeatherGateway>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    locale: String,
    #[serde(default)]
    unit: Unit,
    forecaster: Option<String>,
}

impl WeatherQuery {
    fn into_parts(self) -> Result<(Option<WeatherForecaster>, WeatherRequest), ApiError> {
        let forecaster = self
            .forecaster
            .map(|name| {
                name.parse::<WeatherForecaster>().map_err(|name| {
                    ApiError::new(StatusCode::BAD_REQUEST, format!("unknown forecaster '{}'", name))
                })
            })
            .transpose()?;

        let coords = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coords::new(lat, lon)),
            _ => None,
        };

        Ok((
            forecaster,
            WeatherRequest {
                coords,
                locale: self.locale,
                unit: self.unit,
            },
        ))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status = match &err {
            GatewayError::Validation(_) | GatewayError::UnknownForecaster(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::Provider(ProviderError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Provider(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            warn!("❌ request failed: {}", err);
        }
        Self::new(status, err.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub fn router(gateway: Arc<WeatherGateway>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/forecasters", get(forecasters))
        .route("/api/geocoding", get(geocoding))
        .route("/api/weather/current", get(current_weather))
        .route("/api/weather/hourly", get(hourly_weather))
        .route("/api/weather/daily", get(daily_weather))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::very_permissive())
        .with_state(AppState { gateway })
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn forecasters(State(state): State<AppState>) -> Json<Vec<ForecasterInfo>> {
    Json(state.gateway.forecasters())
}

async fn geocoding(
    State(state): State<AppState>,
    query: Result<Query<GeocodingRequest>, QueryRejection>,
) -> Result<Json<Vec<Geocoding>>, ApiError> {
    let Query(request) = query?;
    Ok(Json(state.gateway.find_geocoding(&request).await?))
}

async fn current_weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<CurrentWeather>, ApiError> {
    let Query(query) = query?;
    let (forecaster, request) = query.into_parts()?;
    Ok(Json(state.gateway.current(forecaster, &request).await?))
}

async fn hourly_weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<Vec<HourlyWeather>>, ApiError> {
    let Query(query) = query?;
    let (forecaster, request) = query.into_parts()?;
    Ok(Json(state.gateway.hourly(forecaster, &request).await?))
}

async fn daily_weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<Vec<DailyWeather>>, ApiError> {
    let Query(query) = query?;
    let (forecaster, request) = query.into_parts()?;
    Ok(Json(state.gateway.daily(forecaster, &request).await?))
}
