//! Cache-aside weather fetching.
//!
//! Every weather kind goes through the same flow: validate, resolve the
//! location, read the cache, and on a miss ask the provider and populate the
//! cache in the background. [`CacheBackedFetcher`] is the per-kind seam.

use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::{GatewayError, ProviderError, StoreError};
use crate::model::{
    AddressHash, CurrentWeather, DailyWeather, HourlyWeather, ProviderRequest, WeatherForecaster,
    WeatherKind, WeatherRequest,
};
use crate::location::LocationResolver;
use crate::providers::WeatherProvider;
use crate::storage::WeatherStorage;
use crate::tasks::BackgroundTasks;
use crate::validation::validate_weather_request;

/// Storage and upstream access for one weather kind of one forecaster.
#[async_trait]
pub trait CacheBackedFetcher<T>: Send + Sync {
    fn forecaster(&self) -> WeatherForecaster;

    fn kind(&self) -> WeatherKind;

    async fn get(&self, hash: &AddressHash) -> Result<T, StoreError>;

    async fn save(&self, hash: &AddressHash, weather: &T) -> Result<(), StoreError>;

    async fn save_updated_time(&self, hash: &AddressHash, at_millis: i64) -> Result<(), StoreError>;

    async fn fetch(&self, request: &ProviderRequest) -> Result<T, ProviderError>;
}

/// A cacheable weather payload and the provider call that produces it.
#[async_trait]
pub trait WeatherPayload: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: WeatherKind;

    async fn fetch_from(
        provider: &dyn WeatherProvider,
        request: &ProviderRequest,
    ) -> Result<Self, ProviderError>;
}

#[async_trait]
impl WeatherPayload for CurrentWeather {
    const KIND: WeatherKind = WeatherKind::Current;

    async fn fetch_from(
        provider: &dyn WeatherProvider,
        request: &ProviderRequest,
    ) -> Result<Self, ProviderError> {
        provider.current(request).await
    }
}

#[async_trait]
impl WeatherPayload for Vec<HourlyWeather> {
    const KIND: WeatherKind = WeatherKind::Hourly;

    async fn fetch_from(
        provider: &dyn WeatherProvider,
        request: &ProviderRequest,
    ) -> Result<Self, ProviderError> {
        provider.hourly(request).await
    }
}

#[async_trait]
impl WeatherPayload for Vec<DailyWeather> {
    const KIND: WeatherKind = WeatherKind::Daily;

    async fn fetch_from(
        provider: &dyn WeatherProvider,
        request: &ProviderRequest,
    ) -> Result<Self, ProviderError> {
        provider.daily(request).await
    }
}

/// The store-backed fetcher used for every kind.
#[derive(Clone)]
pub struct ProviderFetcher {
    storage: WeatherStorage,
    provider: Arc<dyn WeatherProvider>,
}

impl ProviderFetcher {
    pub fn new(storage: WeatherStorage, provider: Arc<dyn WeatherProvider>) -> Self {
        Self { storage, provider }
    }
}

#[async_trait]
impl<T: WeatherPayload> CacheBackedFetcher<T> for ProviderFetcher {
    fn forecaster(&self) -> WeatherForecaster {
        self.provider.forecaster()
    }

    fn kind(&self) -> WeatherKind {
        T::KIND
    }

    async fn get(&self, hash: &AddressHash) -> Result<T, StoreError> {
        self.storage
            .get(T::KIND, hash, self.provider.forecaster())
            .await
    }

    async fn save(&self, hash: &AddressHash, weather: &T) -> Result<(), StoreError> {
        self.storage
            .save(T::KIND, hash, self.provider.forecaster(), weather)
            .await
    }

    async fn save_updated_time(&self, hash: &AddressHash, at_millis: i64) -> Result<(), StoreError> {
        self.storage
            .save_updated_time(T::KIND, hash, self.provider.forecaster(), at_millis)
            .await
    }

    async fn fetch(&self, request: &ProviderRequest) -> Result<T, ProviderError> {
        T::fetch_from(self.provider.as_ref(), request).await
    }
}

/// Runs one request through the cache-aside flow.
///
/// A cache hit returns with no side effects. A miss calls the provider once;
/// a provider error is returned and nothing is cached. A successful fetch is
/// returned right away while the payload and its update time are written by
/// detached tasks on `tasks`.
#[instrument(skip_all, fields(forecaster = %fetcher.forecaster(), kind = %fetcher.kind()))]
pub async fn cache_aside<T: WeatherPayload>(
    fetcher: &Arc<dyn CacheBackedFetcher<T>>,
    resolver: &LocationResolver,
    tasks: &BackgroundTasks,
    request: &WeatherRequest,
) -> Result<T, GatewayError> {
    let coords = validate_weather_request(request)?;
    let location = resolver.location_by_coords(&coords).await?;
    let hash = location.address_hash.clone();

    match fetcher.get(&hash).await {
        Ok(cached) => {
            debug!(address_hash = %hash, "📦 cache hit");
            return Ok(cached);
        }
        Err(StoreError::NotFound) => {
            info!(address_hash = %hash, "🌤️  cache miss, fetching from provider");
        }
        Err(e) => return Err(e.into()),
    }

    let provider_request = ProviderRequest {
        location,
        locale: request.locale.clone(),
        unit: request.unit,
    };
    let weather = fetcher.fetch(&provider_request).await?;

    let (payload_writer, payload_hash, payload) = (fetcher.clone(), hash.clone(), weather.clone());
    tasks.spawn_write("save weather", async move {
        payload_writer.save(&payload_hash, &payload).await
    });

    let time_writer = fetcher.clone();
    let now = Utc::now().timestamp_millis();
    tasks.spawn_write("save weather updated time", async move {
        time_writer.save_updated_time(&hash, now).await
    });

    Ok(weather)
}

/// Cache-aside access to all three weather kinds of one forecaster.
#[derive(Clone)]
pub struct WeatherService {
    forecaster: WeatherForecaster,
    description: String,
    resolver: LocationResolver,
    tasks: BackgroundTasks,
    current: Arc<dyn CacheBackedFetcher<CurrentWeather>>,
    hourly: Arc<dyn CacheBackedFetcher<Vec<HourlyWeather>>>,
    daily: Arc<dyn CacheBackedFetcher<Vec<DailyWeather>>>,
}

impl WeatherService {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        storage: WeatherStorage,
        resolver: LocationResolver,
        tasks: BackgroundTasks,
    ) -> Self {
        let forecaster = provider.forecaster();
        let description = provider.description().to_string();
        let fetcher = ProviderFetcher::new(storage, provider);
        Self {
            forecaster,
            description,
            resolver,
            tasks,
            current: Arc::new(fetcher.clone()),
            hourly: Arc::new(fetcher.clone()),
            daily: Arc::new(fetcher),
        }
    }

    pub fn forecaster(&self) -> WeatherForecaster {
        self.forecaster
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub async fn current(&self, request: &WeatherRequest) -> Result<CurrentWeather, GatewayError> {
        cache_aside(&self.current, &self.resolver, &self.tasks, request).await
    }

    pub async fn hourly(&self, request: &WeatherRequest) -> Result<Vec<HourlyWeather>, GatewayError> {
        cache_aside(&self.hourly, &self.resolver, &self.tasks, request).await
    }

    pub async fn daily(&self, request: &WeatherRequest) -> Result<Vec<DailyWeather>, GatewayError> {
        cache_aside(&self.daily, &self.resolver, &self.tasks, request).await
    }
}
