//! Component wiring.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cleaner::{Cleaner, CoordsCleaner, WeatherCleaner};
use crate::config::Config;
use crate::gateway::WeatherGateway;
use crate::location::LocationResolver;
use crate::model::{WeatherForecaster, WeatherKind};
use crate::providers::{
    AccuWeatherClient, ApiNinjasClient, GeocodingProvider, HttpGeocoder, OpenWeatherClient,
    WeatherProvider,
};
use crate::scheduler::spawn_periodic;
use crate::storage::{LocationStorage, WeatherStorage};
use crate::store::{KeyValueStore, MemoryStore, RedisStore};
use crate::tasks::BackgroundTasks;
use crate::workflow::WeatherService;

pub struct App {
    pub gateway: Arc<WeatherGateway>,
    pub cleaners: Vec<Arc<dyn Cleaner>>,
    pub tasks: BackgroundTasks,
}

impl App {
    /// Wires the gateway and one cleaner per weather kind plus the coords
    /// cleaner over `store`.
    pub fn build(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        geocoder: Arc<dyn GeocodingProvider>,
        providers: Vec<Arc<dyn WeatherProvider>>,
    ) -> Self {
        let tasks = BackgroundTasks::new();
        let location_storage = LocationStorage::new(store.clone());
        let weather_storage = WeatherStorage::new(store);
        let resolver = LocationResolver::new(location_storage.clone(), geocoder, tasks.clone());

        let mut gateway = WeatherGateway::new(resolver.clone());
        for provider in providers {
            gateway.register(WeatherService::new(
                provider,
                weather_storage.clone(),
                resolver.clone(),
                tasks.clone(),
            ));
        }

        // Sweep every partition, including forecasters not configured right
        // now, so entries left by an earlier configuration still age out.
        let mut cleaners: Vec<Arc<dyn Cleaner>> = WeatherKind::ALL
            .into_iter()
            .map(|kind| {
                Arc::new(WeatherCleaner::new(
                    kind,
                    weather_storage.clone(),
                    config.weather_expiration,
                    WeatherForecaster::ALL.to_vec(),
                )) as Arc<dyn Cleaner>
            })
            .collect();
        cleaners.push(Arc::new(CoordsCleaner::new(
            location_storage,
            config.coords_expiration,
        )));

        Self {
            gateway: Arc::new(gateway),
            cleaners,
            tasks,
        }
    }

    /// Connects the configured store and builds HTTP clients for every
    /// provider that has an API key.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = match &config.redis_url {
            Some(url) => {
                info!("🗄️  Using Redis store");
                Arc::new(
                    RedisStore::connect(url)
                        .await
                        .context("failed to connect to Redis")?,
                )
            }
            None => {
                warn!("REDIS_URL not set, cache lives in memory only");
                Arc::new(MemoryStore::new())
            }
        };

        let accu_weather = config
            .accu_weather_api_key
            .clone()
            .map(AccuWeatherClient::new)
            .transpose()?;
        let open_weather = config
            .open_weather_api_key
            .clone()
            .map(OpenWeatherClient::new)
            .transpose()?;
        let ninjas = config
            .api_ninjas_api_key
            .clone()
            .map(ApiNinjasClient::new)
            .transpose()?;
        if ninjas.is_none() {
            warn!("API_NINJAS_API_KEY not set, new coordinates cannot be resolved");
        }

        let mut providers: Vec<Arc<dyn WeatherProvider>> = Vec::new();
        if let Some(client) = open_weather {
            providers.push(Arc::new(client));
        }
        if let Some(client) = &accu_weather {
            providers.push(Arc::new(client.clone()));
        }
        if providers.is_empty() {
            warn!("no weather provider API key configured");
        }

        let geocoder = Arc::new(HttpGeocoder::new(ninjas, accu_weather));
        Ok(Self::build(config, store, geocoder, providers))
    }

    pub fn spawn_cleaners(&self, period: Duration, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        self.cleaners
            .iter()
            .map(|cleaner| spawn_periodic(cleaner.clone(), period, cancel.clone()))
            .collect()
    }
}
