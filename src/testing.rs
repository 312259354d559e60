//! Counting fakes shared by the unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{ProviderError, StoreError};
use crate::model::{
    Address, Coords, CurrentWeather, DailyWeather, Geocoding, GeocodingRequest, HourlyWeather,
    ProviderRequest, WeatherForecaster,
};
use crate::providers::{GeocodingProvider, WeatherProvider};
use crate::store::{KeyValueStore, MemoryStore};

/// Geocoder that answers from a queue of localities and counts calls.
/// The last locality repeats once the queue is down to one.
pub struct FakeGeocoder {
    localities: Mutex<Vec<String>>,
    pub reverse_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    fail: bool,
}

impl FakeGeocoder {
    pub fn new(localities: &[&str]) -> Self {
        Self {
            localities: Mutex::new(localities.iter().rev().map(|s| s.to_string()).collect()),
            reverse_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn calls(&self) -> usize {
        self.reverse_calls.load(Ordering::SeqCst) + self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeocodingProvider for FakeGeocoder {
    async fn reverse_geocode(&self, _coords: &Coords) -> Result<Address, ProviderError> {
        self.reverse_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::RateLimited("fake"));
        }
        let mut localities = self.localities.lock().unwrap();
        let locality = if localities.len() > 1 {
            localities.pop().unwrap()
        } else {
            localities.last().cloned().unwrap_or_default()
        };
        Ok(Address {
            country: "UA".to_string(),
            state: "Kyiv City".to_string(),
            locality,
        })
    }

    async fn geo_position_search(&self, coords: &Coords) -> Result<Option<String>, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::RateLimited("fake"));
        }
        Ok(Some(format!("key-{}", coords)))
    }

    async fn find_geocoding(
        &self,
        request: &GeocodingRequest,
    ) -> Result<Vec<Geocoding>, ProviderError> {
        Ok(vec![Geocoding {
            name: request.city.clone(),
            coords: Coords::new(1.0, 2.0),
            country: "UA".to_string(),
            state: None,
        }])
    }
}

/// Weather provider returning fixed payloads stamped with its forecaster.
pub struct FakeProvider {
    forecaster: WeatherForecaster,
    pub calls: AtomicUsize,
    fail: bool,
}

impl FakeProvider {
    pub fn new(forecaster: WeatherForecaster) -> Self {
        Self {
            forecaster,
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing(forecaster: WeatherForecaster) -> Self {
        Self {
            fail: true,
            ..Self::new(forecaster)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn current_for(forecaster: WeatherForecaster) -> CurrentWeather {
        CurrentWeather {
            epoch_time: 1_700_000_000,
            current_temperature: Some(21.5),
            summary: Some(format!("sunny via {}", forecaster)),
            ..Default::default()
        }
    }

    fn hit(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::RateLimited("fake"));
        }
        Ok(())
    }
}

#[async_trait]
impl WeatherProvider for FakeProvider {
    fn forecaster(&self) -> WeatherForecaster {
        self.forecaster
    }

    fn description(&self) -> &str {
        "fake provider"
    }

    async fn current(&self, _request: &ProviderRequest) -> Result<CurrentWeather, ProviderError> {
        self.hit()?;
        Ok(Self::current_for(self.forecaster))
    }

    async fn hourly(&self, _request: &ProviderRequest) -> Result<Vec<HourlyWeather>, ProviderError> {
        self.hit()?;
        Ok(vec![HourlyWeather {
            epoch_time: 1_700_000_000,
            ..Default::default()
        }])
    }

    async fn daily(&self, _request: &ProviderRequest) -> Result<Vec<DailyWeather>, ProviderError> {
        self.hit()?;
        Ok(vec![DailyWeather {
            epoch_time: 1_700_000_000,
            ..Default::default()
        }])
    }
}

/// In-memory store that counts every call. Reads can be made to fail,
/// writes to particular maps to fail or hang, and deletes of particular
/// fields to fail.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub calls: AtomicUsize,
    fail_reads: AtomicBool,
    failing_writes: Mutex<Vec<String>>,
    stalled_writes: Mutex<Vec<String>>,
    failing_deletes: Mutex<Vec<(String, String)>>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes_to(&self, map: &str) {
        self.failing_writes.lock().unwrap().push(map.to_string());
    }

    /// Writes to `map` never complete.
    pub fn stall_writes_to(&self, map: &str) {
        self.stalled_writes.lock().unwrap().push(map.to_string());
    }

    pub fn fail_delete(&self, map: &str, field: &str) {
        self.failing_deletes
            .lock()
            .unwrap()
            .push((map.to_string(), field.to_string()));
    }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn hget(&self, map: &str, field: &str) -> Result<Vec<u8>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection reset".to_string()));
        }
        self.inner.hget(map, field).await
    }

    async fn hset(&self, map: &str, field: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stalls = self.stalled_writes.lock().unwrap().iter().any(|m| m == map);
        if stalls {
            std::future::pending::<()>().await;
        }
        let fails = self.failing_writes.lock().unwrap().iter().any(|m| m == map);
        if fails {
            return Err(StoreError::Backend("write refused".to_string()));
        }
        self.inner.hset(map, field, value).await
    }

    async fn hdel(&self, map: &str, field: &str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fails = self
            .failing_deletes
            .lock()
            .unwrap()
            .iter()
            .any(|(m, f)| m == map && f == field);
        if fails {
            return Err(StoreError::Backend("delete refused".to_string()));
        }
        self.inner.hdel(map, field).await
    }

    async fn hget_all(&self, map: &str) -> Result<HashMap<String, Vec<u8>>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.hget_all(map).await
    }
}
