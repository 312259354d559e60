//! Typed views over the key/value store: map names, field encoding and JSON
//! (de)serialization for locations and weather payloads.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::error::StoreError;
use crate::model::{AddressHash, Coords, Location, WeatherForecaster, WeatherKind};
use crate::store::KeyValueStore;

const COORDS_MAP: &str = "weather-api:coords";
const COORDS_LAST_USED_MAP: &str = "weather-api:coords-last-time";
const LOCATION_MAP: &str = "weather-api:location";

pub fn weather_map(kind: WeatherKind, forecaster: WeatherForecaster) -> String {
    format!("weather-api:{}-weather:{}", kind, forecaster)
}

pub fn weather_updated_map(kind: WeatherKind, forecaster: WeatherForecaster) -> String {
    format!("weather-api:{}-weather:updated:{}", kind, forecaster)
}

async fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    map: &str,
    field: &str,
) -> Result<T, StoreError> {
    let bytes = store.hget(map, field).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn set_json<T: Serialize + Sync + ?Sized>(
    store: &dyn KeyValueStore,
    map: &str,
    field: &str,
    value: &T,
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(value)?;
    store.hset(map, field, bytes).await
}

/// Decodes a whole timestamp map, skipping fields that do not decode.
fn decode_timestamps(map: &str, raw: std::collections::HashMap<String, Vec<u8>>) -> Vec<(String, i64)> {
    raw.into_iter()
        .filter_map(|(field, bytes)| match serde_json::from_slice::<i64>(&bytes) {
            Ok(ts) => Some((field, ts)),
            Err(e) => {
                warn!(map, field = %field, "skipping undecodable timestamp: {}", e);
                None
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct LocationStorage {
    store: Arc<dyn KeyValueStore>,
}

impl LocationStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn address_hash_by_coords(&self, coords: &Coords) -> Result<AddressHash, StoreError> {
        get_json(self.store.as_ref(), COORDS_MAP, &coords.cache_field()).await
    }

    pub async fn add_coords(&self, coords: &Coords, hash: &AddressHash) -> Result<(), StoreError> {
        set_json(self.store.as_ref(), COORDS_MAP, &coords.cache_field(), hash).await
    }

    /// Deletes by stored field, so fields written in another format go too.
    pub async fn remove_coords(&self, field: &str) -> Result<(), StoreError> {
        self.store.hdel(COORDS_MAP, field).await
    }

    pub async fn update_last_used(&self, coords: &Coords, at_millis: i64) -> Result<(), StoreError> {
        set_json(
            self.store.as_ref(),
            COORDS_LAST_USED_MAP,
            &coords.cache_field(),
            &at_millis,
        )
        .await
    }

    pub async fn remove_last_used(&self, field: &str) -> Result<(), StoreError> {
        self.store.hdel(COORDS_LAST_USED_MAP, field).await
    }

    /// Every tracked coords field, as stored, with the epoch millis it was
    /// last resolved.
    pub async fn all_last_used(&self) -> Result<Vec<(String, i64)>, StoreError> {
        let raw = self.store.hget_all(COORDS_LAST_USED_MAP).await?;
        Ok(decode_timestamps(COORDS_LAST_USED_MAP, raw))
    }

    pub async fn location(&self, hash: &AddressHash) -> Result<Location, StoreError> {
        get_json(self.store.as_ref(), LOCATION_MAP, hash.as_str()).await
    }

    pub async fn save_location(&self, hash: &AddressHash, location: &Location) -> Result<(), StoreError> {
        set_json(self.store.as_ref(), LOCATION_MAP, hash.as_str(), location).await
    }
}

/// Weather payloads and their "last updated" markers, partitioned by
/// `(kind, forecaster)` and keyed by address hash.
#[derive(Clone)]
pub struct WeatherStorage {
    store: Arc<dyn KeyValueStore>,
}

impl WeatherStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        kind: WeatherKind,
        hash: &AddressHash,
        forecaster: WeatherForecaster,
    ) -> Result<T, StoreError> {
        get_json(self.store.as_ref(), &weather_map(kind, forecaster), hash.as_str()).await
    }

    pub async fn save<T: Serialize + Sync>(
        &self,
        kind: WeatherKind,
        hash: &AddressHash,
        forecaster: WeatherForecaster,
        weather: &T,
    ) -> Result<(), StoreError> {
        set_json(
            self.store.as_ref(),
            &weather_map(kind, forecaster),
            hash.as_str(),
            weather,
        )
        .await
    }

    pub async fn remove(
        &self,
        kind: WeatherKind,
        hash: &str,
        forecaster: WeatherForecaster,
    ) -> Result<(), StoreError> {
        self.store.hdel(&weather_map(kind, forecaster), hash).await
    }

    pub async fn save_updated_time(
        &self,
        kind: WeatherKind,
        hash: &AddressHash,
        forecaster: WeatherForecaster,
        at_millis: i64,
    ) -> Result<(), StoreError> {
        set_json(
            self.store.as_ref(),
            &weather_updated_map(kind, forecaster),
            hash.as_str(),
            &at_millis,
        )
        .await
    }

    pub async fn remove_updated_time(
        &self,
        kind: WeatherKind,
        hash: &str,
        forecaster: WeatherForecaster,
    ) -> Result<(), StoreError> {
        self.store
            .hdel(&weather_updated_map(kind, forecaster), hash)
            .await
    }

    /// Address hash to epoch millis of the last write, for one partition.
    pub async fn all_updated_times(
        &self,
        kind: WeatherKind,
        forecaster: WeatherForecaster,
    ) -> Result<Vec<(String, i64)>, StoreError> {
        let map = weather_updated_map(kind, forecaster);
        let raw = self.store.hget_all(&map).await?;
        Ok(decode_timestamps(&map, raw))
    }
}
