//! Coordinate → address hash → location resolution.
//!
//! Resolution is two-step. Exact coordinates are cached against the hash of
//! their reverse-geocoded address, and locations are cached against that hash.
//! Nearby coordinates that name the same place therefore share a single
//! location row and a single upstream geo-position lookup.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::{GatewayError, StoreError};
use crate::model::{AddressHash, Coords, Geocoding, GeocodingRequest, Location, LocationInfo};
use crate::providers::GeocodingProvider;
use crate::storage::LocationStorage;
use crate::tasks::BackgroundTasks;
use crate::validation::validate_geocoding_request;

#[derive(Clone)]
pub struct LocationResolver {
    storage: LocationStorage,
    geocoder: Arc<dyn GeocodingProvider>,
    tasks: BackgroundTasks,
}

impl LocationResolver {
    pub fn new(
        storage: LocationStorage,
        geocoder: Arc<dyn GeocodingProvider>,
        tasks: BackgroundTasks,
    ) -> Self {
        Self {
            storage,
            geocoder,
            tasks,
        }
    }

    /// Cached hash for `coords`, or reverse geocode and remember it.
    ///
    /// On a miss the coords→hash mapping and the coordinate's "last used"
    /// timestamp are written concurrently and awaited before returning.
    /// Write failures are logged only.
    pub async fn address_hash_by_coords(&self, coords: &Coords) -> Result<AddressHash, GatewayError> {
        match self.storage.address_hash_by_coords(coords).await {
            Ok(hash) => return Ok(hash),
            Err(StoreError::NotFound) => {
                debug!(%coords, "coords not cached, reverse geocoding");
            }
            Err(e) => return Err(e.into()),
        }

        let address = self.geocoder.reverse_geocode(coords).await?;
        let hash = AddressHash::from_address(&address);
        self.store_address_hash(coords, &hash).await;
        Ok(hash)
    }

    async fn store_address_hash(&self, coords: &Coords, hash: &AddressHash) {
        let now = Utc::now().timestamp_millis();
        info!(%coords, address_hash = %hash, "storing address hash");

        let (mapping, last_used) = tokio::join!(
            self.storage.add_coords(coords, hash),
            self.storage.update_last_used(coords, now),
        );
        if let Err(e) = mapping {
            error!(%coords, "failed to store coords mapping: {}", e);
        }
        if let Err(e) = last_used {
            error!(%coords, "failed to store coords last used time: {}", e);
        }
    }

    /// Cached location for `hash`, or look up the provider key for `coords`.
    /// A new location is persisted in the background.
    ///
    /// When the geocoder has no provider key to offer, the coordinates stand
    /// in for it and nothing is stored, so a provider configured later still
    /// gets its own key for every address.
    pub async fn location_by_address_hash(
        &self,
        coords: &Coords,
        hash: &AddressHash,
    ) -> Result<Location, GatewayError> {
        match self.storage.location(hash).await {
            Ok(location) => return Ok(location),
            Err(StoreError::NotFound) => {
                info!(address_hash = %hash, "location not cached, searching geo position");
            }
            Err(e) => return Err(e.into()),
        }

        let Some(provider_location_key) = self.geocoder.geo_position_search(coords).await? else {
            debug!(address_hash = %hash, "no location provider, keying by coords");
            return Ok(Location {
                coords: *coords,
                provider_location_key: coords.cache_field(),
            });
        };
        let location = Location {
            coords: *coords,
            provider_location_key,
        };

        let storage = self.storage.clone();
        let (hash, stored) = (hash.clone(), location.clone());
        self.tasks.spawn_write("save location", async move {
            storage.save_location(&hash, &stored).await
        });

        Ok(location)
    }

    pub async fn location_by_coords(&self, coords: &Coords) -> Result<LocationInfo, GatewayError> {
        let address_hash = self.address_hash_by_coords(coords).await?;
        let location = self.location_by_address_hash(coords, &address_hash).await?;
        Ok(LocationInfo {
            coords: location.coords,
            address_hash,
            provider_location_key: location.provider_location_key,
        })
    }

    /// Forward geocoding. Not cached.
    pub async fn find_geocoding(
        &self,
        request: &GeocodingRequest,
    ) -> Result<Vec<Geocoding>, GatewayError> {
        validate_geocoding_request(request)?;
        Ok(self.geocoder.find_geocoding(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::store::{KeyValueStore, MemoryStore};
    use crate::providers::{AccuWeatherClient, HttpGeocoder};
    use crate::testing::{CountingStore, FakeGeocoder};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(geocoder: Arc<FakeGeocoder>) -> (LocationResolver, Arc<MemoryStore>, BackgroundTasks) {
        let store = Arc::new(MemoryStore::new());
        let tasks = BackgroundTasks::new();
        let resolver = LocationResolver::new(
            LocationStorage::new(store.clone()),
            geocoder,
            tasks.clone(),
        );
        (resolver, store, tasks)
    }

    #[tokio::test]
    async fn cached_hash_wins_over_a_changed_geocoder_answer() {
        let geocoder = Arc::new(FakeGeocoder::new(&["Kyiv", "Kiev"]));
        let (resolver, _, _) = resolver(geocoder.clone());
        let coords = Coords::new(50.4536, 30.5164);

        let first = resolver.address_hash_by_coords(&coords).await.unwrap();
        let second = resolver.address_hash_by_coords(&coords).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(geocoder.reverse_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nearby_coords_with_same_address_share_a_hash() {
        let geocoder = Arc::new(FakeGeocoder::new(&["Kyiv"]));
        let (resolver, _, _) = resolver(geocoder.clone());

        let a = resolver
            .address_hash_by_coords(&Coords::new(50.4536, 30.5164))
            .await
            .unwrap();
        let b = resolver
            .address_hash_by_coords(&Coords::new(50.4501, 30.5234))
            .await
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(geocoder.reverse_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn miss_records_mapping_and_last_used_time() {
        let (resolver, store, _) = resolver(Arc::new(FakeGeocoder::new(&["Kyiv"])));
        let coords = Coords::new(50.4536, 30.5164);

        resolver.address_hash_by_coords(&coords).await.unwrap();

        assert!(store.contains("weather-api:coords", &coords.cache_field()).await);
        assert!(
            store
                .contains("weather-api:coords-last-time", &coords.cache_field())
                .await
        );
    }

    #[tokio::test]
    async fn location_is_looked_up_once_per_hash() {
        let geocoder = Arc::new(FakeGeocoder::new(&["Kyiv"]));
        let (resolver, store, tasks) = resolver(geocoder.clone());
        let a = Coords::new(50.4536, 30.5164);
        let b = Coords::new(50.4501, 30.5234);

        let first = resolver.location_by_coords(&a).await.unwrap();
        tasks.settle().await;
        let second = resolver.location_by_coords(&b).await.unwrap();

        assert_eq!(first.address_hash, second.address_hash);
        assert_eq!(second.coords, a);
        assert_eq!(second.provider_location_key, format!("key-{}", a));
        assert_eq!(geocoder.search_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.len("weather-api:location").await, 1);
    }

    fn resolver_over(
        store: Arc<dyn KeyValueStore>,
        geocoder: Arc<dyn GeocodingProvider>,
    ) -> (LocationResolver, BackgroundTasks) {
        let tasks = BackgroundTasks::new();
        let resolver = LocationResolver::new(LocationStorage::new(store), geocoder, tasks.clone());
        (resolver, tasks)
    }

    #[tokio::test]
    async fn coords_stand_in_for_a_missing_location_provider_until_one_is_configured() {
        let store = Arc::new(MemoryStore::new());
        let coords = Coords::new(50.4536, 30.5164);
        let hash = AddressHash::from("h".to_string());

        let (keyless, tasks) =
            resolver_over(store.clone(), Arc::new(HttpGeocoder::new(None, None)));
        let location = keyless.location_by_address_hash(&coords, &hash).await.unwrap();
        tasks.settle().await;

        assert_eq!(location.provider_location_key, coords.cache_field());
        assert_eq!(store.len("weather-api:location").await, 0);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/locations/v1/cities/geoposition/search"))
            .and(query_param("q", "50.4536,30.5164"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Key": "324505", "LocalizedName": "Kyiv"
            })))
            .expect(1)
            .mount(&server)
            .await;
        let accu_weather =
            AccuWeatherClient::with_base_url("key".to_string(), &server.uri()).unwrap();
        let (keyed, tasks) = resolver_over(
            store.clone(),
            Arc::new(HttpGeocoder::new(None, Some(accu_weather))),
        );

        let location = keyed.location_by_address_hash(&coords, &hash).await.unwrap();
        tasks.settle().await;

        assert_eq!(location.provider_location_key, "324505");
        assert_eq!(store.len("weather-api:location").await, 1);
    }

    #[tokio::test]
    async fn failed_location_write_is_retried_on_the_next_lookup() {
        let store = Arc::new(CountingStore::new());
        store.fail_writes_to("weather-api:location");
        let geocoder = Arc::new(FakeGeocoder::new(&["Kyiv"]));
        let (resolver, tasks) = resolver_over(store.clone(), geocoder.clone());
        let coords = Coords::new(50.4536, 30.5164);
        let hash = AddressHash::from("h".to_string());

        let first = resolver.location_by_address_hash(&coords, &hash).await.unwrap();
        tasks.settle().await;
        let second = resolver.location_by_address_hash(&coords, &hash).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(geocoder.search_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn hung_location_write_does_not_delay_the_lookup() {
        let store = Arc::new(CountingStore::new());
        store.stall_writes_to("weather-api:location");
        let (resolver, tasks) = resolver_over(store, Arc::new(FakeGeocoder::new(&["Kyiv"])));
        let coords = Coords::new(50.4536, 30.5164);

        let location = tokio::time::timeout(
            Duration::from_secs(5),
            resolver.location_by_address_hash(&coords, &AddressHash::from("h".to_string())),
        )
        .await
        .expect("lookup waited on the location write")
        .unwrap();

        assert_eq!(location.provider_location_key, format!("key-{}", coords));
        assert_eq!(tasks.in_flight(), 1);
    }

    #[tokio::test]
    async fn geocoder_errors_are_returned_and_nothing_is_cached() {
        let (resolver, store, tasks) = resolver(Arc::new(FakeGeocoder::failing()));
        let coords = Coords::new(50.4536, 30.5164);

        let err = resolver.location_by_coords(&coords).await.unwrap_err();
        tasks.settle().await;

        assert!(matches!(
            err,
            GatewayError::Provider(ProviderError::RateLimited(_))
        ));
        assert!(store.hget_all("weather-api:coords").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_geocoding_requires_a_city() {
        let (resolver, _, _) = resolver(Arc::new(FakeGeocoder::new(&[])));

        let err = resolver
            .find_geocoding(&GeocodingRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));

        let found = resolver
            .find_geocoding(&GeocodingRequest {
                city: "Lviv".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found[0].name, "Lviv");
    }
}
