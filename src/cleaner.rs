//! Expiration sweeps for cached weather and tracked coordinates.
//!
//! Staleness is measured from the "last updated" / "last used" timestamp, not
//! from creation. Each expired entry loses its payload and its timestamp in
//! one concurrent pair of deletes. A failed delete is logged and the sweep
//! carries on.

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::model::{WeatherForecaster, WeatherKind};
use crate::storage::{LocationStorage, WeatherStorage};

/// One periodic sweep over part of the cache.
#[async_trait]
pub trait Cleaner: Send + Sync {
    fn name(&self) -> String;

    async fn run(&self, cancel: &CancellationToken);
}

/// What one sweep did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

impl SweepStats {
    fn merge(self, other: SweepStats) -> SweepStats {
        SweepStats {
            scanned: self.scanned + other.scanned,
            removed: self.removed + other.removed,
            failed: self.failed + other.failed,
        }
    }
}

/// `true` once at least `expiration` has passed since `last_millis`.
pub fn is_expired(now_millis: i64, last_millis: i64, expiration: Duration) -> bool {
    let expiration = i64::try_from(expiration.as_millis()).unwrap_or(i64::MAX);
    now_millis.saturating_sub(last_millis) >= expiration
}

/// Removes weather of one kind whose last update is older than `expiration`,
/// sweeping every forecaster's partition concurrently.
pub struct WeatherCleaner {
    kind: WeatherKind,
    storage: WeatherStorage,
    expiration: Duration,
    forecasters: Vec<WeatherForecaster>,
}

impl WeatherCleaner {
    pub fn new(
        kind: WeatherKind,
        storage: WeatherStorage,
        expiration: Duration,
        forecasters: Vec<WeatherForecaster>,
    ) -> Self {
        Self {
            kind,
            storage,
            expiration,
            forecasters,
        }
    }

    pub async fn sweep_at(&self, now_millis: i64, cancel: &CancellationToken) -> SweepStats {
        let partitions = self
            .forecasters
            .iter()
            .map(|forecaster| self.sweep_partition(*forecaster, now_millis, cancel));

        join_all(partitions)
            .await
            .into_iter()
            .fold(SweepStats::default(), SweepStats::merge)
    }

    async fn sweep_partition(
        &self,
        forecaster: WeatherForecaster,
        now_millis: i64,
        cancel: &CancellationToken,
    ) -> SweepStats {
        if cancel.is_cancelled() {
            debug!(kind = %self.kind, %forecaster, "sweep cancelled");
            return SweepStats::default();
        }

        let updated = match self.storage.all_updated_times(self.kind, forecaster).await {
            Ok(updated) => updated,
            Err(e) => {
                error!(kind = %self.kind, %forecaster, "failed to read weather update times: {}", e);
                return SweepStats {
                    failed: 1,
                    ..Default::default()
                };
            }
        };

        let scanned = updated.len();
        let expired: Vec<String> = updated
            .into_iter()
            .filter(|(_, last)| is_expired(now_millis, *last, self.expiration))
            .map(|(hash, _)| hash)
            .collect();

        let deletes = expired.iter().map(|hash| async move {
            let (payload, updated) = tokio::join!(
                self.storage.remove(self.kind, hash, forecaster),
                self.storage.remove_updated_time(self.kind, hash, forecaster),
            );
            let mut ok = true;
            if let Err(e) = payload {
                warn!(kind = %self.kind, %forecaster, address_hash = %hash, "failed to remove weather: {}", e);
                ok = false;
            }
            if let Err(e) = updated {
                warn!(kind = %self.kind, %forecaster, address_hash = %hash, "failed to remove weather update time: {}", e);
                ok = false;
            }
            ok
        });

        let results = join_all(deletes).await;
        let failed = results.iter().filter(|ok| !**ok).count();
        SweepStats {
            scanned,
            removed: results.len() - failed,
            failed,
        }
    }
}

#[async_trait]
impl Cleaner for WeatherCleaner {
    fn name(&self) -> String {
        format!("{}-weather", self.kind)
    }

    async fn run(&self, cancel: &CancellationToken) {
        let stats = self.sweep_at(Utc::now().timestamp_millis(), cancel).await;
        if stats.removed > 0 || stats.failed > 0 {
            info!(kind = %self.kind, removed = stats.removed, failed = stats.failed, "🧹 expired weather swept");
        }
    }
}

/// Forgets coordinates nobody has resolved for `expiration`. Removes the
/// coords→hash mapping and the last-used marker; locations are kept.
pub struct CoordsCleaner {
    storage: LocationStorage,
    expiration: Duration,
}

impl CoordsCleaner {
    pub fn new(storage: LocationStorage, expiration: Duration) -> Self {
        Self {
            storage,
            expiration,
        }
    }

    pub async fn sweep_at(&self, now_millis: i64, cancel: &CancellationToken) -> SweepStats {
        if cancel.is_cancelled() {
            return SweepStats::default();
        }

        let last_used = match self.storage.all_last_used().await {
            Ok(last_used) => last_used,
            Err(e) => {
                error!("failed to read coords last used times: {}", e);
                return SweepStats {
                    failed: 1,
                    ..Default::default()
                };
            }
        };

        let scanned = last_used.len();
        let expired: Vec<String> = last_used
            .into_iter()
            .filter(|(_, last)| is_expired(now_millis, *last, self.expiration))
            .map(|(field, _)| field)
            .collect();

        let deletes = expired.iter().map(|field| async move {
            let (mapping, last_used) = tokio::join!(
                self.storage.remove_coords(field),
                self.storage.remove_last_used(field),
            );
            let mut ok = true;
            if let Err(e) = mapping {
                warn!(coords = %field, "failed to remove coords: {}", e);
                ok = false;
            }
            if let Err(e) = last_used {
                warn!(coords = %field, "failed to remove coords last used time: {}", e);
                ok = false;
            }
            ok
        });

        let results = join_all(deletes).await;
        let failed = results.iter().filter(|ok| !**ok).count();
        SweepStats {
            scanned,
            removed: results.len() - failed,
            failed,
        }
    }
}

#[async_trait]
impl Cleaner for CoordsCleaner {
    fn name(&self) -> String {
        "coords".to_string()
    }

    async fn run(&self, cancel: &CancellationToken) {
        let stats = self.sweep_at(Utc::now().timestamp_millis(), cancel).await;
        if stats.removed > 0 || stats.failed > 0 {
            info!(removed = stats.removed, failed = stats.failed, "🧹 unused coords swept");
        }
    }
}
