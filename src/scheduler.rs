use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cleaner::Cleaner;

/// Runs `cleaner` every `period` until `cancel` fires. The first sweep
/// happens immediately. A slow sweep delays the next tick instead of
/// triggering a burst.
pub fn spawn_periodic(
    cleaner: Arc<dyn Cleaner>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = cleaner.name();
        info!(cleaner = %name, ?period, "⏰ cleaner scheduled");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => cleaner.run(&cancel).await,
            }
        }

        info!(cleaner = %name, "cleaner stopped");
    })
}
