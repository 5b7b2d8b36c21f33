//! The expiry sweeper: a periodic background task that returns stale holds to availability.
//!
//! The sweeper holds no state of its own — everything it needs lives in the reservation store —
//! so it survives process restarts and can be re-run after any failure without corrupting
//! anything.

use chrono::Utc;
use log::*;
use tokio::task::JoinHandle;

use crate::{
    events::{EventProducers, StockReleasedEvent},
    InventoryApi,
    SqliteDatabase,
};

/// Starts the expiry sweeper. Embedding applications typically pass
/// [`config::sweep_interval()`](crate::config::sweep_interval). Do not await the returned
/// JoinHandle, as it runs indefinitely.
pub fn start_expiry_sweeper(
    db: SqliteDatabase,
    producers: EventProducers,
    interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = InventoryApi::new(db);
        info!("🕰️ Reservation expiry sweeper started (every {interval:?})");
        loop {
            timer.tick().await;
            match api.expire_stale(Utc::now()).await {
                Ok(released) if released.is_empty() => {
                    trace!("🕰️ Sweep complete. No stale reservations");
                },
                Ok(released) => {
                    info!("🕰️ Sweep complete. {} reservations released", released.len());
                    for emitter in &producers.stock_released_producer {
                        emitter.publish_event(StockReleasedEvent::new(released.clone())).await;
                    }
                },
                Err(e) => {
                    // Transient failures roll back in full; the next tick is a fresh attempt.
                    error!("🕰️ Error running reservation expiry sweep: {e}");
                },
            }
        }
    })
}
