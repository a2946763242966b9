//! Heartbeat sweeper

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::router::RoomRouter;

/// Every `interval`, evict connections silent for longer than `timeout`.
///
/// Runs until the returned handle is aborted.
pub fn spawn_sweeper(router: Arc<RoomRouter>, interval: Duration, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = router.evict_idle(Instant::now(), timeout).await;
            for conn in evicted {
                tracing::debug!(conn = %conn, "Heartbeat timeout");
            }
        }
    })
}
