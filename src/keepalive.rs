// Periodic ping that keeps the backend connection from going idle.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::db::Database;
use crate::metrics;

/// Ping the store once. Returns whether the round trip succeeded.
pub async fn keepalive_tick(db: &Database) -> bool {
    match db.ping().await {
        Ok(()) => {
            debug!("Keep-alive ping ok");
            true
        }
        Err(e) => {
            metrics::KEEPALIVE_FAILURES_TOTAL.inc();
            error!("Keep-alive ping failed: {e}");
            false
        }
    }
}

/// Spawn the keep-alive loop. The first ping happens one `interval` after start.
///
/// Failures are logged and the loop keeps going; the next command reopens the
/// connection if the pool dropped it.
pub fn spawn_keepalive(db: Arc<Database>, interval: Duration) -> JoinHandle<()> {
    info!(?interval, "Keep-alive started");
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately; the store was just opened.
        timer.tick().await;
        loop {
            timer.tick().await;
            keepalive_tick(&db).await;
        }
    })
}
