//! Shutdown coordination (spec §5): SIGINT/SIGTERM flips a `watch` channel
//! observed by every long-lived task; once they've drained, the bus
//! producer/consumer are closed and the database disconnected before exit.

use anyhow::Result;
use futures::stream::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use tokio::sync::watch;
use tracing::info;

/// Spawns the signal listener and returns the receiver half to hand to every
/// independent task (mempool tap, bus consumer, cleanup loop, http server).
pub fn install() -> Result<watch::Receiver<bool>> {
    let (tx, rx) = watch::channel(false);
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    tokio::spawn(async move {
        if let Some(signal) = signals.next().await {
            info!(signal, "shutdown signal received");
            let _ = tx.send(true);
        }
    });

    Ok(rx)
}

/// §5 close sequence: bus producer, bus consumer (via its own task exit),
/// then the database connection pool.
pub async fn finalize(db: &crate::db::Database) {
    crate::bus::producer::close();
    db.close().await;
    info!("shutdown sequence complete");
}
