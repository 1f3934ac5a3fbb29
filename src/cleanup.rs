//! Cleanup loop (spec §4.8): runs at startup and every 60 minutes, three
//! deletion passes, combined count reported.

use std::time::Duration;
use tracing::{info, warn};

use crate::db::Database;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub struct CleanupLoop {
    pub db: Database,
}

impl CleanupLoop {
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        self.run_once().await;

        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        interval.tick().await; // first tick fires immediately; already ran above

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("cleanup loop received shutdown signal");
                        return;
                    }
                }
                _ = interval.tick() => {
                    self.run_once().await;
                }
            }
        }
    }

    async fn run_once(&self) {
        use crate::types::OpportunityStatus;

        let mut deleted = 0u64;

        match self.db.delete_by_status(OpportunityStatus::Expired).await {
            Ok(n) => deleted += n,
            Err(e) => warn!(error = %e, "cleanup: failed to delete expired opportunities"),
        }

        // Unconditional per-hour pending purge (spec §9 — preserved verbatim
        // even though it looks aggressive).
        match self.db.delete_by_status(OpportunityStatus::Pending).await {
            Ok(n) => deleted += n,
            Err(e) => warn!(error = %e, "cleanup: failed to delete pending opportunities"),
        }

        match self.db.delete_detected_marked_expired().await {
            Ok(n) => deleted += n,
            Err(e) => warn!(error = %e, "cleanup: failed to delete detected rows marked expired"),
        }

        deleted += self.sweep_stale_deadlines().await;

        info!(deleted, "cleanup pass complete");
    }

    /// Second pass over remaining `detected` rows: re-check `deadlineTimestamp`
    /// in process, since JSON-numeric comparison in the store is unreliable
    /// (spec §4.8 step 3).
    async fn sweep_stale_deadlines(&self) -> u64 {
        let now = chrono::Utc::now().timestamp();
        let remaining = match self.db.list_detected().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "cleanup: failed to list remaining detected opportunities");
                return 0;
            }
        };

        let mut deleted = 0u64;
        for opp in remaining {
            if opp.metadata.deadline_timestamp < now {
                match self.db.delete_opportunity(opp.chain_id, &opp.tx_hash).await {
                    Ok(()) => deleted += 1,
                    Err(e) => warn!(error = %e, tx_hash = %opp.tx_hash, "cleanup: failed to delete stale-deadline opportunity"),
                }
            }
        }
        deleted
    }
}
