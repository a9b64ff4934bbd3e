use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use crate::db::UserStore;

const PURGE_PERIOD: Duration = Duration::from_secs(60 * 60 * 24);
const UNVERIFIED_MAX_AGE_HOURS: i64 = 24;

/// Spawns the daily purge of stale unverified accounts.
///
/// Accounts that never complete email verification within 24 hours are
/// deleted so abandoned signups do not squat usernames and addresses.
pub fn spawn_unverified_purge(store: UserStore) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(PURGE_PERIOD);

        loop {
            ticker.tick().await;

            let cutoff = Utc::now() - chrono::Duration::hours(UNVERIFIED_MAX_AGE_HOURS);
            match store.delete_unverified_before(cutoff).await {
                Ok(deleted) => {
                    tracing::info!(deleted = deleted, "Purged unverified users older than 24h");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Unverified user purge failed");
                }
            }
        }
    })
}
