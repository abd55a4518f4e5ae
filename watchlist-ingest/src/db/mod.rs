//! SQLite implementations of the store and directory traits

mod records;

pub mod directory;
pub mod family;
pub mod outbox;
pub mod runs;
pub mod staging;
pub mod watchlist;

pub use directory::{load_enabled_source_keys, SqliteRegulatorDirectory, SqliteSubscriberDirectory};
pub use family::SqliteRelationshipStore;
pub use outbox::SqliteOutboxNotifier;
pub use runs::SqliteRunLog;
pub use staging::SqliteStagingStore;
pub use watchlist::SqliteCanonicalStore;

use sqlx::SqlitePool;
use watchlist_common::db::{load_setting, DEFAULT_MAX_LOCK_WAIT_MS, MAX_LOCK_WAIT_SETTING};

/// `max_lock_wait_ms` from the settings table, or the default
pub async fn max_lock_wait_ms(pool: &SqlitePool) -> u64 {
    match load_setting::<u64>(pool, MAX_LOCK_WAIT_SETTING).await {
        Ok(Some(ms)) => ms,
        Ok(None) => DEFAULT_MAX_LOCK_WAIT_MS,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read {}, using default", MAX_LOCK_WAIT_SETTING);
            DEFAULT_MAX_LOCK_WAIT_MS
        }
    }
}
