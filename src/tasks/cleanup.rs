//! TTL Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::config::MIN_INTERVAL;

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between cleanup runs. The store lock is held only for the sweep itself.
///
/// # Arguments
/// * `cache` - Shared reference to the cache store
/// * `interval` - Time between cleanup runs
///
/// # Returns
/// A JoinHandle for the spawned task, which the owning cache aborts on
/// `destroy()`.
pub fn spawn_cleanup_task<V>(cache: Arc<Mutex<CacheStore<V>>>, interval: Duration) -> JoinHandle<()>
where
    V: Serialize + Clone + Send + 'static,
{
    let interval = interval.max(MIN_INTERVAL);
    tokio::spawn(async move {
        info!("Starting TTL cleanup task with interval of {:?}", interval);

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(interval).await;

            let removed = cache.lock().cleanup_expired();

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
