//! Bounded Cache Service
//!
//! Thread-safe cache service owning a [`CacheStore`] and its background sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{CacheStats, CacheStore};
use crate::config::CacheConfig;
use crate::tasks::spawn_cleanup_task;

// == Bounded Cache ==
/// Long-lived cache service with explicit lifecycle.
///
/// Every operation is synchronous and never suspends. `init()` starts the
/// periodic sweep of expired entries, `destroy()` stops it and drops all
/// entries. Cloning shares the same underlying store.
#[derive(Clone)]
pub struct BoundedCache<V> {
    store: Arc<Mutex<CacheStore<V>>>,
    sweep: Arc<Mutex<Option<JoinHandle<()>>>>,
    sweep_interval: Duration,
}

impl<V> BoundedCache<V>
where
    V: Serialize + Clone + Send + 'static,
{
    /// Creates a cache from configuration. The sweep is not started yet.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(CacheStore::from_config(config))),
            sweep: Arc::new(Mutex::new(None)),
            sweep_interval: config.sweep_interval,
        }
    }

    // == Lifecycle ==
    /// Starts the background sweep. Calling it twice is a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn init(&self) {
        let mut sweep = self.sweep.lock();
        if sweep.is_none() {
            *sweep = Some(spawn_cleanup_task(self.store.clone(), self.sweep_interval));
        }
    }

    /// Stops the sweep and removes every entry.
    pub fn destroy(&self) {
        if let Some(handle) = self.sweep.lock().take() {
            handle.abort();
        }
        self.store.lock().clear();
        info!("Cache destroyed");
    }

    /// Returns true while the background sweep is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweep
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    // == Operations ==
    /// Stores a value. See [`CacheStore::set`].
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> bool {
        self.store.lock().set(key, value, ttl)
    }

    /// Reads a value, or None on miss or expiry.
    pub fn get(&self, key: &str) -> Option<V> {
        self.store.lock().get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.store.lock().has(key)
    }

    pub fn delete(&self, key: &str) -> bool {
        self.store.lock().delete(key)
    }

    pub fn clear(&self) {
        self.store.lock().clear();
    }

    pub fn get_batch<K: AsRef<str>>(&self, keys: &[K]) -> HashMap<String, V> {
        self.store.lock().get_batch(keys)
    }

    pub fn set_batch<I>(&self, items: I) -> Vec<bool>
    where
        I: IntoIterator<Item = (String, V, Option<Duration>)>,
    {
        self.store.lock().set_batch(items)
    }

    /// Removes expired entries now, without waiting for the sweep.
    pub fn cleanup_expired(&self) -> usize {
        self.store.lock().cleanup_expired()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }
}
