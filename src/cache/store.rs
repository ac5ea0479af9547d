//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with score-based eviction,
//! size accounting and TTL expiration.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::entry::{current_timestamp_ms, estimate_size};
use crate::cache::eviction::{select_victims, SpaceNeeded};
use crate::cache::{CacheEntry, CacheStats};
use crate::config::CacheConfig;

// == Cache Store ==
/// Cache storage bounded by total size and entry count, with per-entry TTL.
///
/// Oversized entries are refused: an entry whose estimated size alone is
/// larger than `max_size` is never stored, so the size invariant holds after
/// every operation.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Performance statistics
    stats: CacheStats,
    /// Sum of estimated sizes of all live entries
    total_size: usize,
    /// Maximum total size in bytes
    max_size: usize,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// TTL for entries without explicit TTL
    default_ttl: Duration,
    /// Monotonic access counter
    sequence: u64,
}

impl<V: Serialize + Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore.
    ///
    /// # Arguments
    /// * `max_size` - Maximum total estimated size in bytes
    /// * `max_entries` - Maximum number of entries the cache can hold
    /// * `default_ttl` - TTL for entries stored without one
    pub fn new(max_size: usize, max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(max_size, max_entries),
            total_size: 0,
            max_size,
            max_entries,
            default_ttl,
            sequence: 0,
        }
    }

    /// Creates a CacheStore from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_size, config.max_entries, config.default_ttl)
    }

    // == Set ==
    /// Stores a value with optional TTL.
    ///
    /// Makes room before inserting: expired entries are dropped first, then
    /// the lowest-scoring entries are evicted. Returns false, leaving the
    /// cache untouched, if the entry can never fit.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL (uses default_ttl if None)
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> bool {
        let key = key.into();
        let size = estimate_size(&value);

        if size > self.max_size || self.max_entries == 0 {
            warn!(
                "Rejecting cache entry '{}': {} bytes exceeds limits (max_size={}, max_entries={})",
                key, size, self.max_size, self.max_entries
            );
            self.stats.record_rejection();
            return false;
        }

        self.make_room(&key, size);

        self.sequence += 1;
        let entry = CacheEntry::new(value, ttl.unwrap_or(self.default_ttl), size, self.sequence);
        if let Some(old) = self.entries.insert(key, entry) {
            self.total_size -= old.size;
        }
        self.total_size += size;
        self.sync_occupancy();

        true
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = current_timestamp_ms();

        if self.remove_if_expired(key, now) {
            self.stats.record_miss();
            return None;
        }

        self.sequence += 1;
        let sequence = self.sequence;
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(now, sequence);
                self.stats.record_hit();
                Some(entry.data.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Has ==
    /// Returns true if a live entry exists. Expired entries are removed.
    pub fn has(&mut self, key: &str) -> bool {
        if self.remove_if_expired(key, current_timestamp_ms()) {
            return false;
        }
        self.entries.contains_key(key)
    }

    // == Delete ==
    /// Removes an entry by key. Returns true if an entry was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.remove_entry(key);
        self.sync_occupancy();
        removed
    }

    // == Clear ==
    /// Removes every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_size = 0;
        self.sync_occupancy();
    }

    // == Batch Operations ==
    /// Reads several keys. Only hits appear in the result.
    pub fn get_batch<K: AsRef<str>>(&mut self, keys: &[K]) -> HashMap<String, V> {
        keys.iter()
            .filter_map(|key| {
                let key = key.as_ref();
                self.get(key).map(|value| (key.to_string(), value))
            })
            .collect()
    }

    /// Stores several entries. Returns the outcome of each `set` in order.
    pub fn set_batch<I>(&mut self, items: I) -> Vec<bool>
    where
        I: IntoIterator<Item = (String, V, Option<Duration>)>,
    {
        items
            .into_iter()
            .map(|(key, value, ttl)| self.set(key, value, ttl))
            .collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_occupancy(self.entries.len(), self.total_size);
        stats.hit_rate = stats.compute_hit_rate();
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        self.purge_expired(None)
    }

    // == Introspection ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the estimated size of all entries in bytes.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Returns all keys, including entries that expired but were not yet swept.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // == Internals ==
    fn make_room(&mut self, key: &str, size: usize) {
        let mut needed = self.space_needed(key, size);
        if needed.is_satisfied() {
            return;
        }

        if self.purge_expired(Some(key)) > 0 {
            needed = self.space_needed(key, size);
            if needed.is_satisfied() {
                return;
            }
        }

        let victims = select_victims(&self.entries, needed, Some(key));
        for victim in &victims {
            self.remove_entry(victim);
        }
        if !victims.is_empty() {
            debug!("Evicted {} entries to store '{}'", victims.len(), key);
            self.stats.record_evictions(victims.len());
        }
    }

    fn space_needed(&self, key: &str, size: usize) -> SpaceNeeded {
        let existing = self.entries.get(key).map(|e| e.size);
        let projected = self.total_size - existing.unwrap_or(0) + size;
        let slots = if existing.is_none() && self.entries.len() >= self.max_entries {
            self.entries.len() + 1 - self.max_entries
        } else {
            0
        };

        SpaceNeeded {
            bytes: projected.saturating_sub(self.max_size),
            slots,
        }
    }

    fn purge_expired(&mut self, protected: Option<&str>) -> usize {
        let now = current_timestamp_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, entry)| Some(key.as_str()) != protected && entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            self.remove_entry(&key);
        }

        self.stats.record_expirations(count);
        self.sync_occupancy();
        count
    }

    fn remove_if_expired(&mut self, key: &str, now: u64) -> bool {
        let expired = self
            .entries
            .get(key)
            .map(|entry| entry.is_expired_at(now))
            .unwrap_or(false);

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.sync_occupancy();
        }
        expired
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.total_size -= entry.size;
                true
            }
            None => false,
        }
    }

    fn sync_occupancy(&mut self) {
        self.stats.set_occupancy(self.entries.len(), self.total_size);
    }
}
