//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and access
//! bookkeeping.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::debug;

/// Size charged for a value whose serialized size cannot be estimated.
pub const DEFAULT_ENTRY_SIZE: usize = 1024;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub data: V,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Time-to-live in milliseconds
    pub ttl_ms: u64,
    /// Estimated size of the value in bytes
    pub size: usize,
    /// Number of successful reads
    pub access_count: u64,
    /// Last access timestamp (Unix milliseconds)
    pub last_accessed: u64,
    /// Store-wide access sequence, breaks ties between equal timestamps
    pub sequence: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `data` - The value to store
    /// * `ttl` - Lifetime of the entry
    /// * `size` - Estimated size in bytes
    /// * `sequence` - Current store access sequence
    pub fn new(data: V, ttl: Duration, size: usize, sequence: u64) -> Self {
        let now = current_timestamp_ms();

        Self {
            data,
            created_at: now,
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            size,
            access_count: 0,
            last_accessed: now,
            sequence,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has outlived its TTL at time `now`.
    ///
    /// An entry is expired once its age is strictly greater than its TTL.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now.saturating_sub(self.created_at) > self.ttl_ms
    }

    /// Checks if the entry has expired against the current clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Touch ==
    /// Records a read of the entry.
    pub fn touch(&mut self, now: u64, sequence: u64) {
        self.access_count += 1;
        self.last_accessed = now;
        self.sequence = sequence;
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        let age = current_timestamp_ms().saturating_sub(self.created_at);
        self.ttl_ms.saturating_sub(age)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Estimates the size of a value from its JSON serialization.
///
/// Values that fail to serialize are charged [`DEFAULT_ENTRY_SIZE`].
pub fn estimate_size<V: Serialize>(value: &V) -> usize {
    match serde_json::to_vec(value) {
        Ok(bytes) => bytes.len(),
        Err(err) => {
            debug!("Size estimation failed, using default size: {}", err);
            DEFAULT_ENTRY_SIZE
        }
    }
}
