//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and
//! memory usage.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries evicted to make room
    pub evictions: u64,
    /// Number of entries removed because their TTL elapsed
    pub expirations: u64,
    /// Number of inserts refused because the entry could never fit
    pub rejections: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Current estimated size of all entries in bytes
    pub total_size: usize,
    /// Configured size limit in bytes
    pub max_size: usize,
    /// Configured entry limit
    pub max_entries: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new(max_size: usize, max_entries: usize) -> Self {
        Self {
            max_size,
            max_entries,
            ..Self::default()
        }
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn compute_hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Utilization ==
    /// Fraction of the size limit in use.
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            self.total_size as f64 / self.max_size as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn record_rejection(&mut self) {
        self.rejections += 1;
    }

    // == Update Occupancy ==
    /// Updates the entry count and total size.
    pub fn set_occupancy(&mut self, entries: usize, size: usize) {
        self.total_entries = entries;
        self.total_size = size;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new(1024, 10);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.max_size, 1024);
        assert_eq!(stats.max_entries, 10);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new(1, 1);
        assert_eq!(stats.compute_hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new(1, 1);
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.compute_hit_rate(), 0.75);
    }

    #[test]
    fn test_counters_accumulate() {
        let mut stats = CacheStats::new(1, 1);
        stats.record_evictions(2);
        stats.record_evictions(1);
        stats.record_expirations(4);
        stats.record_rejection();
        assert_eq!(stats.evictions, 3);
        assert_eq!(stats.expirations, 4);
        assert_eq!(stats.rejections, 1);
    }

    #[test]
    fn test_utilization() {
        let mut stats = CacheStats::new(200, 10);
        stats.set_occupancy(3, 50);
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.utilization(), 0.25);
        assert_eq!(CacheStats::new(0, 0).utilization(), 0.0);
    }
}
