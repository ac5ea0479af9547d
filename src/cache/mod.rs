//! Cache Module
//!
//! Provides an in-memory cache bounded by total size and entry count, with
//! per-entry TTL expiration and recency/frequency eviction.

mod bounded;
mod entry;
mod eviction;
mod stats;
mod store;


// Re-export public types
pub use bounded::BoundedCache;
pub use entry::{current_timestamp_ms, estimate_size, CacheEntry, DEFAULT_ENTRY_SIZE};
pub use eviction::{eviction_score, select_victims, SpaceNeeded, FREQUENCY_WEIGHT_MS};
pub use stats::CacheStats;
pub use store::CacheStore;
