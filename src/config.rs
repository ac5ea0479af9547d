//! Configuration Module
//!
//! Handles loading and managing runtime configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Shortest allowed period for background loops.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Bounded cache parameters.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum total estimated size of all entries in bytes
    pub max_size: usize,
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// TTL for entries stored without an explicit TTL
    pub default_ttl: Duration,
    /// Interval between background sweeps of expired entries
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 50 * 1024 * 1024,
            max_entries: 1000,
            default_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Request scheduler parameters.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Base URL relative request paths are resolved against
    pub base_url: Option<String>,
    /// Retries per request when the call does not set its own
    pub max_retries: u32,
    /// First backoff delay; doubled on every further retry
    pub base_delay: Duration,
    /// Upper bound for a single backoff delay
    pub max_delay: Duration,
    /// Per-attempt timeout when the call does not set its own
    pub request_timeout: Duration,
    /// Maximum number of queued requests executed per batch cycle
    pub batch_size: usize,
    /// How long queued requests are buffered before a batch cycle
    pub batch_delay: Duration,
    /// Whether `{origin}/batch` is attempted before individual requests
    pub batch_endpoint: bool,
    /// How long a request made while offline waits for reconnection
    pub offline_timeout: Duration,
    /// Optional URL probed periodically to derive connectivity
    pub probe_url: Option<String>,
    /// Interval between connectivity probes
    pub probe_interval: Duration,
    /// Probe latency above which the connection counts as slow
    pub slow_threshold: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            batch_size: 10,
            batch_delay: Duration::from_millis(50),
            batch_endpoint: false,
            offline_timeout: Duration::from_secs(30),
            probe_url: None,
            probe_interval: Duration::from_secs(15),
            slow_threshold: Duration::from_millis(1500),
        }
    }
}

/// Worker pool parameters.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker contexts
    pub size: usize,
    /// Timeout for tasks submitted without their own
    pub task_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: num_cpus::get().max(1),
            task_timeout: Duration::from_secs(30),
        }
    }
}

/// Runtime configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Cache settings
    pub cache: CacheConfig,
    /// Scheduler settings
    pub scheduler: SchedulerConfig,
    /// Worker pool settings
    pub pool: PoolConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_MAX_SIZE` - Cache size limit in bytes (default: 52428800)
    /// - `CACHE_MAX_ENTRIES` - Cache entry limit (default: 1000)
    /// - `CACHE_DEFAULT_TTL_MS` - Default entry TTL (default: 300000)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Sweep frequency (default: 60000)
    /// - `SCHEDULER_BASE_URL` - Base for relative request URLs (default: unset)
    /// - `SCHEDULER_MAX_RETRIES` - Retries per request (default: 3)
    /// - `SCHEDULER_BASE_DELAY_MS` - First backoff delay (default: 1000)
    /// - `SCHEDULER_MAX_DELAY_MS` - Backoff cap (default: 30000)
    /// - `SCHEDULER_TIMEOUT_MS` - Per-attempt timeout (default: 10000)
    /// - `SCHEDULER_BATCH_SIZE` - Requests per batch (default: 10)
    /// - `SCHEDULER_BATCH_DELAY_MS` - Batch buffering window (default: 50)
    /// - `SCHEDULER_BATCH_ENDPOINT` - Use `{origin}/batch` (default: false)
    /// - `SCHEDULER_OFFLINE_TIMEOUT_MS` - Offline wait window (default: 30000)
    /// - `SCHEDULER_PROBE_URL` - Connectivity probe URL (default: unset)
    /// - `SCHEDULER_PROBE_INTERVAL_MS` - Probe frequency (default: 15000)
    /// - `SCHEDULER_SLOW_THRESHOLD_MS` - Slow connection latency (default: 1500)
    /// - `POOL_SIZE` - Worker count (default: number of CPUs)
    /// - `POOL_TASK_TIMEOUT_MS` - Default task timeout (default: 30000)
    pub fn from_env() -> Self {
        let cache_defaults = CacheConfig::default();
        let scheduler_defaults = SchedulerConfig::default();
        let pool_defaults = PoolConfig::default();

        Self {
            server_port: env_or("SERVER_PORT", 3000),
            cache: CacheConfig {
                max_size: env_or("CACHE_MAX_SIZE", cache_defaults.max_size),
                max_entries: env_or("CACHE_MAX_ENTRIES", cache_defaults.max_entries),
                default_ttl: env_ms("CACHE_DEFAULT_TTL_MS", cache_defaults.default_ttl),
                sweep_interval: env_ms("CACHE_SWEEP_INTERVAL_MS", cache_defaults.sweep_interval)
                    .max(MIN_INTERVAL),
            },
            scheduler: SchedulerConfig {
                base_url: env::var("SCHEDULER_BASE_URL").ok().filter(|v| !v.is_empty()),
                max_retries: env_or("SCHEDULER_MAX_RETRIES", scheduler_defaults.max_retries),
                base_delay: env_ms("SCHEDULER_BASE_DELAY_MS", scheduler_defaults.base_delay),
                max_delay: env_ms("SCHEDULER_MAX_DELAY_MS", scheduler_defaults.max_delay),
                request_timeout: env_ms("SCHEDULER_TIMEOUT_MS", scheduler_defaults.request_timeout),
                batch_size: env_or("SCHEDULER_BATCH_SIZE", scheduler_defaults.batch_size).max(1),
                batch_delay: env_ms("SCHEDULER_BATCH_DELAY_MS", scheduler_defaults.batch_delay),
                batch_endpoint: env_or("SCHEDULER_BATCH_ENDPOINT", scheduler_defaults.batch_endpoint),
                offline_timeout: env_ms(
                    "SCHEDULER_OFFLINE_TIMEOUT_MS",
                    scheduler_defaults.offline_timeout,
                ),
                probe_url: env::var("SCHEDULER_PROBE_URL").ok().filter(|v| !v.is_empty()),
                probe_interval: env_ms(
                    "SCHEDULER_PROBE_INTERVAL_MS",
                    scheduler_defaults.probe_interval,
                )
                .max(MIN_INTERVAL),
                slow_threshold: env_ms(
                    "SCHEDULER_SLOW_THRESHOLD_MS",
                    scheduler_defaults.slow_threshold,
                ),
            },
            pool: PoolConfig {
                size: env_or("POOL_SIZE", pool_defaults.size).max(1),
                task_timeout: env_ms("POOL_TASK_TIMEOUT_MS", pool_defaults.task_timeout),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache: CacheConfig::default(),
            scheduler: SchedulerConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

/// Parses an environment variable, falling back to `default` when unset or invalid.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses a millisecond environment variable into a Duration.
fn env_ms(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache.max_entries, 1000);
        assert_eq!(config.cache.default_ttl, Duration::from_secs(300));
        assert_eq!(config.scheduler.max_retries, 3);
        assert_eq!(config.scheduler.batch_size, 10);
        assert!(config.pool.size >= 1);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_MAX_ENTRIES");
        env::remove_var("SCHEDULER_BATCH_DELAY_MS");
        env::remove_var("SCHEDULER_BASE_URL");

        let config = Config::from_env();
        assert_eq!(config.cache.max_entries, 1000);
        assert_eq!(config.scheduler.batch_delay, Duration::from_millis(50));
        assert!(config.scheduler.base_url.is_none());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        env::set_var("POOL_TASK_TIMEOUT_MS", "not-a-number");
        let config = Config::from_env();
        assert_eq!(config.pool.task_timeout, Duration::from_secs(30));
        env::remove_var("POOL_TASK_TIMEOUT_MS");
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        env::set_var("CACHE_SWEEP_INTERVAL_MS", "0");
        env::set_var("SCHEDULER_PROBE_INTERVAL_MS", "0");

        let config = Config::from_env();
        assert_eq!(config.cache.sweep_interval, MIN_INTERVAL);
        assert_eq!(config.scheduler.probe_interval, MIN_INTERVAL);

        env::remove_var("CACHE_SWEEP_INTERVAL_MS");
        env::remove_var("SCHEDULER_PROBE_INTERVAL_MS");
    }
}
