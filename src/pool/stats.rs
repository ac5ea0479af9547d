//! Worker Pool Statistics

use serde::Serialize;

/// Counters and gauges of the worker pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolStats {
    /// Configured number of workers
    pub size: usize,
    /// Workers currently alive
    pub workers: usize,
    pub busy_workers: usize,
    pub queue_length: usize,
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub faults: u64,
    /// Workers replaced after a timeout or fault
    pub respawned: u64,
}
