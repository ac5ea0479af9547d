//! Scheduler Statistics

use serde::Serialize;

use crate::scheduler::ConnectionQuality;

/// Counters and gauges of the request scheduler.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStats {
    /// Calls accepted by `request`
    pub submitted: u64,
    /// High-priority calls executed without queueing
    pub executed_inline: u64,
    /// Calls that went through the batch queue
    pub queued: u64,
    /// Batch cycles run
    pub batches: u64,
    /// Groups answered by a batch endpoint
    pub batch_endpoint_hits: u64,
    /// Groups that fell back to individual requests
    pub batch_fallbacks: u64,
    /// Network attempts, including retries
    pub attempts: u64,
    /// Attempts that were retries
    pub retries: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Calls parked while offline
    pub parked: u64,
    /// Parked calls replayed after reconnecting
    pub replayed: u64,
    /// Parked calls that gave up waiting
    pub offline_timeouts: u64,
    /// Requests currently waiting for a batch cycle
    pub queue_length: usize,
    /// Requests currently waiting for connectivity
    pub parked_length: usize,
    pub online: bool,
    pub quality: ConnectionQuality,
}

impl SchedulerStats {
    /// Fraction of finished calls that succeeded.
    pub fn success_rate(&self) -> f64 {
        let total = self.succeeded + self.failed;
        if total == 0 {
            0.0
        } else {
            self.succeeded as f64 / total as f64
        }
    }
}
