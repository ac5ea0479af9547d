//! Background Tasks Module
//!
//! Long-running tasks owned by the runtime components.
//!
//! # Tasks
//! - TTL Sweep: Removes expired cache entries at configured intervals
//! - Connectivity Probe: Measures reachability and latency of a probe URL

mod cleanup;
mod probe;

pub use cleanup::spawn_cleanup_task;
pub use probe::{probe_once, spawn_connectivity_probe};
