//! Worker Pool Module
//!
//! Fixed-size pool of background workers for CPU-bound tasks.
//!
//! # Components
//! - `WorkerPool`: FIFO dispatch, per-task timeouts, worker replacement
//! - `TaskKind` / `TaskHandler`: What a worker runs and how
//! - `WorkerRequest` / `WorkerReply`: Messages between pool and workers

mod manager;
pub mod message;
mod stats;
mod task;
mod worker;

pub use manager::WorkerPool;
pub use message::{ReplyKind, WorkerReply, WorkerRequest};
pub use stats::PoolStats;
pub use task::{BuiltinTasks, TaskHandler, TaskKind};
