//! Request Scheduler Module
//!
//! Outbound network calls with retry, priority batching and offline parking.
//!
//! # Components
//! - `RequestScheduler`: Admission, batching, retry and replay
//! - `Transport`: One attempt on the wire (`HttpTransport` uses reqwest)
//! - `NetworkMonitor`: Observable online/offline state and quality
//! - `RetryPolicy`: Exponential backoff between attempts

pub mod batch;
mod dispatcher;
#[cfg(test)]
pub(crate) mod mock;
mod network;
mod request;
mod retry;
mod stats;
mod transport;

pub use batch::{BatchEnvelope, BatchItem, BatchReply, BatchResult, BATCH_PATH};
pub use dispatcher::RequestScheduler;
pub use network::{ConnectionQuality, NetworkMonitor, NetworkStatus};
pub use request::{Method, PreparedRequest, Priority, RequestConfig};
pub use retry::RetryPolicy;
pub use stats::SchedulerStats;
pub use transport::{HttpTransport, Transport};
