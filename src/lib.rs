//! Chat Runtime - resource layer for a chat assistant
//!
//! Provides a bounded, self-evicting cache, a network request scheduler with
//! retry, batching and offline parking, and a fixed-size worker pool.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod pool;
pub mod scheduler;
pub mod services;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::BoundedCache;
pub use config::Config;
pub use error::{ApiError, RequestError, TaskError};
pub use pool::{TaskKind, WorkerPool};
pub use scheduler::{HttpTransport, NetworkMonitor, RequestConfig, RequestScheduler};
pub use services::RuntimeServices;
