//! Response DTOs for the runtime API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::CacheStats;
use crate::pool::PoolStats;
use crate::scheduler::{ConnectionQuality, NetworkStatus, SchedulerStats};

/// Response body for GET /cache/:key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for PUT /cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetResponse {
    pub message: String,
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for DELETE /cache/:key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    /// Number of entries dropped
    pub removed: usize,
}

/// Response body for POST /fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub data: Value,
    /// True when served from the cache
    pub cached: bool,
}

/// Response body for POST /tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub result: Value,
}

/// Response body for PUT /network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkResponse {
    pub online: bool,
    pub quality: ConnectionQuality,
}

impl From<NetworkStatus> for NetworkResponse {
    fn from(status: NetworkStatus) -> Self {
        Self {
            online: status.online,
            quality: status.quality,
        }
    }
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub cache: CacheStats,
    pub scheduler: SchedulerStats,
    pub pool: PoolStats,
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" while online, "degraded" while offline
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub online: bool,
    pub quality: ConnectionQuality,
}

impl HealthResponse {
    pub fn from_status(status: NetworkStatus) -> Self {
        Self {
            status: if status.online { "healthy" } else { "degraded" }.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            online: status.online,
            quality: status.quality,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_response_keeps_json_value() {
        let resp = GetResponse::new("k", json!({"a": [1, 2]}));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value, json!({"key": "k", "value": {"a": [1, 2]}}));
    }

    #[test]
    fn test_set_and_delete_messages() {
        assert!(SetResponse::new("my_key").message.contains("set successfully"));
        assert!(DeleteResponse::new("my_key").message.contains("deleted"));
    }

    #[test]
    fn test_health_reflects_connectivity() {
        let resp = HealthResponse::from_status(NetworkStatus::online());
        assert_eq!(resp.status, "healthy");

        let resp = HealthResponse::from_status(NetworkStatus::offline());
        assert_eq!(resp.status, "degraded");
        assert_eq!(resp.quality, ConnectionQuality::Offline);
    }

    #[test]
    fn test_error_response_shape() {
        let resp: ErrorResponse =
            serde_json::from_value(json!({"error": "Something went wrong"})).unwrap();
        assert_eq!(resp.error, "Something went wrong");
    }
}
