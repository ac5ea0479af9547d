//! Request DTOs for the runtime API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::pool::TaskKind;
use crate::scheduler::{ConnectionQuality, RequestConfig};

/// Longest accepted cache key.
pub const MAX_KEY_LENGTH: usize = 256;

fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}

/// Request body for PUT /cache
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    /// Any JSON value
    pub value: Value,
    /// Optional TTL in milliseconds (cache default if not specified)
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

impl SetRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }
}

/// Request body for POST /fetch
///
/// With a `cache_key` the response is served from and stored in the cache.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchRequest {
    pub request: RequestConfig,
    #[serde(default)]
    pub cache_key: Option<String>,
    #[serde(default)]
    pub cache_ttl_ms: Option<u64>,
}

impl FetchRequest {
    pub fn validate(&self) -> Option<String> {
        if self.request.url.is_empty() {
            return Some("Request URL cannot be empty".to_string());
        }
        self.cache_key.as_deref().and_then(validate_key)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_ms.map(Duration::from_millis)
    }
}

/// Request body for POST /tasks
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRequest {
    pub task: TaskKind,
    /// Optional timeout in milliseconds (pool default if not specified)
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl TaskRequest {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Request body for PUT /network
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkRequest {
    #[serde(default)]
    pub online: Option<bool>,
    #[serde(default)]
    pub quality: Option<ConnectionQuality>,
}

impl NetworkRequest {
    pub fn validate(&self) -> Option<String> {
        if self.online.is_none() && self.quality.is_none() {
            return Some("Expected at least one of 'online' or 'quality'".to_string());
        }
        None
    }
}
