//! Error types for the runtime layer
//!
//! Provides unified error handling using thiserror. The scheduler and the
//! worker pool report failures through their own enums; the HTTP surface
//! wraps both in [`ApiError`].

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Request Error Enum ==
/// Failure of a scheduled network request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    /// Server answered with a non-success status
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// A single attempt exceeded its timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection could not be established or was reset
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request could not be built (bad URL, unserializable body)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Request was aborted on the client side
    #[error("Request aborted")]
    Aborted,

    /// Network stayed offline for the whole offline window
    #[error("Offline: connectivity did not return within {0:?}")]
    Offline(Duration),

    /// Response body did not match the expected type
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Scheduler was destroyed before the request completed
    #[error("Scheduler shut down before the request completed")]
    Shutdown,
}

impl RequestError {
    // == Retry Classification ==
    /// Returns true if another attempt may succeed.
    ///
    /// Client errors (4xx) are permanent except 408 and 429. Invalid
    /// requests, aborts and decode failures never retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            RequestError::Status { status, .. } => match *status {
                408 | 429 => true,
                400..=499 => false,
                _ => true,
            },
            RequestError::Timeout(_) | RequestError::Connection(_) => true,
            RequestError::InvalidRequest(_)
            | RequestError::Aborted
            | RequestError::Offline(_)
            | RequestError::Decode(_)
            | RequestError::Shutdown => false,
        }
    }
}

// == Task Error Enum ==
/// Failure of a worker pool task.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    /// Worker did not reply before the task timeout
    #[error("Task {task_id} timed out after {after:?}")]
    Timeout { task_id: u64, after: Duration },

    /// Task handler reported an error
    #[error("Task failed: {0}")]
    Failed(String),

    /// Worker crashed while running the task
    #[error("Worker {worker_id} faulted: {message}")]
    WorkerFault { worker_id: u64, message: String },

    /// Pool was destroyed before the task completed
    #[error("Worker pool shut down before the task completed")]
    Shutdown,
}

// == Api Error Enum ==
/// Error type for the HTTP surface.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Cache refused to store the entry
    #[error("Cache rejected entry: {0}")]
    Rejected(String),

    /// Scheduled request failed
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Worker task failed
    #[error(transparent)]
    Task(#[from] TaskError),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected(_) => StatusCode::INSUFFICIENT_STORAGE,
            ApiError::Request(err) => match err {
                RequestError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                RequestError::Offline(_) | RequestError::Shutdown => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                RequestError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            },
            ApiError::Task(err) => match err {
                TaskError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                TaskError::Failed(_) => StatusCode::UNPROCESSABLE_ENTITY,
                TaskError::Shutdown => StatusCode::SERVICE_UNAVAILABLE,
                TaskError::WorkerFault { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_permanent() {
        let err = RequestError::Status {
            status: 400,
            body: String::new(),
        };
        assert!(!err.is_retryable());
        assert!(!RequestError::Aborted.is_retryable());
        assert!(!RequestError::InvalidRequest("bad url".into()).is_retryable());
    }

    #[test]
    fn test_transient_errors_retry() {
        for status in [408, 429, 500, 503] {
            let err = RequestError::Status {
                status,
                body: String::new(),
            };
            assert!(err.is_retryable(), "status {} should retry", status);
        }
        assert!(RequestError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(RequestError::Connection("refused".into()).is_retryable());
    }

    #[test]
    fn test_api_error_status_mapping() {
        let response = ApiError::NotFound("k".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::from(TaskError::Timeout {
            task_id: 1,
            after: Duration::from_millis(10),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let response =
            ApiError::from(RequestError::Offline(Duration::from_secs(1))).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
