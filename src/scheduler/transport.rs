//! Transport
//!
//! The seam between the scheduler and the network. [`HttpTransport`] speaks
//! HTTP through reqwest.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

use crate::error::RequestError;
use crate::scheduler::batch::{BatchEnvelope, BatchReply, BATCH_PATH};
use crate::scheduler::PreparedRequest;

/// Executes single attempts. Retries, timeouts and batching live in the
/// scheduler, not here.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one attempt and returns the JSON response body.
    async fn send(&self, request: &PreparedRequest) -> Result<Value, RequestError>;

    /// Posts a batch to `{origin}/batch`.
    async fn send_batch(
        &self,
        origin: &str,
        batch: &BatchEnvelope,
    ) -> Result<BatchReply, RequestError>;
}

// == HTTP Transport ==
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<Value, RequestError> {
        trace!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method.into(), request.url.clone())
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(data) = &request.data {
            builder = builder.json(data);
        }

        let timeout = request.timeout;
        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;
        read_body(response, timeout).await
    }

    async fn send_batch(
        &self,
        origin: &str,
        batch: &BatchEnvelope,
    ) -> Result<BatchReply, RequestError> {
        let url = format!("{}{}", origin, BATCH_PATH);
        trace!("POST {} ({} requests)", url, batch.requests.len());

        let response = self
            .client
            .post(&url)
            .json(batch)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, Duration::ZERO))?;

        let body = read_body(response, Duration::ZERO).await?;
        serde_json::from_value(body).map_err(|e| RequestError::Decode(e.to_string()))
    }
}

/// Reads a response body. Non-2xx becomes [`RequestError::Status`]; an empty
/// body is `null`; a non-JSON body is returned as a string.
async fn read_body(response: reqwest::Response, timeout: Duration) -> Result<Value, RequestError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| map_reqwest_error(e, timeout))?;

    if !status.is_success() {
        return Err(RequestError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> RequestError {
    if err.is_timeout() {
        RequestError::Timeout(timeout)
    } else if err.is_builder() {
        RequestError::InvalidRequest(err.to_string())
    } else if let Some(status) = err.status() {
        RequestError::Status {
            status: status.as_u16(),
            body: err.to_string(),
        }
    } else {
        RequestError::Connection(err.to_string())
    }
}
