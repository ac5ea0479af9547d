//! Scripted transport for scheduler tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::error::RequestError;
use crate::scheduler::batch::{BatchEnvelope, BatchReply, BatchResult};
use crate::scheduler::{PreparedRequest, Transport};

/// Records every call and answers from per-path scripts. Unscripted calls
/// echo `{"path": ...}`; batches echo each item with `"batched": true`.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Result<Value, RequestError>>>>,
    batch_reply: Mutex<Option<Result<BatchReply, RequestError>>>,
    calls: Mutex<Vec<String>>,
    call_times: Mutex<Vec<Instant>>,
    batch_calls: Mutex<Vec<(String, BatchEnvelope)>>,
    delay: Duration,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every individual call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push_response(&self, path: &str, response: Result<Value, RequestError>) {
        self.scripts
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn set_batch_reply(&self, reply: Result<BatchReply, RequestError>) {
        *self.batch_reply.lock() = Some(reply);
    }

    /// Paths of individual calls in the order they started.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// When each individual call started, on the tokio clock.
    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().clone()
    }

    pub fn call_count(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|p| *p == path).count()
    }

    pub fn batch_calls(&self) -> Vec<(String, BatchEnvelope)> {
        self.batch_calls.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<Value, RequestError> {
        let path = request.path();
        self.calls.lock().push(path.clone());
        self.call_times.lock().push(Instant::now());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self
            .scripts
            .lock()
            .get_mut(&path)
            .and_then(|script| script.pop_front());
        scripted.unwrap_or_else(|| Ok(json!({ "path": path })))
    }

    async fn send_batch(
        &self,
        origin: &str,
        batch: &BatchEnvelope,
    ) -> Result<BatchReply, RequestError> {
        self.batch_calls
            .lock()
            .push((origin.to_string(), batch.clone()));

        if let Some(reply) = self.batch_reply.lock().clone() {
            return reply;
        }
        Ok(BatchReply {
            results: batch
                .requests
                .iter()
                .map(|item| BatchResult::ok(json!({ "path": item.path, "batched": true })))
                .collect(),
        })
    }
}
