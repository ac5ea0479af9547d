//! Worker Messages
//!
//! Outbound: `{type, data, id}`. Inbound:
//! `{type: success|error|ready|fault, data, id, worker_id, timestamp}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pool::TaskKind;

pub type TaskId = u64;
pub type WorkerId = u64;

/// A task sent to one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    #[serde(flatten)]
    pub task: TaskKind,
    pub id: TaskId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    Success,
    Error,
    /// Worker started and can take work
    Ready,
    /// Handler panicked; the worker exits after sending this
    Fault,
}

/// A message from a worker to the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReply {
    #[serde(rename = "type")]
    pub kind: ReplyKind,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub id: Option<TaskId>,
    pub worker_id: WorkerId,
    pub timestamp: DateTime<Utc>,
}

impl WorkerReply {
    fn new(kind: ReplyKind, worker_id: WorkerId, id: Option<TaskId>, data: Value) -> Self {
        Self {
            kind,
            data,
            id,
            worker_id,
            timestamp: Utc::now(),
        }
    }

    pub fn ready(worker_id: WorkerId) -> Self {
        Self::new(ReplyKind::Ready, worker_id, None, Value::Null)
    }

    pub fn success(worker_id: WorkerId, id: TaskId, data: Value) -> Self {
        Self::new(ReplyKind::Success, worker_id, Some(id), data)
    }

    pub fn error(worker_id: WorkerId, id: TaskId, message: impl Into<String>) -> Self {
        Self::new(ReplyKind::Error, worker_id, Some(id), Value::String(message.into()))
    }

    pub fn fault(worker_id: WorkerId, id: TaskId, message: impl Into<String>) -> Self {
        Self::new(ReplyKind::Fault, worker_id, Some(id), Value::String(message.into()))
    }

    /// Text of an error or fault reply.
    pub fn message(&self) -> String {
        match &self.data {
            Value::String(message) => message.clone(),
            other => other.to_string(),
        }
    }
}
