//! Batch Endpoint Wire Format
//!
//! `POST {origin}/batch` takes `{requests: [...]}` and answers
//! `{results: [...]}` in request order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RequestError;
use crate::scheduler::{Method, PreparedRequest};

/// Path of the batch endpoint on every origin.
pub const BATCH_PATH: &str = "/batch";

// == Envelope ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEnvelope {
    pub requests: Vec<BatchItem>,
}

/// One request inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: u64,
    pub method: Method,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl From<&PreparedRequest> for BatchItem {
    fn from(request: &PreparedRequest) -> Self {
        Self {
            id: request.id,
            method: request.method,
            path: request.path(),
            data: request.data.clone(),
            headers: request.headers.clone(),
        }
    }
}

impl BatchEnvelope {
    pub fn from_requests<'a, I>(requests: I) -> Self
    where
        I: IntoIterator<Item = &'a PreparedRequest>,
    {
        Self {
            requests: requests.into_iter().map(BatchItem::from).collect(),
        }
    }
}

// == Reply ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReply {
    pub results: Vec<BatchResult>,
}

/// Outcome of one batched request. A missing status means success.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResult {
    pub fn ok(data: Value) -> Self {
        Self {
            status: Some(200),
            data,
            error: None,
        }
    }

    pub fn failed(status: u16, error: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            data: Value::Null,
            error: Some(error.into()),
        }
    }

    /// Converts the item into the caller's result.
    pub fn into_result(self) -> Result<Value, RequestError> {
        let status = self.status.unwrap_or(200);
        match self.error {
            None if (200..300).contains(&status) => Ok(self.data),
            error => Err(RequestError::Status {
                status: if (200..300).contains(&status) { 500 } else { status },
                body: error.unwrap_or_else(|| self.data.to_string()),
            }),
        }
    }
}

// == Grouping ==
/// Groups requests by origin, keeping first-seen group order and the
/// submission order inside each group.
pub fn group_by_origin<T, F>(items: Vec<T>, origin_of: F) -> Vec<(String, Vec<T>)>
where
    F: Fn(&T) -> String,
{
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();
    for item in items {
        let origin = origin_of(&item);
        match groups.iter_mut().find(|(key, _)| *key == origin) {
            Some((_, members)) => members.push(item),
            None => groups.push((origin, vec![item])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::RequestConfig;
    use serde_json::json;
    use std::time::Duration;

    fn prepared(id: u64, url: &str) -> PreparedRequest {
        PreparedRequest::resolve(id, RequestConfig::get(url), None, 0, Duration::from_secs(1))
            .unwrap()
    }

    #[test]
    fn test_envelope_wire_shape() {
        let request = PreparedRequest::resolve(
            7,
            RequestConfig::post("http://h/docs?limit=5", json!({"q": 1})).with_header("x-a", "b"),
            None,
            0,
            Duration::from_secs(1),
        )
        .unwrap();

        let envelope = BatchEnvelope::from_requests([&request]);
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value,
            json!({
                "requests": [{
                    "id": 7,
                    "method": "POST",
                    "path": "/docs?limit=5",
                    "data": {"q": 1},
                    "headers": {"x-a": "b"}
                }]
            })
        );
    }

    #[test]
    fn test_reply_parses_partial_fields() {
        let reply: BatchReply = serde_json::from_value(json!({
            "results": [{"data": {"ok": true}}, {"status": 404, "error": "missing"}]
        }))
        .unwrap();

        let mut results = reply.results.into_iter();
        assert_eq!(results.next().unwrap().into_result(), Ok(json!({"ok": true})));
        assert!(matches!(
            results.next().unwrap().into_result(),
            Err(RequestError::Status { status: 404, .. })
        ));
    }

    #[test]
    fn test_error_with_success_status_is_failure() {
        let result = BatchResult {
            status: Some(200),
            data: Value::Null,
            error: Some("boom".into()),
        };
        assert!(matches!(
            result.into_result(),
            Err(RequestError::Status { status: 500, .. })
        ));
    }

    #[test]
    fn test_group_by_origin_keeps_order() {
        let requests = vec![
            prepared(1, "http://a/1"),
            prepared(2, "http://b/1"),
            prepared(3, "http://a/2"),
        ];

        let groups = group_by_origin(requests, |r| r.origin());

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "http://a");
        assert_eq!(groups[0].1.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(groups[1].0, "http://b");
    }
}
