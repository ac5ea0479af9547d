//! Request Types
//!
//! Describes outbound calls as submitted by callers and as resolved for
//! execution.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::RequestError;

// == Method ==
/// HTTP method of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

// == Priority ==
/// Scheduling priority. High executes inline, the others are batched.
///
/// Ordering is `Low < Normal < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

// == Request Config ==
/// A call as submitted to the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Absolute URL, or a path resolved against the scheduler's base URL
    pub url: String,
    #[serde(default)]
    pub method: Method,
    /// JSON body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Retries after the first attempt; scheduler default when None
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    /// Per-attempt timeout in milliseconds; scheduler default when None
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub priority: Priority,
}

impl RequestConfig {
    /// Creates a request with the given method.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            ..Self::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, data: Value) -> Self {
        Self::new(Method::Post, url).with_data(data)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

// == Prepared Request ==
/// A request with its URL resolved and defaults applied, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    /// Scheduler-assigned id; also the submission order
    pub id: u64,
    pub url: Url,
    pub method: Method,
    pub data: Option<Value>,
    pub headers: BTreeMap<String, String>,
    pub max_retries: u32,
    pub timeout: Duration,
    pub priority: Priority,
}

impl PreparedRequest {
    /// Resolves a submitted config.
    ///
    /// Relative URLs are joined onto `base_url`. Unresolvable URLs fail with
    /// [`RequestError::InvalidRequest`].
    pub fn resolve(
        id: u64,
        config: RequestConfig,
        base_url: Option<&str>,
        default_retries: u32,
        default_timeout: Duration,
    ) -> Result<Self, RequestError> {
        let url = resolve_url(&config.url, base_url)?;

        Ok(Self {
            id,
            url,
            method: config.method,
            data: config.data,
            headers: config.headers,
            max_retries: config.retries.unwrap_or(default_retries),
            timeout: config
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(default_timeout),
            priority: config.priority,
        })
    }

    /// Returns `scheme://host[:port]`, the batching group key.
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// Returns the path and query relative to the origin.
    pub fn path(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }
}

fn resolve_url(raw: &str, base_url: Option<&str>) -> Result<Url, RequestError> {
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = base_url.ok_or_else(|| {
                RequestError::InvalidRequest(format!("relative URL '{}' without base URL", raw))
            })?;
            Url::parse(base)
                .and_then(|base| base.join(raw))
                .map_err(|e| RequestError::InvalidRequest(format!("{}: {}", raw, e)))
        }
        Err(e) => Err(RequestError::InvalidRequest(format!("{}: {}", raw, e))),
    }
}
