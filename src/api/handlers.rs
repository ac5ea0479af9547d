//! API Handlers
//!
//! HTTP request handlers for each runtime endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, FetchRequest, FetchResponse, GetResponse, HealthResponse,
    NetworkRequest, NetworkResponse, SetRequest, SetResponse, StatsResponse, TaskRequest,
    TaskResponse,
};
use crate::services::RuntimeServices;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<RuntimeServices>,
}

impl AppState {
    pub fn new(services: RuntimeServices) -> Self {
        Self {
            services: Arc::new(services),
        }
    }

    /// Builds the services from configuration with an HTTP transport.
    pub fn from_config(config: Config) -> Self {
        Self::new(RuntimeServices::from_config(config))
    }
}

// == Cache ==
/// Handler for PUT /cache
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl();
    if !state.services.cache().set(req.key.clone(), req.value, ttl) {
        return Err(ApiError::Rejected(req.key));
    }

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .services
        .cache()
        .get(&key)
        .ok_or_else(|| ApiError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.services.cache().delete(&key) {
        return Err(ApiError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let cache = state.services.cache();
    let removed = cache.len();
    cache.clear();

    Json(ClearResponse { removed })
}

// == Scheduler ==
/// Handler for POST /fetch
pub async fn fetch_handler(
    State(state): State<AppState>,
    Json(req): Json<FetchRequest>,
) -> Result<Json<FetchResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let ttl = req.cache_ttl();
    let (data, cached) = match req.cache_key {
        Some(key) => state.services.fetch_cached(&key, req.request, ttl).await?,
        None => (state.services.scheduler().request_value(req.request).await?, false),
    };
    debug!("fetch answered (cached={})", cached);

    Ok(Json(FetchResponse { data, cached }))
}

/// Handler for PUT /network
pub async fn network_handler(
    State(state): State<AppState>,
    Json(req): Json<NetworkRequest>,
) -> Result<Json<NetworkResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let network = state.services.network();
    if let Some(quality) = req.quality {
        network.set_quality(quality);
    }
    if let Some(online) = req.online {
        network.set_online(online);
    }

    Ok(Json(network.status().into()))
}

// == Worker Pool ==
/// Handler for POST /tasks
pub async fn task_handler(
    State(state): State<AppState>,
    Json(req): Json<TaskRequest>,
) -> Result<Json<TaskResponse>> {
    let timeout = req.timeout();
    let result = state.services.pool().execute_task(req.task, timeout).await?;

    Ok(Json(TaskResponse { result }))
}

// == Observability ==
/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let services = &state.services;
    Json(StatsResponse {
        cache: services.cache().stats(),
        scheduler: services.scheduler().stats(),
        pool: services.pool().stats(),
    })
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_status(state.services.network().status()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::TaskKind;
    use crate::scheduler::mock::ScriptedTransport;
    use crate::scheduler::{ConnectionQuality, RequestConfig};
    use serde_json::json;

    fn test_state() -> AppState {
        let mut config = Config::default();
        config.scheduler.base_url = Some("http://api.test".to_string());
        config.scheduler.batch_delay = std::time::Duration::from_millis(5);
        config.pool.size = 1;
        AppState::new(RuntimeServices::with_transport(
            config,
            Arc::new(ScriptedTransport::new()),
        ))
    }

    fn set_request(key: &str, value: serde_json::Value) -> SetRequest {
        SetRequest {
            key: key.to_string(),
            value,
            ttl_ms: None,
        }
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let result = set_handler(State(state.clone()), Json(set_request("k", json!([1, 2])))).await;
        assert!(result.is_ok());

        let response = get_handler(State(state), Path("k".to_string())).await.unwrap();
        assert_eq!(response.value, json!([1, 2]));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let result = get_handler(State(test_state()), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state();
        let stored = set_handler(State(state.clone()), Json(set_request("to_delete", json!(1))))
            .await
            .unwrap();
        assert_eq!(stored.key, "to_delete");

        let result = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(result.is_ok());

        let result = delete_handler(State(state), Path("to_delete".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let result = set_handler(State(test_state()), Json(set_request("", json!(1)))).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_clear_handler() {
        let state = test_state();
        let stored = set_handler(State(state.clone()), Json(set_request("a", json!(1))))
            .await
            .unwrap();
        assert_eq!(stored.key, "a");

        let response = clear_handler(State(state.clone())).await;
        assert_eq!(response.removed, 1);
        assert!(state.services.cache().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_handler_caches() {
        let state = test_state();
        let req = || FetchRequest {
            request: RequestConfig::get("/docs"),
            cache_key: Some("docs".to_string()),
            cache_ttl_ms: None,
        };

        let first = fetch_handler(State(state.clone()), Json(req())).await.unwrap();
        let second = fetch_handler(State(state), Json(req())).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.data, json!({"path": "/docs"}));
    }

    #[tokio::test]
    async fn test_task_handler() {
        let req = TaskRequest {
            task: TaskKind::TextStats {
                text: "one two".into(),
            },
            timeout_ms: None,
        };

        let response = task_handler(State(test_state()), Json(req)).await.unwrap();
        assert_eq!(response.result["words"], 2);
    }

    #[tokio::test]
    async fn test_network_and_health_handlers() {
        let state = test_state();

        let req = NetworkRequest {
            online: None,
            quality: Some(ConnectionQuality::Slow),
        };
        let response = network_handler(State(state.clone()), Json(req)).await.unwrap();
        assert!(response.online);
        assert_eq!(response.quality, ConnectionQuality::Slow);

        let req = NetworkRequest {
            online: Some(false),
            quality: None,
        };
        let response = network_handler(State(state.clone()), Json(req)).await.unwrap();
        assert!(!response.online);

        let health = health_handler(State(state)).await;
        assert_eq!(health.status, "degraded");
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        get_handler(State(state.clone()), Path("missing".to_string()))
            .await
            .ok();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.cache.misses, 1);
        assert_eq!(response.pool.submitted, 0);
    }
}
