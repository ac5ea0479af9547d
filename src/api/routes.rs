//! API Routes
//!
//! Configures the Axum router with all runtime endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, fetch_handler, get_handler, health_handler, network_handler,
    set_handler, stats_handler, task_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache` - Store a value
/// - `DELETE /cache` - Drop every entry
/// - `GET /cache/:key` - Read a value
/// - `DELETE /cache/:key` - Delete a value
/// - `POST /fetch` - Scheduled request, optionally read through the cache
/// - `POST /tasks` - Run a task on the worker pool
/// - `PUT /network` - Report connectivity
/// - `GET /stats` - Statistics of all components
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache", put(set_handler).delete(clear_handler))
        .route("/cache/:key", get(get_handler).delete(delete_handler))
        .route("/fetch", post(fetch_handler))
        .route("/tasks", post(task_handler))
        .route("/network", put(network_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
