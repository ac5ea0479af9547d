//! API Module
//!
//! HTTP handlers and routing for the runtime service REST API.
//!
//! # Endpoints
//! - `PUT /cache`, `DELETE /cache` - Store a value, clear the cache
//! - `GET /cache/:key`, `DELETE /cache/:key` - Read or delete a value
//! - `POST /fetch` - Scheduled outbound request
//! - `POST /tasks` - Worker pool task
//! - `PUT /network` - Connectivity signal
//! - `GET /stats` - Statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
