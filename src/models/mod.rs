//! Request and Response models for the runtime API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{FetchRequest, NetworkRequest, SetRequest, TaskRequest};
pub use responses::{
    ClearResponse, DeleteResponse, ErrorResponse, FetchResponse, GetResponse, HealthResponse,
    NetworkResponse, SetResponse, StatsResponse, TaskResponse,
};
