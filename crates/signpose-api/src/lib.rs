//! Axum HTTP API for sign animation.
//!
//! This crate provides:
//! - `POST /api/animate` backed by an on-disk artifact cache
//! - Vocabulary listing and static serving of generated videos
//! - Request logging, request IDs and Prometheus metrics

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use cache::{ArtifactCache, ArtifactKey, Cached};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
