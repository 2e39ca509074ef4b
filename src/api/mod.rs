//! API layer
//!
//! HTTP handlers for:
//! - ConnectHub REST API under `/api`
//! - Metrics (Prometheus)

mod dto;
pub mod metrics;
mod rest;

pub use dto::*;

pub use metrics::metrics_router;
pub use rest::rest_api_router;
