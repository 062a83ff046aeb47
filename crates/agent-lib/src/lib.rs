//! Agent library for node-local pod eviction
//!
//! This crate provides the core functionality for:
//! - Observing node memory and filesystem pressure from stats summaries
//! - Threshold bookkeeping with soft/hard semantics and transition dampening
//! - QoS-aware pod ranking and eviction
//! - Admission gating while pressure persists
//! - Health checks and observability

pub mod clock;
pub mod events;
pub mod eviction;
pub mod health;
pub mod models;
pub mod observability;
pub mod qos;
pub mod quantity;
pub mod registry;
pub mod stats;

pub use health::{HealthResponse, HealthStatus, HealthTracker, ReadinessResponse};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
pub use quantity::Quantity;
