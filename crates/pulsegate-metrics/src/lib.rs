//! Metrics collection and export for pulsegate.
//!
//! Unified metrics interface over the `metrics` crate facade. When the
//! `prometheus` feature is enabled, metrics are exported in Prometheus text
//! format from the gateway's `/metrics` endpoint.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pulsegate_metrics::{counter, gauge, histogram};
//!
//! counter!("pulsegate_grant_issued_total").increment(1);
//! gauge!("pulsegate_channel_connections_active").set(42.0);
//! histogram!("pulsegate_channel_broadcast_duration_seconds").record(0.003);
//! ```
//!
//! # Features
//!
//! - `prometheus`: Enable Prometheus metrics export
//! - `tracing`: Enable tracing span context propagation to metrics labels

mod definitions;
mod recorder;
mod snapshot;
pub mod tracing_integration;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
    snapshot::{MetricSnapshot, MetricType, MetricsSnapshot},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
