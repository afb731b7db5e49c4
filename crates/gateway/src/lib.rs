//! HTTP + WebSocket gateway binary: grant issuance, the pub/sub upgrade,
//! health, and (with the `prometheus` feature) metrics export. The binary
//! entry point is `main.rs`; this crate root only declares modules so
//! integration tests can exercise the router without going through a
//! spawned process.

pub mod app;
pub mod grant_routes;
#[cfg(feature = "prometheus")]
pub mod metrics_routes;
pub mod state;
pub mod ws;
