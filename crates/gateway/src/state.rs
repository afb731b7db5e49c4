//! Shared application state handed to every axum handler. Every field is
//! already an `Arc` internally (or cheap to clone), so `AppState` itself
//! derives `Clone` rather than being wrapped in an outer `Arc` — the same
//! shape the gateway this workspace grew out of uses for its own state.

use {
    pulsegate_channel::ChannelRegistry,
    pulsegate_grants::GrantIssuer,
    std::sync::{
        atomic::{AtomicBool, AtomicUsize},
        Arc,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<GrantIssuer>,
    pub registry: Arc<ChannelRegistry>,
    /// Live WebSocket connection count across every channel, reported by
    /// `/health`. The channel registry only tracks actor count, not
    /// per-actor connections, so the gateway keeps this tally itself.
    pub active_connections: Arc<AtomicUsize>,
    /// Flipped once on shutdown so `/v1/pubsub` stops accepting new
    /// upgrades while channel actors drain their existing connections.
    pub draining: Arc<AtomicBool>,
    #[cfg(feature = "prometheus")]
    pub metrics: pulsegate_metrics::MetricsHandle,
    pub version: &'static str,
}
