//! Metric name definitions.
//!
//! Centralizing these names keeps exporter output, dashboards, and the
//! internal snapshot JSON view in agreement.

/// HTTP request metrics (grant issuance + health + metrics endpoints)
pub mod http {
    pub const REQUESTS_TOTAL: &str = "pulsegate_http_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "pulsegate_http_request_duration_seconds";
    pub const REQUESTS_IN_FLIGHT: &str = "pulsegate_http_requests_in_flight";
}

/// Grant issuance metrics
pub mod grant {
    pub const ISSUED_TOTAL: &str = "pulsegate_grant_issued_total";
    pub const CACHE_HITS_TOTAL: &str = "pulsegate_grant_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "pulsegate_grant_cache_misses_total";
    pub const RATE_LIMITED_TOTAL: &str = "pulsegate_grant_rate_limited_total";
    pub const RATE_LIMITER_FAILOPEN_TOTAL: &str = "pulsegate_grant_rate_limiter_failopen_total";
    pub const DENIED_TOTAL: &str = "pulsegate_grant_denied_total";
    pub const ISSUE_DURATION_SECONDS: &str = "pulsegate_grant_issue_duration_seconds";
}

/// WebSocket connection / channel actor metrics
pub mod channel {
    pub const CONNECTIONS_TOTAL: &str = "pulsegate_channel_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "pulsegate_channel_connections_active";
    pub const CHANNELS_ACTIVE: &str = "pulsegate_channel_actors_active";
    pub const SUBSCRIPTIONS_ACTIVE: &str = "pulsegate_channel_subscriptions_active";
    pub const PUBLISH_TOTAL: &str = "pulsegate_channel_publish_total";
    pub const PUBLISH_REJECTED_TOTAL: &str = "pulsegate_channel_publish_rejected_total";
    pub const FANOUT_TARGETS_TOTAL: &str = "pulsegate_channel_fanout_targets_total";
    pub const BROADCAST_DURATION_SECONDS: &str = "pulsegate_channel_broadcast_duration_seconds";
    pub const CLOSE_TOTAL: &str = "pulsegate_channel_close_total";
}

/// Usage shipper metrics
pub mod usage {
    pub const EVENTS_BUFFERED_TOTAL: &str = "pulsegate_usage_events_buffered_total";
    pub const FLUSH_TOTAL: &str = "pulsegate_usage_flush_total";
    pub const FLUSH_FAILED_TOTAL: &str = "pulsegate_usage_flush_failed_total";
    pub const FLUSH_DROPPED_TOTAL: &str = "pulsegate_usage_flush_dropped_total";
    pub const FLUSH_DURATION_SECONDS: &str = "pulsegate_usage_flush_duration_seconds";
}

/// Histogram bucket sets, grouped for `set_buckets_for_metric` calls.
pub mod buckets {
    pub const HTTP_DURATION: [f64; 9] = [0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];
    pub const BROADCAST_DURATION: [f64; 8] =
        [0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1];
    pub const FLUSH_DURATION: [f64; 7] = [0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0];
}
