//! `GET /metrics`: Prometheus text exposition, only wired in when the
//! `prometheus` feature is compiled in.

use {crate::state::AppState, axum::extract::State};

pub async fn prometheus_metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}
