//! Router assembly: routes, CORS, and the shared middleware stack. Layer
//! ordering and the CORS same-origin predicate are grounded on this
//! workspace's existing gateway binary; everything app-specific (auth gate,
//! web UI, push) is gone, leaving grant issuance, the pub/sub upgrade,
//! health, and (optionally) metrics.

use {
    crate::{grant_routes::grant_channel_handler, state::AppState, ws::ws_upgrade_handler},
    axum::{
        Router,
        extract::State,
        response::{IntoResponse, Json},
        routing::{get, post},
    },
    tower_http::{
        catch_panic::CatchPanicLayer,
        compression::CompressionLayer,
        cors::{AllowOrigin, Any, CorsLayer},
        request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
        sensitive_headers::SetSensitiveHeadersLayer,
        set_header::SetResponseHeaderLayer,
        trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
    },
    tracing::Level,
};

/// 2 MiB global request body limit; the grant-issuance payload is tiny, but
/// this matches the bound the frame codec uses for WS payloads so the two
/// surfaces share one mental model.
const REQUEST_BODY_LIMIT: usize = 2 * 1024 * 1024;

pub fn build_gateway_app(state: AppState, http_request_logs: bool) -> Router {
    let cors = build_cors_layer();

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/grant-channel", post(grant_channel_handler))
        .route("/v1/pubsub", get(ws_upgrade_handler));

    #[cfg(feature = "prometheus")]
    {
        router = router.route("/metrics", get(crate::metrics_routes::prometheus_metrics_handler));
    }

    let router = apply_middleware_stack(router, cors, http_request_logs);
    router.with_state(state)
}

/// CORS via dynamic host-based origin validation instead of `allow_origin(Any)`:
/// the server allows its own origin at request time, which is the only thing
/// that makes sense for a service whose public hostname isn't known at build
/// time. Uses the same same-origin check as the WebSocket CSWSH guard.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &axum::http::HeaderValue, parts: &axum::http::request::Parts| {
            let origin_str = origin.to_str().unwrap_or("");
            let host = parts.headers.get(axum::http::header::HOST).and_then(|v| v.to_str().ok()).unwrap_or("");
            crate::ws::is_same_origin(origin_str, host)
        }))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Layer order (outermost → innermost for requests):
/// 1. `CatchPanicLayer` 2. `SetSensitiveHeadersLayer` 3. `SetRequestIdLayer`
/// 4. `TraceLayer` (optional) 5. `CorsLayer` 6. `PropagateRequestIdLayer`
/// 7. security response headers 8. `RequestBodyLimitLayer` 9. `CompressionLayer`
fn apply_middleware_stack<S>(router: Router<S>, cors: CorsLayer, http_request_logs: bool) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    use axum::http::{header, HeaderValue};

    let router = router
        .layer(CompressionLayer::new())
        .layer(tower_http::limit::RequestBodyLimitLayer::new(REQUEST_BODY_LIMIT))
        .layer(SetResponseHeaderLayer::overriding(
            header::HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(header::HeaderName::from_static("x-frame-options"), HeaderValue::from_static("deny")))
        .layer(SetResponseHeaderLayer::overriding(
            header::HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(cors);

    let router = apply_http_trace_layer(router, http_request_logs);

    router
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE, header::SET_COOKIE]))
        .layer(CatchPanicLayer::new())
}

fn apply_http_trace_layer<S>(router: Router<S>, enabled: bool) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if !enabled {
        return router;
    }
    let http_trace = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request.headers().get("x-request-id").and_then(|v| v.to_str().ok()).unwrap_or("-").to_owned();
            tracing::info_span!("http_request", method = %request.method(), uri = %request.uri(), request_id = %request_id)
        })
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));
    router.layer(http_trace)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "protocol": pulsegate_protocol::PROTOCOL_VERSION,
        "connections": state.active_connections.load(std::sync::atomic::Ordering::Relaxed),
        "channels": state.registry.active_channels(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_layer_builds() {
        let _ = build_cors_layer();
    }
}
