//! `GET /v1/pubsub`: the WebSocket upgrade and per-connection lifecycle.
//!
//! The upgrade carries `X-Location-Hint` and `X-Grant` (the signed grant) as
//! headers for clients that can set them; browsers' native `WebSocket`
//! constructor cannot attach custom headers at all, so `(projectId,
//! channelName)` — needed to route the upgrade to a channel actor before any
//! grant has been read — travel as `project_id`/`channel` query parameters
//! instead, and a browser client resends its grant as the first `Connect`
//! frame once the socket is open. When `X-Grant` is present on the upgrade
//! itself, this handler resends it as that same first frame on the client's
//! behalf so non-browser clients don't have to.

use {
    crate::state::AppState,
    axum::{
        extract::{
            ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
            ConnectInfo, Query, State,
        },
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
    },
    futures::{stream::StreamExt, SinkExt},
    pulsegate_channel::Outbound,
    pulsegate_protocol::{ClientFrame, DEFAULT_HEARTBEAT_SECS, MAX_FRAME_BYTES},
    serde::Deserialize,
    std::{net::SocketAddr, sync::atomic::Ordering, time::Duration},
    tokio::sync::mpsc,
    tracing::{debug, warn},
};

#[derive(Debug, Deserialize)]
pub struct PubsubQuery {
    pub project_id: String,
    pub channel: String,
    #[serde(default = "default_location_hint")]
    pub location_hint: String,
}

fn default_location_hint() -> String {
    "default".to_string()
}

pub async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<PubsubQuery>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    if state.draining.load(Ordering::Relaxed) {
        return (StatusCode::SERVICE_UNAVAILABLE, "gateway is shutting down").into_response();
    }

    if let Some(origin) = headers.get(axum::http::header::ORIGIN).and_then(|v| v.to_str().ok()) {
        let host = headers.get(axum::http::header::HOST).and_then(|v| v.to_str().ok()).unwrap_or("");
        if !is_same_origin(origin, host) {
            warn!(origin, host, remote = %addr, "rejected cross-origin WebSocket upgrade");
            return (StatusCode::FORBIDDEN, "cross-origin WebSocket connections are not allowed").into_response();
        }
    }

    let location_hint = headers
        .get("x-location-hint")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or(query.location_hint);
    let grant_header = headers.get("x-grant").and_then(|v| v.to_str().ok()).map(str::to_string);

    ws.on_upgrade(move |socket| handle_connection(socket, state, query.project_id, query.channel, location_hint, grant_header))
}

/// Handle a single WebSocket connection through its full lifecycle: register
/// with the channel actor → message loop → cleanup. Unlike the gateway this
/// workspace grew out of, there is no separate handshake-with-timeout phase:
/// `Connect` is just the first `ClientFrame` the actor sees, and a connection
/// that never sends one is swept up by the actor's own grace-period timer.
async fn handle_connection(socket: WebSocket, state: AppState, project_id: String, channel: String, location_hint: String, grant_header: Option<String>) {
    let handle = state.registry.get_or_create(&project_id, &channel, &location_hint);
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (client_tx, mut client_rx) = mpsc::unbounded_channel::<Outbound>();
    let (conn_id, egress_bytes) = match handle.register(client_tx.clone()).await {
        Ok(pair) => pair,
        Err(err) => {
            warn!(error = %err, "failed to register connection with channel actor");
            let _ = ws_tx.send(Message::Close(None)).await;
            return;
        }
    };
    state.active_connections.fetch_add(1, Ordering::Relaxed);
    debug!(conn_id, project_id = %project_id, channel = %channel, "ws: connection registered");

    if let Some(grant_jwt) = grant_header {
        let _ = handle.send_frame(conn_id, ClientFrame::Connect { grant_jwt });
    }

    let write_task = tokio::spawn(async move {
        while let Some(out) = client_rx.recv().await {
            match out {
                Outbound::Frame(frame) => {
                    let text = match serde_json::to_string(&frame) {
                        Ok(t) => t,
                        Err(err) => {
                            tracing::error!(error = %err, "failed to serialize outbound frame");
                            continue;
                        }
                    };
                    let len = text.len();
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                    egress_bytes.fetch_sub(len.min(egress_bytes.load(Ordering::Relaxed)), Ordering::Relaxed);
                }
                Outbound::Close(code) => {
                    let frame = CloseFrame { code: code.code(), reason: code.reason().into() };
                    let _ = ws_tx.send(Message::Close(Some(frame))).await;
                    break;
                }
                Outbound::Ping => {
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let heartbeat = tokio::time::interval(Duration::from_secs(DEFAULT_HEARTBEAT_SECS));
    tokio::pin!(heartbeat);

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_FRAME_BYTES {
                            handle.disconnect(conn_id);
                            break;
                        }
                        match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(frame) => {
                                if handle.send_frame(conn_id, frame).is_err() {
                                    break;
                                }
                            }
                            Err(err) => debug!(error = %err, conn_id, "discarding malformed frame"),
                        }
                    }
                    Some(Ok(Message::Pong(_))) => handle.touch(conn_id),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(error = %err, conn_id, "websocket read error");
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => { let _ = client_tx.send(Outbound::Ping); }
        }
    }

    handle.disconnect(conn_id);
    state.active_connections.fetch_sub(1, Ordering::Relaxed);
    write_task.abort();
    debug!(conn_id, "ws: connection closed");
}

/// Same-origin check shared by the CORS layer and this CSWSH guard. `Origin`
/// is a full URL (`https://host:port`), `Host` is bare `host:port`.
pub fn is_same_origin(origin: &str, host: &str) -> bool {
    let origin_host = origin.split("://").nth(1).unwrap_or(origin).split('/').next().unwrap_or("");

    fn strip_port(h: &str) -> &str {
        if h.starts_with('[') {
            h.rsplit_once("]:").map_or(h, |(addr, _)| addr).trim_start_matches('[').trim_end_matches(']')
        } else {
            h.rsplit_once(':').map_or(h, |(addr, _)| addr)
        }
    }
    fn get_port(h: &str) -> Option<&str> {
        if h.starts_with('[') {
            h.rsplit_once("]:").map(|(_, p)| p)
        } else {
            h.rsplit_once(':').map(|(_, p)| p)
        }
    }

    let origin_port = get_port(origin_host);
    let host_port = get_port(host);

    let oh = strip_port(origin_host);
    let hh = strip_port(host);

    let is_loopback = |h: &str| matches!(h, "localhost" | "127.0.0.1" | "::1") || h.ends_with(".localhost");

    (oh == hh || (is_loopback(oh) && is_loopback(hh))) && origin_port == host_port
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_host_same_port_matches() {
        assert!(is_same_origin("https://example.com:8080", "example.com:8080"));
    }

    #[test]
    fn different_host_does_not_match() {
        assert!(!is_same_origin("https://evil.example:8080", "example.com:8080"));
    }

    #[test]
    fn loopback_variants_match_each_other() {
        assert!(is_same_origin("http://localhost:3000", "127.0.0.1:3000"));
    }

    #[test]
    fn mismatched_ports_do_not_match() {
        assert!(!is_same_origin("https://example.com:8080", "example.com:9090"));
    }

    #[test]
    fn ipv6_hosts_compare_correctly() {
        assert!(is_same_origin("https://[::1]:8080", "[::1]:8080"));
    }
}
