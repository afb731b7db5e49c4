//! `POST /v1/grant-channel`: the HTTP front door onto `GrantIssuer::issue`.
//! This handler only translates `IssueOutcome`/`IssueGrantError` into the
//! response shape and headers the caller contract promises; all the actual
//! decision-making already happened in `pulsegate-grants`.

use {
    crate::state::AppState,
    axum::{
        extract::State,
        http::{HeaderMap, HeaderValue, StatusCode},
        response::{IntoResponse, Json},
    },
    pulsegate_grants::IssueGrantError,
    pulsegate_protocol::{GrantRequest, RATE_LIMIT_MAX_GRANTS},
};

pub async fn grant_channel_handler(State(state): State<AppState>, Json(req): Json<GrantRequest>) -> impl IntoResponse {
    match state.issuer.issue(&req).await {
        Ok(outcome) => {
            let mut headers = HeaderMap::new();
            headers.insert("x-grant-ttl", header_value(outcome.ttl_seconds));
            headers.insert("x-grant-expires-at", header_value(outcome.expires_at));
            headers.insert("x-grant-cache", HeaderValue::from_static(if outcome.cache_hit { "HIT" } else { "MISS" }));
            if let Some(decision) = outcome.rate_limit {
                headers.insert("x-ratelimit-limit", header_value(RATE_LIMIT_MAX_GRANTS));
                headers.insert("x-ratelimit-remaining", header_value(decision.remaining));
                headers.insert("x-ratelimit-reset", header_value(decision.reset_at));
            }
            (StatusCode::OK, headers, Json(serde_json::json!({ "grant_jwt": outcome.token }))).into_response()
        }
        Err(err) => issue_error_response(err).into_response(),
    }
}

fn issue_error_response(err: IssueGrantError) -> (StatusCode, HeaderMap, Json<serde_json::Value>) {
    let mut headers = HeaderMap::new();
    let (status, message) = match &err {
        IssueGrantError::Malformed(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        IssueGrantError::UnknownKey | IssueGrantError::KeyDisabled | IssueGrantError::KeyRevoked => (StatusCode::UNAUTHORIZED, err.to_string()),
        IssueGrantError::RateLimited { retry_after, .. } => {
            headers.insert("retry-after", header_value(*retry_after));
            (StatusCode::TOO_MANY_REQUESTS, err.to_string())
        }
        IssueGrantError::SignerConfig | IssueGrantError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
    };
    if !matches!(err, IssueGrantError::SignerConfig | IssueGrantError::Internal(_)) {
        tracing::warn!(error = %err, "grant issuance rejected");
    } else {
        tracing::error!(error = %err, "grant issuance failed");
    }
    (status, headers, Json(serde_json::json!({ "error": message })))
}

fn header_value(n: impl std::fmt::Display) -> HeaderValue {
    HeaderValue::from_str(&n.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}
