//! Grant issuance service (component E): the HTTP front door's
//! transport-agnostic core. `issue` implements the eight-step flow from
//! §4.E exactly in order; the gateway binary's HTTP handler only has to
//! translate `IssueOutcome`/`IssueGrantError` into status codes and headers.

use {
    crate::{grant_cache::cache_key, key_store::fingerprint, signer::now_unix},
    pulsegate_common::{CachedGrant, GrantCache, KeyError, KeyStatus, KeyStore, RateLimitDecision, RateLimiter, Signer, SignerError},
    pulsegate_protocol::{clamp_expiry, normalize_topics, Grant, GrantRequest, GRANT_MAX_TTL_SECS, GRANT_MIN_TTL_SECS},
    secrecy::ExposeSecret,
    std::sync::Arc,
};

#[derive(Debug, thiserror::Error)]
pub enum IssueGrantError {
    #[error("malformed request: {0}")]
    Malformed(#[from] pulsegate_protocol::ProtocolError),
    #[error("unknown secret key")]
    UnknownKey,
    #[error("secret key is disabled")]
    KeyDisabled,
    #[error("secret key is revoked")]
    KeyRevoked,
    #[error("rate limited")]
    RateLimited { retry_after: i64, reset_at: i64 },
    #[error("signer is not configured")]
    SignerConfig,
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone)]
pub struct IssueOutcome {
    pub token: String,
    pub ttl_seconds: i64,
    pub expires_at: i64,
    pub cache_hit: bool,
    /// `None` on a cache hit: the request never touched the rate limiter,
    /// and the response must not claim to have consumed budget it didn't.
    pub rate_limit: Option<RateLimitDecision>,
}

pub struct GrantIssuer {
    key_store: Arc<dyn KeyStore>,
    rate_limiter: Arc<dyn RateLimiter>,
    cache: Arc<dyn GrantCache>,
    signer: Arc<dyn Signer>,
}

impl GrantIssuer {
    #[must_use]
    pub fn new(key_store: Arc<dyn KeyStore>, rate_limiter: Arc<dyn RateLimiter>, cache: Arc<dyn GrantCache>, signer: Arc<dyn Signer>) -> Self {
        Self { key_store, rate_limiter, cache, signer }
    }

    pub async fn issue(&self, req: &GrantRequest) -> Result<IssueOutcome, IssueGrantError> {
        pulsegate_protocol::validate_request(req)?;

        let normalized = normalize_topics(&req.topics);
        let fp = fingerprint(req.secret_key.expose_secret());
        let key = cache_key(&fp, &req.channel, &normalized, &req.user_id);

        if let Some(cached) = self.cache.get(&key).await {
            let ttl = (cached.expires_at - now_unix()).max(0);
            return Ok(IssueOutcome {
                token: cached.token,
                ttl_seconds: ttl,
                expires_at: cached.expires_at,
                cache_hit: true,
                rate_limit: None,
            });
        }

        let resolved = self.key_store.resolve(req.secret_key.expose_secret()).await.map_err(|e| match e {
            KeyError::NotFound => IssueGrantError::UnknownKey,
            KeyError::Unavailable(msg) => IssueGrantError::Internal(msg),
        })?;
        match resolved.status {
            KeyStatus::Disabled => return Err(IssueGrantError::KeyDisabled),
            KeyStatus::Revoked => return Err(IssueGrantError::KeyRevoked),
            KeyStatus::Active => {}
        }

        let decision = self.rate_limiter.check(&resolved.project_id, &req.user_id).await;
        if !decision.ok {
            return Err(IssueGrantError::RateLimited {
                retry_after: (decision.reset_at - now_unix()).max(0),
                reset_at: decision.reset_at,
            });
        }

        let now = now_unix();
        let effective_exp = clamp_expiry(req.expires_at, now, GRANT_MIN_TTL_SECS, GRANT_MAX_TTL_SECS);

        let grant = Grant {
            project_id: resolved.project_id,
            channel: req.channel.clone(),
            topics: normalized,
            user_id: req.user_id.clone(),
            issued_at: now,
            expires_at: effective_exp,
        };

        let token = self.signer.sign(&grant).map_err(|e| match e {
            SignerError::SignerConfig => IssueGrantError::SignerConfig,
            SignerError::Internal(m) => IssueGrantError::Internal(m),
        })?;

        self.cache
            .put(&key, CachedGrant { token: token.clone(), expires_at: effective_exp })
            .await;

        Ok(IssueOutcome {
            token,
            ttl_seconds: effective_exp - now,
            expires_at: effective_exp,
            cache_hit: false,
            rate_limit: Some(decision),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use {
        crate::{grant_cache::InMemoryGrantCache, key_store::InMemoryKeyStore, rate_limiter::SlidingWindowRateLimiter, signer::EdDsaSigner},
        pulsegate_protocol::{Scope, TopicGrant},
    };

    const PKCS8_DER_B64: &str = "MC4CAQAwBQYDK2VwBCIEIO0jD5AueXdkjIX1suKJzCWHdFpMT1yWxxkrBWJE0NJ5";
    const SPKI_DER_B64: &str = "MCowBQYDK2VwAyEAr7Lu7uPeCi36v1LQaZ4dlKr1SZPpUnwHG0y6sDfSGHI=";

    fn issuer_with_key(secret_key: &str) -> GrantIssuer {
        let key_store = InMemoryKeyStore::new();
        key_store.insert(secret_key, "proj_1", "key_1", KeyStatus::Active);
        let signer = EdDsaSigner::from_base64(Some(PKCS8_DER_B64), Some(SPKI_DER_B64)).unwrap();
        GrantIssuer::new(
            Arc::new(key_store),
            Arc::new(SlidingWindowRateLimiter::new()),
            Arc::new(InMemoryGrantCache::new()),
            Arc::new(signer),
        )
    }

    fn req(secret_key: &str) -> GrantRequest {
        GrantRequest {
            secret_key: secrecy::SecretString::new(secret_key.to_string()),
            channel: "room".into(),
            topics: vec![TopicGrant { topic: "chat".into(), scope: Scope::ReadWrite }],
            user_id: "user_1".into(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn issues_a_grant_for_an_active_key() {
        let key = format!("sk-er-{}", "a".repeat(48));
        let issuer = issuer_with_key(&key);
        let outcome = issuer.issue(&req(&key)).await.unwrap();
        assert!(!outcome.cache_hit);
        assert!(outcome.rate_limit.unwrap().ok);
        assert!(outcome.ttl_seconds > 0);
    }

    #[tokio::test]
    async fn unknown_key_is_rejected() {
        let key = format!("sk-er-{}", "b".repeat(48));
        let issuer = issuer_with_key("sk-er-other-key-not-registered-at-all-00000000000000");
        let err = issuer.issue(&req(&key)).await.unwrap_err();
        assert!(matches!(err, IssueGrantError::UnknownKey));
    }

    #[tokio::test]
    async fn identical_requests_hit_the_cache_and_skip_rate_limiting() {
        let key = format!("sk-er-{}", "c".repeat(48));
        let issuer = issuer_with_key(&key);
        let first = issuer.issue(&req(&key)).await.unwrap();
        let second = issuer.issue(&req(&key)).await.unwrap();
        assert_eq!(first.token, second.token);
        assert!(second.cache_hit);
        assert!(second.rate_limit.is_none());
    }

    #[tokio::test]
    async fn sixth_distinct_request_in_window_is_rate_limited() {
        let key = format!("sk-er-{}", "d".repeat(48));
        let issuer = issuer_with_key(&key);
        for i in 0..5 {
            let mut r = req(&key);
            r.channel = format!("room-{i}");
            assert!(issuer.issue(&r).await.is_ok());
        }
        let mut sixth = req(&key);
        sixth.channel = "room-5".into();
        let err = issuer.issue(&sixth).await.unwrap_err();
        assert!(matches!(err, IssueGrantError::RateLimited { .. }));
    }
}
