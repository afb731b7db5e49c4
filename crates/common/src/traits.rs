//! Capability interfaces (§9 Design Notes): the channel actor and the grant
//! issuance service depend on these traits, never on a concrete framework or
//! backing store. Swapping an in-memory implementation for a Redis- or
//! Postgres-backed one never touches the call sites.

use {async_trait::async_trait, pulsegate_protocol::{Grant, UsageEvent}};

/// Status of a resolved secret key. Only `Active` is usable; the other two
/// are terminal, one-way transitions from `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Active,
    Disabled,
    Revoked,
}

#[derive(Debug, Clone)]
pub struct ResolvedKey {
    pub project_id: String,
    pub key_id: String,
    pub status: KeyStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("secret key not found")]
    NotFound,
    #[error("key resolver unavailable: {0}")]
    Unavailable(String),
}

/// `resolve(secretKey) -> {projectId, keyId, status} | NotFound` (§4.B).
/// Implementations key on a fingerprint of the raw secret so the secret
/// itself never needs to be retained past one call.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn resolve(&self, secret_key: &str) -> Result<ResolvedKey, KeyError>;
}

/// Outcome of a rate-limit check (§4.D). Implementations are responsible for
/// the fail-open policy themselves: a dependency failure must produce
/// `ok: true` (with the implementation recording a metric), never bubble up
/// as an error the caller has to interpret.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub ok: bool,
    pub remaining: u32,
    pub reset_at: i64,
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, project_id: &str, user_id: &str) -> RateLimitDecision;
}

/// A cached, already-signed grant token plus its absolute expiry.
#[derive(Debug, Clone)]
pub struct CachedGrant {
    pub token: String,
    pub expires_at: i64,
}

/// Content-addressed cache of issued grants (§4.C). Cache failures are
/// non-fatal by contract: a failing `get` must return `None` (fall through
/// to the slow path) and a failing `put` must be swallowed, not propagated.
#[async_trait]
pub trait GrantCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CachedGrant>;
    async fn put(&self, key: &str, value: CachedGrant);
}

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("signer is not configured with a usable private key")]
    SignerConfig,
    #[error("signing failed: {0}")]
    Internal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token is expired")]
    Expired,
}

/// Grant signer & verifier (§4.A). Verification is pure: it must never
/// consult the network or mutable process state.
pub trait Signer: Send + Sync {
    fn sign(&self, grant: &Grant) -> Result<String, SignerError>;
    fn verify(&self, token: &str) -> Result<Grant, VerifyError>;
}

/// Usage shipper sink (§4.H). Delivery is best-effort: implementations
/// retry internally with backoff and drop after a cap, never blocking the
/// caller (the channel actor) on network I/O.
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn ship(&self, events: Vec<UsageEvent>);
}
