//! Grant issuance stack: components A through E of the gateway.
//!
//! - [`signer`] — EdDSA sign/verify (component A)
//! - [`key_store`] — secret key resolution (component B)
//! - [`grant_cache`] — content-addressed grant cache (component C)
//! - [`rate_limiter`] — sliding-window tenant rate limiting (component D)
//! - [`issuance`] — the orchestration tying the above into `issueGrant` (component E)

pub mod grant_cache;
pub mod issuance;
pub mod key_store;
pub mod rate_limiter;
pub mod signer;

pub use {
    grant_cache::InMemoryGrantCache,
    issuance::{GrantIssuer, IssueGrantError, IssueOutcome},
    key_store::InMemoryKeyStore,
    rate_limiter::SlidingWindowRateLimiter,
    signer::EdDsaSigner,
};
