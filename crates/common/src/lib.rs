//! Ambient plumbing shared by every pulsegate crate: environment-driven
//! configuration, the capability interfaces components depend on instead of
//! any concrete framework, and tracing bootstrap.

pub mod config;
pub mod telemetry;
pub mod traits;

pub use config::{Config, ConfigError};
pub use telemetry::init_tracing;
pub use traits::{
    CachedGrant, GrantCache, KeyError, KeyStatus, KeyStore, RateLimitDecision, RateLimiter,
    ResolvedKey, Signer, SignerError, UsageSink, VerifyError,
};
