//! Environment-first configuration. There is no local config file to
//! discover here — this is a headless multi-tenant service, not a desktop
//! app, so `Config` is populated straight from the environment (with an
//! optional `.env` for development) via `clap`'s `env` feature.

use {clap::Parser, secrecy::SecretString, std::{convert::Infallible, net::SocketAddr}};

fn parse_secret(raw: &str) -> Result<SecretString, Infallible> {
    Ok(SecretString::new(raw.to_string()))
}

#[derive(Debug, Clone, Parser)]
#[command(name = "pulsegate-gateway", about = "Multi-tenant publish/subscribe gateway")]
pub struct Config {
    /// Base64 Ed25519 private key seed (32 bytes) used to sign grants.
    /// Required unless this deployment only verifies (`--verify-key` set and
    /// no grant issuance route mounted).
    #[arg(long, env = "PULSEGATE_SIGNING_KEY", value_parser = parse_secret)]
    pub signing_key: Option<SecretString>,

    /// Base64 Ed25519 public key used to verify grants at the channel edge.
    /// Derived from `signing_key` when omitted and a signing key is present.
    #[arg(long, env = "PULSEGATE_VERIFY_KEY")]
    pub verify_key: Option<String>,

    /// Usage webhook target, e.g. `https://aggregator.example.com`.
    #[arg(long, env = "PULSEGATE_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Shared secret used to HMAC-sign outbound usage webhook bodies.
    #[arg(long, env = "PULSEGATE_WEBHOOK_SECRET", value_parser = parse_secret)]
    pub webhook_secret: Option<SecretString>,

    /// Backing store for secret-key resolution. Absent ⇒ in-memory `KeyStore`.
    #[arg(long, env = "PULSEGATE_KEY_STORE_URL")]
    pub key_store_url: Option<String>,

    /// Seed data for the in-memory `KeyStore` when `key_store_url` is absent:
    /// semicolon-separated `secret_key:project_id:key_id` triples. Lets a
    /// deployment without an external key-resolution backend still boot with
    /// known keys instead of rejecting every grant request as unknown.
    #[arg(long, env = "PULSEGATE_BOOTSTRAP_KEYS")]
    pub bootstrap_keys: Option<String>,

    /// Backing store for the sliding-window rate limiter. Absent ⇒ in-memory.
    #[arg(long, env = "PULSEGATE_RATE_LIMIT_URL")]
    pub rate_limit_url: Option<String>,

    /// Backing store for the grant cache. Absent ⇒ in-memory.
    #[arg(long, env = "PULSEGATE_GRANT_CACHE_URL")]
    pub grant_cache_url: Option<String>,

    /// Heartbeat interval for idle connections, in seconds.
    #[arg(long, env = "PULSEGATE_HEARTBEAT_SECS", default_value_t = pulsegate_protocol::DEFAULT_HEARTBEAT_SECS)]
    pub heartbeat_secs: u64,

    /// Grace period within which `Pending` connections must send `Connect`.
    #[arg(long, env = "PULSEGATE_GRACE_SECS", default_value_t = pulsegate_protocol::DEFAULT_GRACE_SECS)]
    pub grace_secs: u64,

    /// Address the HTTP/WS server binds to.
    #[arg(long, env = "PULSEGATE_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// `json` for structured logs, anything else for human-readable.
    #[arg(long, env = "PULSEGATE_LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

impl Config {
    /// Load `.env` (if present) then parse from `std::env::args()` + the
    /// environment. Fatal config errors are surfaced by `clap` itself as a
    /// process exit, matching how the rest of this service treats
    /// configuration failures (§7 Error Handling Design: `Config` errors are
    /// fatal at startup).
    #[must_use]
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_key.is_none() && self.verify_key.is_none() {
            return Err(ConfigError::MissingSigningMaterial);
        }
        if self.webhook_url.is_some() != self.webhook_secret.is_some() {
            return Err(ConfigError::IncompleteWebhookConfig);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("neither PULSEGATE_SIGNING_KEY nor PULSEGATE_VERIFY_KEY is set")]
    MissingSigningMaterial,
    #[error("PULSEGATE_WEBHOOK_URL and PULSEGATE_WEBHOOK_SECRET must both be set or both absent")]
    IncompleteWebhookConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(signing: Option<&str>, verify: Option<&str>) -> Config {
        Config {
            signing_key: signing.map(|s| SecretString::new(s.to_string())),
            verify_key: verify.map(str::to_string),
            webhook_url: None,
            webhook_secret: None,
            key_store_url: None,
            bootstrap_keys: None,
            rate_limit_url: None,
            grant_cache_url: None,
            heartbeat_secs: 25,
            grace_secs: 10,
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            log_format: "text".into(),
        }
    }

    #[test]
    fn validate_requires_some_signing_material() {
        assert!(base(None, None).validate().is_err());
        assert!(base(Some("k"), None).validate().is_ok());
        assert!(base(None, Some("k")).validate().is_ok());
    }

    #[test]
    fn validate_requires_complete_webhook_config() {
        let mut cfg = base(Some("k"), None);
        cfg.webhook_url = Some("https://example.com".into());
        assert!(cfg.validate().is_err());
        cfg.webhook_secret = Some(SecretString::new("s".to_string()));
        assert!(cfg.validate().is_ok());
    }
}
