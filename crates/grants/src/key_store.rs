//! Key resolver (component B): hash-indexed lookup of `secret_key -> status`.
//! The raw secret is hashed immediately and never retained; only the SHA-256
//! fingerprint is stored or compared, the same pattern the credential store
//! this was grounded on uses for API keys.

use {
    async_trait::async_trait,
    dashmap::DashMap,
    pulsegate_common::{KeyError, KeyStatus, KeyStore, ResolvedKey},
    sha2::{Digest, Sha256},
};

#[must_use]
pub fn fingerprint(secret_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// `sk-er-` (production) or `dv-er-` (development) followed by 48
/// alphanumeric characters.
#[must_use]
pub fn is_valid_secret_key_format(secret_key: &str) -> bool {
    let rest = secret_key
        .strip_prefix("sk-er-")
        .or_else(|| secret_key.strip_prefix("dv-er-"));
    match rest {
        Some(tail) => tail.len() == 48 && tail.bytes().all(|b| b.is_ascii_alphanumeric()),
        None => false,
    }
}

#[derive(Clone)]
struct Entry {
    project_id: String,
    key_id: String,
    status: KeyStatus,
}

/// Process-wide in-memory key resolver, used when `PULSEGATE_KEY_STORE_URL`
/// is not configured. Safe for concurrent lookups and updates (§5 Shared
/// resources).
#[derive(Default)]
pub struct InMemoryKeyStore {
    by_fingerprint: DashMap<String, Entry>,
}

impl InMemoryKeyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret key, overwriting any prior entry with the same
    /// fingerprint. Intended for bootstrapping and tests; production
    /// deployments back this trait with a real store instead.
    pub fn insert(&self, secret_key: &str, project_id: impl Into<String>, key_id: impl Into<String>, status: KeyStatus) {
        self.by_fingerprint.insert(
            fingerprint(secret_key),
            Entry { project_id: project_id.into(), key_id: key_id.into(), status },
        );
    }

    pub fn set_status(&self, secret_key: &str, status: KeyStatus) {
        if let Some(mut entry) = self.by_fingerprint.get_mut(&fingerprint(secret_key)) {
            entry.status = status;
        }
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn resolve(&self, secret_key: &str) -> Result<ResolvedKey, KeyError> {
        let fp = fingerprint(secret_key);
        self.by_fingerprint
            .get(&fp)
            .map(|e| ResolvedKey { project_id: e.project_id.clone(), key_id: e.key_id.clone(), status: e.status })
            .ok_or(KeyError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_secret_key_format() {
        let good = format!("sk-er-{}", "a".repeat(48));
        assert!(is_valid_secret_key_format(&good));
        let dev = format!("dv-er-{}", "b".repeat(48));
        assert!(is_valid_secret_key_format(&dev));
        assert!(!is_valid_secret_key_format("sk-er-tooshort"));
        assert!(!is_valid_secret_key_format("garbage"));
    }

    #[tokio::test]
    async fn resolves_active_key_by_fingerprint() {
        let store = InMemoryKeyStore::new();
        let key = format!("sk-er-{}", "c".repeat(48));
        store.insert(&key, "proj_1", "key_1", KeyStatus::Active);

        let resolved = store.resolve(&key).await.unwrap();
        assert_eq!(resolved.project_id, "proj_1");
        assert_eq!(resolved.status, KeyStatus::Active);
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let store = InMemoryKeyStore::new();
        assert!(matches!(store.resolve("sk-er-nope").await, Err(KeyError::NotFound)));
    }

    #[tokio::test]
    async fn revocation_is_visible_on_next_resolve() {
        let store = InMemoryKeyStore::new();
        let key = format!("sk-er-{}", "d".repeat(48));
        store.insert(&key, "proj_1", "key_1", KeyStatus::Active);
        store.set_status(&key, KeyStatus::Revoked);
        let resolved = store.resolve(&key).await.unwrap();
        assert_eq!(resolved.status, KeyStatus::Revoked);
    }
}
