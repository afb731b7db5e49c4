//! Grant cache (component C): content-addressed by
//! `hash(secretKeyFingerprint, channel, normalizedTopics, userId)`. Entries
//! are immutable once written; the only invalidation path is TTL expiry.

use {
    dashmap::DashMap,
    pulsegate_common::CachedGrant,
    pulsegate_protocol::TopicGrant,
    sha2::{Digest, Sha256},
};

/// `topics` must already be normalized (deduplicated, sorted) so that two
/// requests differing only in input order or duplicate entries land on the
/// same key.
#[must_use]
pub fn cache_key(secret_key_fingerprint: &str, channel: &str, topics: &[TopicGrant], user_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret_key_fingerprint.as_bytes());
    hasher.update(b"\0");
    hasher.update(channel.as_bytes());
    hasher.update(b"\0");
    for t in topics {
        hasher.update(t.topic.as_bytes());
        hasher.update(b":");
        hasher.update(scope_tag(t.scope).as_bytes());
        hasher.update(b",");
    }
    hasher.update(b"\0");
    hasher.update(user_id.as_bytes());
    hex::encode(hasher.finalize())
}

fn scope_tag(scope: pulsegate_protocol::Scope) -> &'static str {
    use pulsegate_protocol::Scope;
    match scope {
        Scope::Read => "r",
        Scope::Write => "w",
        Scope::ReadWrite => "rw",
    }
}

/// Process-wide in-memory grant cache, used when `PULSEGATE_GRANT_CACHE_URL`
/// is not configured.
#[derive(Default)]
pub struct InMemoryGrantCache {
    entries: DashMap<String, CachedGrant>,
}

impl InMemoryGrantCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl pulsegate_common::GrantCache for InMemoryGrantCache {
    async fn get(&self, key: &str) -> Option<CachedGrant> {
        let now = crate::signer::now_unix();
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.clone()),
            Some(_expired) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn put(&self, key: &str, value: CachedGrant) {
        self.entries.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsegate_common::GrantCache as _;
    use pulsegate_protocol::Scope;

    #[test]
    fn cache_key_is_order_independent_after_normalization() {
        let topics_a = vec![
            TopicGrant { topic: "a".into(), scope: Scope::Read },
            TopicGrant { topic: "b".into(), scope: Scope::Write },
        ];
        let normalized_b = pulsegate_protocol::normalize_topics(&[
            TopicGrant { topic: "b".into(), scope: Scope::Write },
            TopicGrant { topic: "a".into(), scope: Scope::Read },
        ]);
        assert_eq!(
            cache_key("fp", "room", &topics_a, "user"),
            cache_key("fp", "room", &normalized_b, "user")
        );
    }

    #[tokio::test]
    async fn hit_then_miss_after_expiry() {
        let cache = InMemoryGrantCache::new();
        let now = crate::signer::now_unix();
        cache
            .put("k", CachedGrant { token: "t1".into(), expires_at: now + 10 })
            .await;
        assert!(cache.get("k").await.is_some());

        cache
            .put("expired", CachedGrant { token: "t2".into(), expires_at: now - 1 })
            .await;
        assert!(cache.get("expired").await.is_none());
    }
}
