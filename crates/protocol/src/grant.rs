//! Grant data model: the payload signed/verified by the grant signer and
//! carried by every authenticated connection.

use {
    crate::{
        constants::MAX_TOPICS_PER_GRANT,
        error::{ProtocolError, Result},
    },
    secrecy::SecretString,
    serde::{Deserialize, Serialize},
    std::cmp::Ordering,
};

/// Permission level on a single topic, ordered by permissiveness:
/// `ReadWrite` ⊇ `Write`, `ReadWrite` ⊇ `Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    Read,
    Write,
    ReadWrite,
}

impl Scope {
    #[must_use]
    pub fn allows_publish(self) -> bool {
        matches!(self, Scope::Write | Scope::ReadWrite)
    }

    #[must_use]
    pub fn allows_subscribe(self) -> bool {
        matches!(self, Scope::Read | Scope::ReadWrite)
    }

    /// Rank used to pick the more permissive of two scopes on merge.
    fn rank(self) -> u8 {
        match self {
            Scope::Read => 0,
            Scope::Write => 1,
            Scope::ReadWrite => 2,
        }
    }

    #[must_use]
    pub fn most_permissive(self, other: Scope) -> Scope {
        if self.rank() >= other.rank() { self } else { other }
    }
}

/// One `{topic, scope}` entry, either in a raw request or a normalized grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicGrant {
    pub topic: String,
    pub scope: Scope,
}

impl TopicGrant {
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.topic == "*"
    }
}

/// Raw, pre-normalization request body for `POST /v1/grant-channel`. Never
/// derives `Serialize`: `secret_key` is a `SecretString`, which deliberately
/// has no `Serialize` impl so a raw key can't be echoed back out by accident.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantRequest {
    pub secret_key: SecretString,
    pub channel: String,
    pub topics: Vec<TopicGrant>,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// The normalized payload signed into a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub project_id: String,
    pub channel: String,
    pub topics: Vec<TopicGrant>,
    pub user_id: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl Grant {
    /// Resolved scope for `topic`, folding in wildcard grants per the
    /// documented authorization rule: an explicit entry overrides `*`,
    /// taking the more permissive of the two when both match.
    #[must_use]
    pub fn scope_for(&self, topic: &str) -> Option<Scope> {
        let mut resolved: Option<Scope> = None;
        for entry in &self.topics {
            if entry.topic == topic || entry.is_wildcard() {
                resolved = Some(match resolved {
                    Some(existing) => existing.most_permissive(entry.scope),
                    None => entry.scope,
                });
            }
        }
        resolved
    }

    #[must_use]
    pub fn can_publish(&self, topic: &str) -> bool {
        self.scope_for(topic).is_some_and(Scope::allows_publish)
    }

    #[must_use]
    pub fn can_subscribe(&self, topic: &str) -> bool {
        self.scope_for(topic).is_some_and(Scope::allows_subscribe)
    }
}

fn is_valid_channel(channel: &str) -> bool {
    !channel.is_empty()
        && channel.len() <= 64
        && channel
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b':' | b'-'))
}

fn is_valid_topic(topic: &str) -> bool {
    if topic == "*" {
        return true;
    }
    !topic.is_empty()
        && topic.len() <= 64
        && topic.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Validate the syntactic shape of a grant request: channel pattern, topic
/// patterns, and topic count bound. This is the cheap-reject pass that runs
/// before any authentication or rate limiting.
pub fn validate_request(req: &GrantRequest) -> Result<()> {
    if !is_valid_channel(&req.channel) {
        return Err(ProtocolError::InvalidChannel(req.channel.clone()));
    }
    if req.topics.is_empty() {
        return Err(ProtocolError::EmptyTopics);
    }
    if req.topics.len() > MAX_TOPICS_PER_GRANT {
        return Err(ProtocolError::TooManyTopics {
            count: req.topics.len(),
            max: MAX_TOPICS_PER_GRANT,
        });
    }
    for t in &req.topics {
        if !is_valid_topic(&t.topic) {
            return Err(ProtocolError::InvalidTopic(t.topic.clone()));
        }
    }
    Ok(())
}

/// Deduplicate by topic name, keeping the most permissive scope for
/// duplicates, then sort ascending by topic name. This is the exact
/// normalization §4.E step 6 describes, and it is what the grant cache key
/// and the signed grant both derive from.
#[must_use]
pub fn normalize_topics(topics: &[TopicGrant]) -> Vec<TopicGrant> {
    let mut merged: Vec<TopicGrant> = Vec::with_capacity(topics.len());
    for t in topics {
        if let Some(existing) = merged.iter_mut().find(|e: &&mut TopicGrant| e.topic == t.topic) {
            existing.scope = existing.scope.most_permissive(t.scope);
        } else {
            merged.push(t.clone());
        }
    }
    merged.sort_by(|a, b| a.topic.cmp(&b.topic));
    merged
}

/// Clamp a requested expiry hint (unix seconds) into `[now+min, now+max]`,
/// defaulting to `now+max` when no hint is given.
#[must_use]
pub fn clamp_expiry(hint: Option<i64>, now: i64, min_ttl: i64, max_ttl: i64) -> i64 {
    let requested = hint.unwrap_or(now + max_ttl);
    let lower = now + min_ttl;
    let upper = now + max_ttl;
    requested.clamp(lower, upper)
}

impl PartialOrd for Scope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.rank().cmp(&other.rank()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tg(topic: &str, scope: Scope) -> TopicGrant {
        TopicGrant { topic: topic.into(), scope }
    }

    #[test]
    fn normalize_dedupes_and_sorts() {
        let topics = vec![
            tg("b", Scope::Read),
            tg("a", Scope::Write),
            tg("b", Scope::ReadWrite),
        ];
        let out = normalize_topics(&topics);
        assert_eq!(out, vec![tg("a", Scope::Write), tg("b", Scope::ReadWrite)]);
    }

    #[test]
    fn wildcard_grants_every_topic() {
        let grant = Grant {
            project_id: "p".into(),
            channel: "room".into(),
            topics: vec![tg("*", Scope::Read)],
            user_id: "u".into(),
            issued_at: 0,
            expires_at: 100,
        };
        assert!(grant.can_subscribe("anything"));
        assert!(!grant.can_publish("anything"));
    }

    #[test]
    fn explicit_entry_overrides_wildcard_with_more_permissive_scope() {
        let grant = Grant {
            project_id: "p".into(),
            channel: "room".into(),
            topics: vec![tg("*", Scope::Read), tg("chat", Scope::Write)],
            user_id: "u".into(),
            issued_at: 0,
            expires_at: 100,
        };
        assert!(grant.can_publish("chat"));
        assert!(grant.can_subscribe("chat"));
        assert!(grant.can_subscribe("other"));
        assert!(!grant.can_publish("other"));
    }

    #[test]
    fn clamp_expiry_defaults_and_bounds() {
        assert_eq!(clamp_expiry(None, 1000, 600, 7200), 1000 + 7200);
        assert_eq!(clamp_expiry(Some(1000 + 60), 1000, 600, 7200), 1000 + 600);
        assert_eq!(clamp_expiry(Some(1000 + 999_999), 1000, 600, 7200), 1000 + 7200);
    }

    #[test]
    fn rejects_invalid_channel_and_topic() {
        let mut req = GrantRequest {
            secret_key: SecretString::new("sk-er-x".to_string()),
            channel: "bad channel!".into(),
            topics: vec![tg("chat", Scope::Read)],
            user_id: "u".into(),
            expires_at: None,
        };
        assert!(validate_request(&req).is_err());
        req.channel = "room".into();
        req.topics = vec![tg("bad topic", Scope::Read)];
        assert!(validate_request(&req).is_err());
    }
}
