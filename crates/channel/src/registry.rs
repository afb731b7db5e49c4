//! Channel registry: lazy creation of one actor per
//! `(projectId, channelName, locationHint)`, plus idle eviction so a
//! process doesn't accumulate actors for channels nobody is connected to
//! anymore.

use {
    crate::actor::{spawn, ChannelConfig, ChannelHandle},
    dashmap::DashMap,
    std::{
        collections::hash_map::DefaultHasher,
        hash::{Hash, Hasher},
        sync::Arc,
        time::{Duration, Instant},
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ChannelKey {
    project_id: String,
    channel_name: String,
    location_hint: String,
}

struct Entry {
    handle: ChannelHandle,
    last_touched: Instant,
}

pub struct ChannelRegistry {
    actors: DashMap<ChannelKey, Entry>,
    signer: Arc<dyn pulsegate_common::Signer>,
    usage_sink: Arc<dyn pulsegate_common::UsageSink>,
    config: ChannelConfig,
    idle_timeout: Duration,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new(
        signer: Arc<dyn pulsegate_common::Signer>,
        usage_sink: Arc<dyn pulsegate_common::UsageSink>,
        config: ChannelConfig,
        idle_timeout: Duration,
    ) -> Self {
        Self { actors: DashMap::new(), signer, usage_sink, config, idle_timeout }
    }

    /// Return the handle for `(project_id, channel_name, location_hint)`,
    /// spawning a fresh actor on first access. The same key always derives
    /// the same id-factory seed, so repeated spawns (e.g. after idle
    /// eviction) stay reproducible in tests.
    pub fn get_or_create(&self, project_id: &str, channel_name: &str, location_hint: &str) -> ChannelHandle {
        let key = ChannelKey {
            project_id: project_id.to_string(),
            channel_name: channel_name.to_string(),
            location_hint: location_hint.to_string(),
        };
        if let Some(mut entry) = self.actors.get_mut(&key) {
            entry.last_touched = Instant::now();
            return entry.handle.clone();
        }

        let seed = seed_for(&key);
        let handle = spawn(project_id.to_string(), channel_name.to_string(), self.signer.clone(), self.usage_sink.clone(), self.config.clone(), seed);
        self.actors.insert(key, Entry { handle: handle.clone(), last_touched: Instant::now() });
        handle
    }

    /// Drop handles to actors untouched for longer than `idle_timeout`.
    /// The actor task itself exits once its handle is dropped and its
    /// mailbox sender count reaches zero; in-flight connections already
    /// hold a clone of the handle they registered with, so this never
    /// evicts a channel with live connections.
    pub fn evict_idle(&self) {
        let cutoff = Instant::now() - self.idle_timeout;
        self.actors.retain(|_, entry| entry.last_touched > cutoff);
    }

    #[must_use]
    pub fn active_channels(&self) -> usize {
        self.actors.len()
    }

    /// Tell every live actor to close its connections with `4412` and flush
    /// its usage buffer, then forget them. Actors finish shutting down on
    /// their own task; this only needs to fire the signal and drop the
    /// registry's handles so nothing routes a new connection to them.
    pub fn shutdown_all(&self) {
        for entry in self.actors.iter() {
            entry.handle.shutdown();
        }
        self.actors.clear();
    }
}

fn seed_for(key: &ChannelKey) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use {super::*, pulsegate_protocol::{Grant, UsageEvent}};

    struct NoopSigner;
    impl pulsegate_common::Signer for NoopSigner {
        fn sign(&self, _grant: &Grant) -> Result<String, pulsegate_common::SignerError> {
            Ok(String::new())
        }
        fn verify(&self, _token: &str) -> Result<Grant, pulsegate_common::VerifyError> {
            Err(pulsegate_common::VerifyError::Malformed)
        }
    }

    struct NoopSink;
    #[async_trait::async_trait]
    impl pulsegate_common::UsageSink for NoopSink {
        async fn ship(&self, _events: Vec<UsageEvent>) {}
    }

    fn registry() -> ChannelRegistry {
        ChannelRegistry::new(Arc::new(NoopSigner), Arc::new(NoopSink), ChannelConfig::default(), Duration::from_secs(300))
    }

    #[test]
    fn same_key_returns_the_same_actor() {
        let reg = registry();
        let a = reg.get_or_create("proj", "room", "us-east");
        let b = reg.get_or_create("proj", "room", "us-east");
        assert_eq!(a.project_id(), b.project_id());
        assert_eq!(reg.active_channels(), 1);
    }

    #[test]
    fn different_location_hints_are_different_channels() {
        let reg = registry();
        reg.get_or_create("proj", "room", "us-east");
        reg.get_or_create("proj", "room", "eu-west");
        assert_eq!(reg.active_channels(), 2);
    }

    #[test]
    fn eviction_removes_untouched_entries_only() {
        let reg = registry();
        reg.get_or_create("proj", "room", "us-east");
        reg.evict_idle();
        assert_eq!(reg.active_channels(), 1, "idle_timeout is 300s, nothing should be evicted yet");
    }

    #[test]
    fn shutdown_all_forgets_every_actor() {
        let reg = registry();
        reg.get_or_create("proj", "room", "us-east");
        reg.get_or_create("proj", "room", "eu-west");
        reg.shutdown_all();
        assert_eq!(reg.active_channels(), 0);
    }
}
