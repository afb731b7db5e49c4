//! In-memory batching in front of an [`UsageSink`]: the channel actor calls
//! `ship` once per flush point in its own event loop; this buffer
//! accumulates those calls and only forwards to the wrapped sink when a
//! batch-size or max-wait trigger fires, per §4.H.

use {
    pulsegate_protocol::UsageEvent,
    std::{sync::Arc, time::{Duration, Instant}},
    tokio::sync::{mpsc, oneshot},
};

#[derive(Debug, Clone)]
pub struct UsageBufferConfig {
    pub max_batch: usize,
    pub max_wait: Duration,
    pub mailbox_capacity: usize,
}

impl Default for UsageBufferConfig {
    fn default() -> Self {
        Self { max_batch: 50, max_wait: Duration::from_millis(2000), mailbox_capacity: 1024 }
    }
}

enum Command {
    Push(Vec<UsageEvent>),
    Flush(oneshot::Sender<()>),
}

/// A [`UsageSink`] that buffers before delegating to an inner sink.
#[derive(Clone)]
pub struct BufferedUsageSink {
    tx: mpsc::Sender<Command>,
}

impl BufferedUsageSink {
    #[must_use]
    pub fn spawn(inner: Arc<dyn pulsegate_common::UsageSink>, config: UsageBufferConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.mailbox_capacity);
        tokio::spawn(run(inner, config, rx));
        Self { tx }
    }

    /// Force an immediate flush and wait for it to complete. Used at
    /// channel shutdown so buffered events aren't silently lost.
    pub async fn flush_and_wait(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Flush(reply)).await.is_ok() {
            let _ = rx.await;
        }
    }
}

#[async_trait::async_trait]
impl pulsegate_common::UsageSink for BufferedUsageSink {
    async fn ship(&self, events: Vec<UsageEvent>) {
        if events.is_empty() {
            return;
        }
        let _ = self.tx.send(Command::Push(events)).await;
    }
}

async fn run(inner: Arc<dyn pulsegate_common::UsageSink>, config: UsageBufferConfig, mut rx: mpsc::Receiver<Command>) {
    let mut buffer: Vec<UsageEvent> = Vec::new();
    let mut first_buffered_at: Option<Instant> = None;
    let mut tick = tokio::time::interval(Duration::from_millis(50).min(config.max_wait));

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                match cmd {
                    None => {
                        flush(&inner, &mut buffer, &mut first_buffered_at).await;
                        return;
                    }
                    Some(Command::Push(events)) => {
                        if first_buffered_at.is_none() {
                            first_buffered_at = Some(Instant::now());
                        }
                        buffer.extend(events);
                        if buffer.len() >= config.max_batch {
                            flush(&inner, &mut buffer, &mut first_buffered_at).await;
                        }
                    }
                    Some(Command::Flush(reply)) => {
                        flush(&inner, &mut buffer, &mut first_buffered_at).await;
                        let _ = reply.send(());
                    }
                }
            }
            _ = tick.tick() => {
                let elapsed = first_buffered_at.map(|t| t.elapsed() >= config.max_wait).unwrap_or(false);
                if elapsed {
                    flush(&inner, &mut buffer, &mut first_buffered_at).await;
                }
            }
        }
    }
}

async fn flush(inner: &Arc<dyn pulsegate_common::UsageSink>, buffer: &mut Vec<UsageEvent>, first_buffered_at: &mut Option<Instant>) {
    if buffer.is_empty() {
        return;
    }
    let events = std::mem::take(buffer);
    *first_buffered_at = None;
    inner.ship(events).await;
}

#[cfg(test)]
mod tests {
    use {super::*, pulsegate_protocol::UsageEventKind, std::sync::Mutex};

    #[derive(Default)]
    struct CollectingSink(Mutex<Vec<Vec<UsageEvent>>>);

    #[async_trait::async_trait]
    impl pulsegate_common::UsageSink for CollectingSink {
        async fn ship(&self, events: Vec<UsageEvent>) {
            self.0.lock().unwrap().push(events);
        }
    }

    fn event(n: i64) -> UsageEvent {
        UsageEvent { project_id: "p".into(), key_id: "k".into(), event: UsageEventKind::Message, payload_length: None, timestamp: n }
    }

    #[tokio::test]
    async fn flushes_once_batch_size_is_reached() {
        let inner = Arc::new(CollectingSink::default());
        let buffered = BufferedUsageSink::spawn(inner.clone(), UsageBufferConfig { max_batch: 2, max_wait: Duration::from_secs(60), mailbox_capacity: 8 });

        pulsegate_common::UsageSink::ship(&buffered, vec![event(1)]).await;
        pulsegate_common::UsageSink::ship(&buffered, vec![event(2)]).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        let flushes = inner.0.lock().unwrap();
        assert_eq!(flushes.len(), 1);
        assert_eq!(flushes[0].len(), 2);
    }

    #[tokio::test]
    async fn explicit_flush_delivers_a_partial_batch() {
        let inner = Arc::new(CollectingSink::default());
        let buffered = BufferedUsageSink::spawn(inner.clone(), UsageBufferConfig { max_batch: 50, max_wait: Duration::from_secs(60), mailbox_capacity: 8 });

        pulsegate_common::UsageSink::ship(&buffered, vec![event(1)]).await;
        buffered.flush_and_wait().await;

        let flushes = inner.0.lock().unwrap();
        assert_eq!(flushes.len(), 1);
        assert_eq!(flushes[0].len(), 1);
    }
}
