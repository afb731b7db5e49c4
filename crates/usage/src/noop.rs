//! Fallback sink for deployments that run without a usage webhook
//! configured. Events are simply discarded; the gateway binary wires this
//! in when `PULSEGATE_WEBHOOK_URL` is absent instead of leaving the channel
//! actor's usage flush with nowhere to send events.

use pulsegate_protocol::UsageEvent;

#[derive(Default)]
pub struct NoopUsageSink;

#[async_trait::async_trait]
impl pulsegate_common::UsageSink for NoopUsageSink {
    async fn ship(&self, _events: Vec<UsageEvent>) {}
}
