//! HTTP delivery of usage events (component H's outbound leg): sign, POST,
//! retry with exponential backoff and jitter, drop after a retry cap.
//! Delivery is best-effort by contract — `ship` never returns an error to
//! its caller, it only logs and, on the metrics feature, counts outcomes.

use {
    crate::signing::sign_body,
    pulsegate_protocol::UsageEvent,
    std::time::Duration,
};

#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    pub url: String,
    pub secret: String,
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub request_timeout: Duration,
}

impl HttpSinkConfig {
    #[must_use]
    pub fn new(url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            secret: secret.into(),
            max_retries: 5,
            base_backoff: Duration::from_millis(200),
            request_timeout: Duration::from_secs(5),
        }
    }
}

pub struct HttpUsageSink {
    client: reqwest::Client,
    config: HttpSinkConfig,
}

impl HttpUsageSink {
    #[must_use]
    pub fn new(config: HttpSinkConfig) -> Self {
        let client = reqwest::Client::builder().timeout(config.request_timeout).build().unwrap_or_default();
        Self { client, config }
    }

    async fn deliver_once(&self, body: &[u8], signature: &str) -> bool {
        match self.client.post(&self.config.url).header("X-Hmac", signature).header("Content-Type", "application/json").body(body.to_vec()).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                tracing::debug!(error = %err, "usage flush request failed");
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl pulsegate_common::UsageSink for HttpUsageSink {
    async fn ship(&self, events: Vec<UsageEvent>) {
        if events.is_empty() {
            return;
        }
        let count = events.len();
        let body = match serde_json::to_vec(&events) {
            Ok(b) => b,
            Err(err) => {
                tracing::warn!(error = %err, "usage events failed to serialize, dropping batch");
                return;
            }
        };
        let signature = sign_body(&body, &self.config.secret);

        for attempt in 0..=self.config.max_retries {
            if self.deliver_once(&body, &signature).await {
                record_flush(count, true);
                return;
            }
            if attempt == self.config.max_retries {
                break;
            }
            tokio::time::sleep(backoff_with_jitter(self.config.base_backoff, attempt)).await;
        }
        tracing::warn!(dropped = count, "usage flush dropped after exhausting retries");
        record_flush(count, false);
    }
}

fn backoff_with_jitter(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(1u32 << attempt.min(8));
    let jitter_frac = rand::random::<f64>() * 0.5;
    exp.mul_f64(1.0 + jitter_frac)
}

#[cfg(not(feature = "metrics"))]
fn record_flush(_count: usize, _ok: bool) {}

#[cfg(feature = "metrics")]
fn record_flush(count: usize, ok: bool) {
    if ok {
        metrics::counter!(pulsegate_metrics::usage::FLUSH_TOTAL).increment(1);
    } else {
        metrics::counter!(pulsegate_metrics::usage::FLUSH_FAILED_TOTAL).increment(1);
        metrics::counter!(pulsegate_metrics::usage::FLUSH_DROPPED_TOTAL).increment(count as u64);
    }
}

#[cfg(test)]
mod tests {
    use {super::*, pulsegate_common::UsageSink, pulsegate_protocol::UsageEventKind};

    fn event() -> UsageEvent {
        UsageEvent { project_id: "p".into(), key_id: "k".into(), event: UsageEventKind::Message, payload_length: Some(3), timestamp: 0 }
    }

    #[tokio::test]
    async fn delivers_successfully_on_first_try() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/usage").match_header("x-hmac", mockito::Matcher::Any).with_status(200).create_async().await;

        let sink = HttpUsageSink::new(HttpSinkConfig::new(format!("{}/usage", server.url()), "secret"));
        sink.ship(vec![event()]).await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn drops_after_exhausting_retries_on_persistent_failure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/usage").with_status(500).expect_at_least(1).create_async().await;

        let mut config = HttpSinkConfig::new(format!("{}/usage", server.url()), "secret");
        config.max_retries = 1;
        config.base_backoff = Duration::from_millis(1);
        let sink = HttpUsageSink::new(config);
        sink.ship(vec![event()]).await; // should not panic or hang

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_batch_sends_no_request() {
        let server = mockito::Server::new_async().await;
        let sink = HttpUsageSink::new(HttpSinkConfig::new(format!("{}/usage", server.url()), "secret"));
        sink.ship(vec![]).await;
    }
}
