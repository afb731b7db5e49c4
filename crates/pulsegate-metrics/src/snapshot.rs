//! Metrics snapshot for internal API consumption.
//!
//! Gives the gateway's diagnostic surface a structured JSON view of the
//! metrics that would otherwise only be legible in Prometheus text format.

use {
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// Type of metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

/// A single metric value with its labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub labels: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A complete snapshot of all metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Timestamp when the snapshot was taken (Unix millis)
    pub timestamp: u64,
    pub metrics: Vec<MetricSnapshot>,
    pub categories: MetricCategories,
}

/// Metrics organized by category for easier consumption
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricCategories {
    pub http: CategoryMetrics,
    pub grant: CategoryMetrics,
    pub channel: CategoryMetrics,
    pub usage: CategoryMetrics,
    pub system: SystemMetrics,
}

/// Generic category metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryMetrics {
    pub total: u64,
    pub errors: u64,
    pub active: u64,
}

/// System-level metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub uptime_seconds: f64,
    pub connected_clients: u64,
    pub version: Option<String>,
}

impl MetricsSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self {
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            metrics: Vec::new(),
            categories: MetricCategories::default(),
        }
    }

    /// Parse Prometheus text format into a structured snapshot.
    ///
    /// Best-effort: extracts metric name/labels/value triples from the
    /// exposition format, skipping anything it can't parse cleanly.
    #[must_use]
    pub fn from_prometheus_text(text: &str) -> Self {
        let mut snapshot = Self::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(metric) = parse_prometheus_line(line) {
                update_categories(&mut snapshot.categories, &metric);
                snapshot.metrics.push(metric);
            }
        }

        snapshot
    }
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_prometheus_line(line: &str) -> Option<MetricSnapshot> {
    let (name_and_labels, value_str) = line.rsplit_once(' ')?;
    let value: f64 = value_str.parse().ok()?;

    let (name, labels) = if let Some(brace_start) = name_and_labels.find('{') {
        let name = &name_and_labels[..brace_start];
        let labels_str = name_and_labels
            .get(brace_start + 1..name_and_labels.len() - 1)
            .unwrap_or("");
        (name, parse_labels(labels_str))
    } else {
        (name_and_labels, HashMap::new())
    };

    let metric_type = if name.ends_with("_total") || name.ends_with("_count") {
        MetricType::Counter
    } else if name.ends_with("_bucket") || name.ends_with("_sum") {
        return None;
    } else {
        MetricType::Gauge
    };

    Some(MetricSnapshot {
        name: name.to_string(),
        metric_type,
        labels,
        value: Some(value),
        description: None,
    })
}

fn parse_labels(labels_str: &str) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    if labels_str.is_empty() {
        return labels;
    }
    for part in labels_str.split(',') {
        if let Some((key, value)) = part.split_once('=') {
            labels.insert(key.to_string(), value.trim_matches('"').to_string());
        }
    }
    labels
}

fn update_categories(categories: &mut MetricCategories, metric: &MetricSnapshot) {
    let name = &metric.name;
    let value = metric.value.unwrap_or(0.0) as u64;

    if name.starts_with("pulsegate_http_requests_total") {
        categories.http.total += value;
    } else if name.starts_with("pulsegate_http_requests_in_flight") {
        categories.http.active = value;
    } else if name.starts_with("pulsegate_grant_issued_total") {
        categories.grant.total += value;
    } else if name.starts_with("pulsegate_grant_denied_total")
        || name.starts_with("pulsegate_grant_rate_limited_total")
    {
        categories.grant.errors += value;
    } else if name.starts_with("pulsegate_channel_connections_total") {
        categories.channel.total += value;
    } else if name.starts_with("pulsegate_channel_connections_active") {
        categories.channel.active = value;
        categories.system.connected_clients = value;
    } else if name.starts_with("pulsegate_channel_publish_rejected_total") {
        categories.channel.errors += value;
    } else if name.starts_with("pulsegate_usage_flush_total") {
        categories.usage.total += value;
    } else if name.starts_with("pulsegate_usage_flush_failed_total")
        || name.starts_with("pulsegate_usage_flush_dropped_total")
    {
        categories.usage.errors += value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_counter_line() {
        let metric = parse_prometheus_line("pulsegate_http_requests_total 42").unwrap();
        assert_eq!(metric.name, "pulsegate_http_requests_total");
        assert_eq!(metric.value, Some(42.0));
        assert!(metric.labels.is_empty());
    }

    #[test]
    fn parses_line_with_labels() {
        let metric = parse_prometheus_line(
            r#"pulsegate_channel_publish_total{channel="room"} 100"#,
        )
        .unwrap();
        assert_eq!(metric.value, Some(100.0));
        assert_eq!(metric.labels.get("channel"), Some(&"room".to_string()));
    }

    #[test]
    fn snapshot_aggregates_known_categories() {
        let text = "pulsegate_channel_connections_total{channel=\"room\"} 3\npulsegate_usage_flush_failed_total 1\n";
        let snapshot = MetricsSnapshot::from_prometheus_text(text);
        assert_eq!(snapshot.categories.channel.total, 3);
        assert_eq!(snapshot.categories.usage.errors, 1);
    }
}
