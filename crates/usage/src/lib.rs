//! Usage shipper (component H): batches observed billable events in
//! memory and best-effort delivers them to an HTTP webhook, HMAC-signed,
//! with backoff-and-drop on persistent failure.
//!
//! - [`signing`] — outbound HMAC-SHA-256 signing
//! - [`http_sink`] — the retrying HTTP delivery leg
//! - [`buffer`] — batch-size/max-wait buffering in front of the HTTP sink
//! - [`noop`] — discard-everything sink for webhook-less deployments

pub mod buffer;
pub mod http_sink;
pub mod noop;
pub mod signing;

pub use {buffer::{BufferedUsageSink, UsageBufferConfig}, http_sink::{HttpSinkConfig, HttpUsageSink}, noop::NoopUsageSink, signing::sign_body};
