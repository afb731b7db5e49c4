//! Wire types for the pulsegate publish/subscribe gateway: the grant data
//! model (component A's payload), the frame codec (component F), and the
//! usage event shape that feeds the usage shipper (component H).
//!
//! This crate is intentionally inert: no I/O, no clocks, no signing. It
//! defines the shapes and the pure validation/normalization rules that the
//! rest of the workspace builds behavior on top of.

pub mod constants;
pub mod envelope;
pub mod error;
pub mod grant;

pub use {
    constants::*,
    envelope::{Ack, AckErrorCode, AckPath, ClientFrame, CloseCode, MessageBody, ServerFrame, UsageEvent, UsageEventKind},
    error::{ProtocolError, Result},
    grant::{clamp_expiry, normalize_topics, validate_request, Grant, GrantRequest, Scope, TopicGrant},
};
