//! Channel actor stack (component G) plus its supporting monotonic
//! timing/id machinery (component I):
//!
//! - [`id`] — monotonic ULID-like `serverMsgId` factory
//! - [`clock`] — monotonic clock for the `t_*` latency fields
//! - [`connection`] — per-connection state owned by the actor
//! - [`actor`] — the per-channel mailbox/state-machine itself
//! - [`registry`] — lazy per-`(projectId, channelName, locationHint)` actor lookup
//! - [`error`] — error taxonomy mapped to close codes

pub mod actor;
pub mod clock;
pub mod connection;
pub mod error;
pub mod id;
pub mod registry;

pub use {
    actor::{spawn, ActorCommand, ChannelConfig, ChannelHandle, ConnId},
    clock::MonotonicClock,
    connection::{ConnectionState, Outbound},
    error::ChannelError,
    id::MonotonicUlidFactory,
    registry::ChannelRegistry,
};
