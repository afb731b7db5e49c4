//! Per-connection state owned exclusively by the channel actor that
//! registered it. Nothing outside `actor.rs` ever mutates these fields
//! directly — that is what "single-threaded discipline" (§5) means in
//! practice.

use {
    pulsegate_protocol::{CloseCode, Grant, ServerFrame},
    std::{
        collections::HashSet,
        sync::{atomic::AtomicUsize, Arc},
        time::Instant,
    },
    tokio::sync::mpsc,
};

/// What the actor hands across a connection's outbound mailbox: a protocol
/// frame, an instruction to close the socket with a specific application
/// close code, or a liveness probe. `Ping` is sent by the gateway's own
/// heartbeat timer (it never originates from the actor) but travels the
/// same channel so the WS writer task stays the single place that touches
/// the socket.
#[derive(Debug, Clone)]
pub enum Outbound {
    Frame(ServerFrame),
    Close(CloseCode),
    Ping,
}

/// `Pending --(valid Connect)--> Authenticated --(close|timeout|fatal)-->
/// Closing --> Closed` (§4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Pending,
    Authenticated,
    Closing,
    Closed,
}

pub(crate) struct ConnectionEntry {
    pub state: ConnectionState,
    pub grant: Option<Grant>,
    pub subscribed_topics: HashSet<String>,
    pub sender: mpsc::UnboundedSender<Outbound>,
    /// Shared with the gateway's socket-writer task: the actor increments it
    /// when a frame is handed off, the writer decrements it once the bytes
    /// are actually on the wire. Living behind an `Arc` lets the writer task
    /// observe/update it without routing every ack back through the actor's
    /// mailbox.
    pub egress_bytes: Arc<AtomicUsize>,
    pub connected_at: Instant,
    pub last_activity: Instant,
    pub missed_heartbeats: u8,
}

impl ConnectionEntry {
    pub fn new(sender: mpsc::UnboundedSender<Outbound>, now: Instant) -> Self {
        Self {
            state: ConnectionState::Pending,
            grant: None,
            subscribed_topics: HashSet::new(),
            sender,
            egress_bytes: Arc::new(AtomicUsize::new(0)),
            connected_at: now,
            last_activity: now,
            missed_heartbeats: 0,
        }
    }
}
