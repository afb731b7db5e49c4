//! Protocol-wide constants.

/// Wire protocol version exchanged at connect time.
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum size in bytes of a single inbound frame before the codec rejects
/// it outright.
pub const MAX_FRAME_BYTES: usize = 256 * 1024;

/// Default bounded egress byte budget per connection before it is closed for
/// flow control.
pub const DEFAULT_EGRESS_BUFFER_BYTES: usize = 1024 * 1024;

/// Maximum number of topic entries a single grant may carry.
pub const MAX_TOPICS_PER_GRANT: usize = 64;

/// Heartbeat interval for idle connections.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 25;

/// Grace period within which a `Pending` connection must send a valid Connect.
pub const DEFAULT_GRACE_SECS: u64 = 10;

/// Minimum grant lifetime.
pub const GRANT_MIN_TTL_SECS: i64 = 600;

/// Maximum grant lifetime, and the default when no hint is supplied.
pub const GRANT_MAX_TTL_SECS: i64 = 7200;

/// Rate limit policy: at most this many grant issuances...
pub const RATE_LIMIT_MAX_GRANTS: u32 = 5;

/// ...per this many seconds, per `(projectId, userId)`.
pub const RATE_LIMIT_WINDOW_SECS: i64 = 2 * 3600;
