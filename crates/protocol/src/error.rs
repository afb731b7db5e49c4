//! Error taxonomy shared by the protocol layer.
//!
//! Named variants, not string blobs — callers at the channel/grant boundary
//! map these onto close codes or ACK error codes, they never format these
//! directly to a client.

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame exceeds maximum size of {max} bytes")]
    FrameTooLarge { max: usize },

    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("channel name {0:?} does not match [A-Za-z0-9._:-]{{1,64}}")]
    InvalidChannel(String),

    #[error("topic {0:?} does not match [A-Za-z0-9_]{{1,64}} or '*'")]
    InvalidTopic(String),

    #[error("grant carries {count} topics, more than the allowed {max}")]
    TooManyTopics { count: usize, max: usize },

    #[error("grant must carry at least one topic")]
    EmptyTopics,
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
