use pulsegate_protocol::CloseCode;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("connection not authenticated")]
    NotAuthenticated,
    #[error("grant does not permit this operation")]
    Forbidden,
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("egress buffer exhausted")]
    BackpressureExceeded,
    #[error("channel actor is shutting down")]
    ActorGone,
}

impl ChannelError {
    #[must_use]
    pub fn close_code(&self) -> CloseCode {
        match self {
            ChannelError::NotAuthenticated => CloseCode::Unauthorized,
            ChannelError::Forbidden => CloseCode::Forbidden,
            ChannelError::Malformed(_) => CloseCode::BadRequest,
            ChannelError::BackpressureExceeded => CloseCode::Conflict,
            ChannelError::ActorGone => CloseCode::PreconditionFailed,
        }
    }
}
