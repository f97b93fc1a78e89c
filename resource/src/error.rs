use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("stream id {0} is out of the 15-bit peer-scoped range")]
    InvalidStreamId(u16),

    #[error(transparent)]
    Channel(#[from] channel::ChannelError),

    #[error(transparent)]
    Link(#[from] link::LinkError),

    #[error("resource advertise payload is malformed")]
    MalformedAdvertise,

    #[error("resource transfer exceeded its {0:?} deadline")]
    Timeout(std::time::Duration),

    #[error("resource segment {0} exhausted its retry budget")]
    RetriesExhausted(u32),

    #[error("reassembled payload hash does not match the advertised hash")]
    HashMismatch,

    #[error("resource transfer was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ResourceError>;
