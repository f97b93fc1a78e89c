use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel has a packet in flight; one envelope at a time")]
    LinkNotReady,

    #[error("packed envelope of {len} bytes exceeds the link mdu of {mdu}")]
    TooBig { len: usize, mdu: usize },

    #[error("channel is closed")]
    Closed,

    #[error("envelope shorter than the 6-byte header")]
    EnvelopeTooShort,

    #[error("msgtype {0:#06x} is reserved for system messages")]
    ReservedMsgType(u16),

    #[error(transparent)]
    Link(#[from] link::LinkError),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
