use thiserror::Error;

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("packet shorter than the minimum header ({0} bytes)")]
    TooShort(usize),

    #[error("packet exceeds the interface MTU ({len} > {mtu})")]
    TooLarge { len: usize, mtu: usize },

    #[error("unknown destination-type bits {0:02b}")]
    UnknownDestinationType(u8),

    #[error("unknown packet-context byte {0:#04x}")]
    UnknownContext(u8),
}

pub type Result<T> = std::result::Result<T, PacketError>;
