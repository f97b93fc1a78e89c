use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link is not in a state that permits this operation")]
    NotReady,

    #[error(transparent)]
    Crypto(#[from] crypto::error::CryptoError),

    #[error(transparent)]
    Identity(#[from] identity::error::IdentityError),

    #[error(transparent)]
    Destination(#[from] destination::error::DestinationError),

    #[error(transparent)]
    Packet(#[from] packet::PacketError),

    #[error("handshake payload is the wrong size: expected {expected}, got {got}")]
    MalformedHandshake { expected: usize, got: usize },

    #[error("proof signature does not verify against the destination identity")]
    InvalidProof,

    #[error("payload of {len} bytes exceeds the link's {mdu}-byte mdu")]
    PayloadTooLarge { mdu: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, LinkError>;
