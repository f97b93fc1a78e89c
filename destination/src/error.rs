use thiserror::Error;

#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("destination name component '{0}' contains a forbidden '.'")]
    DotInComponent(String),

    #[error(transparent)]
    Identity(#[from] identity::IdentityError),

    #[error(transparent)]
    Crypto(#[from] crypto::CryptoError),

    #[error("announce payload is too short to contain public keys and a signature")]
    AnnounceTooShort,

    #[error("announce app_data_len field does not match the remaining payload length")]
    AnnounceLengthMismatch,

    #[error("announce destination hash does not match the recomputed hash for this name")]
    AnnounceHashMismatch,
}

pub type Result<T> = std::result::Result<T, DestinationError>;
