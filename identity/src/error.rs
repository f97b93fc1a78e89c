use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("malformed identity bytes: {0}")]
    Malformed(&'static str),

    #[error(transparent)]
    Crypto(#[from] crypto::CryptoError),

    #[error("ciphertext too short to contain an ephemeral public key")]
    CiphertextTooShort,
}

pub type Result<T> = std::result::Result<T, IdentityError>;
