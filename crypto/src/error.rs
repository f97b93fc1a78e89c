use thiserror::Error;

/// Errors surfaced by the crypto primitives. Per the propagation policy,
/// callers one layer up treat these as adversarial-input signals: log and
/// drop, don't panic, don't bubble all the way to the application.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("token too short to contain iv+hmac: {0} bytes")]
    TokenTooShort(usize),

    #[error("hmac verification failed")]
    InvalidHmac,

    #[error("pkcs7 unpadding failed")]
    InvalidPadding,

    #[error("ed25519 signature did not verify")]
    InvalidSignature,

    #[error("x25519/ed25519 key material was malformed")]
    MalformedKey,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
