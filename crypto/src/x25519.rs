//! X25519 Diffie-Hellman key agreement.

use crate::error::{CryptoError, Result};
use x25519_dalek::{PublicKey, StaticSecret};

pub const PUBLIC_KEY_LEN: usize = 32;
pub const PRIVATE_KEY_LEN: usize = 32;

pub fn generate() -> StaticSecret {
    StaticSecret::random_from_rng(rand_core::OsRng)
}

pub fn private_from_bytes(bytes: &[u8]) -> Result<StaticSecret> {
    let arr: [u8; PRIVATE_KEY_LEN] = bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength { expected: PRIVATE_KEY_LEN, got: bytes.len() })?;
    Ok(StaticSecret::from(arr))
}

pub fn public_from_bytes(bytes: &[u8]) -> Result<PublicKey> {
    let arr: [u8; PUBLIC_KEY_LEN] = bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength { expected: PUBLIC_KEY_LEN, got: bytes.len() })?;
    Ok(PublicKey::from(arr))
}

/// Shared secret is the raw X25519 output; callers must run it through
/// HKDF before using it as a symmetric key (Token key material is never the
/// raw ECDH output).
pub fn ecdh(our_private: &StaticSecret, their_public: &PublicKey) -> [u8; 32] {
    our_private.diffie_hellman(their_public).to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecdh_agrees_both_directions() {
        let a = generate();
        let b = generate();
        let a_pub = PublicKey::from(&a);
        let b_pub = PublicKey::from(&b);

        assert_eq!(ecdh(&a, &b_pub), ecdh(&b, &a_pub));
    }
}
