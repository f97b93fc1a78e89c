//! Ed25519 signing and verification.

use crate::error::{CryptoError, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SECRET_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

pub fn generate() -> SigningKey {
    SigningKey::generate(&mut rand_core::OsRng)
}

pub fn signing_key_from_bytes(bytes: &[u8]) -> Result<SigningKey> {
    let arr: [u8; SECRET_KEY_LEN] = bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength { expected: SECRET_KEY_LEN, got: bytes.len() })?;
    Ok(SigningKey::from_bytes(&arr))
}

pub fn verifying_key_from_bytes(bytes: &[u8]) -> Result<VerifyingKey> {
    let arr: [u8; PUBLIC_KEY_LEN] = bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength { expected: PUBLIC_KEY_LEN, got: bytes.len() })?;
    VerifyingKey::from_bytes(&arr).map_err(|_| CryptoError::MalformedKey)
}

pub fn sign(key: &SigningKey, msg: &[u8]) -> [u8; SIGNATURE_LEN] {
    key.sign(msg).to_bytes()
}

pub fn verify(key: &VerifyingKey, sig: &[u8], msg: &[u8]) -> Result<()> {
    let sig_arr: [u8; SIGNATURE_LEN] =
        sig.try_into().map_err(|_| CryptoError::InvalidSignature)?;
    let signature = Signature::from_bytes(&sig_arr);
    key.verify(msg, &signature).map_err(|_| CryptoError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let key = generate();
        let verifying = key.verifying_key();
        let msg = b"reticulum";

        let sig = sign(&key, msg);
        assert!(verify(&verifying, &sig, msg).is_ok());
    }

    #[test]
    fn tampered_message_fails_verification() {
        let key = generate();
        let verifying = key.verifying_key();

        let sig = sign(&key, b"reticulum");
        assert!(verify(&verifying, &sig, b"reticulu0").is_err());
    }
}
