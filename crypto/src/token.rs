//! The Token authenticated symmetric envelope:
//!
//!   IV(16) || AES-CBC(PKCS7(plaintext), enc_key, IV) || HMAC-SHA256(sig_key, IV||CT)
//!
//! This deliberately omits the version byte and timestamp of the canonical
//! Fernet spec it otherwise resembles, to save overhead on bitrate-limited
//! links and to avoid leaking initiator timing metadata.

use crate::aes_cbc::{self, Width, IV_LEN};
use crate::error::{CryptoError, Result};
use crate::kdf::{hmac_sha256, hmac_sha256_verify};
use crate::rng;

const HMAC_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// 16-byte AES key + 16-byte HMAC key.
    Aes128,
    /// 32-byte AES key + 32-byte HMAC key.
    Aes256,
}

impl KeyMode {
    fn half_len(self) -> usize {
        match self {
            KeyMode::Aes128 => 16,
            KeyMode::Aes256 => 32,
        }
    }

    fn width(self) -> Width {
        match self {
            KeyMode::Aes128 => Width::Aes128,
            KeyMode::Aes256 => Width::Aes256,
        }
    }

    pub fn key_len(self) -> usize {
        self.half_len() * 2
    }
}

/// Generates `mode.key_len()` bytes of CSPRNG output: the concatenation of
/// an AES key and an HMAC key.
pub fn generate_key(mode: KeyMode) -> Vec<u8> {
    let mut key = vec![0u8; mode.key_len()];
    rng::fill(&mut key);
    key
}

fn split_key(mode: KeyMode, key: &[u8]) -> Result<(&[u8], &[u8])> {
    if key.len() != mode.key_len() {
        return Err(CryptoError::InvalidKeyLength { expected: mode.key_len(), got: key.len() });
    }
    Ok(key.split_at(mode.half_len()))
}

pub fn encrypt(mode: KeyMode, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let (enc_key, sig_key) = split_key(mode, key)?;

    let mut iv = [0u8; IV_LEN];
    rng::fill(&mut iv);

    let ciphertext = aes_cbc::encrypt(mode.width(), enc_key, &iv, plaintext);

    let mut signed = Vec::with_capacity(IV_LEN + ciphertext.len());
    signed.extend_from_slice(&iv);
    signed.extend_from_slice(&ciphertext);
    let tag = hmac_sha256(sig_key, &signed);

    let mut token = signed;
    token.extend_from_slice(&tag);
    Ok(token)
}

pub fn decrypt(mode: KeyMode, key: &[u8], token: &[u8]) -> Result<Vec<u8>> {
    let (enc_key, sig_key) = split_key(mode, key)?;

    // Structural minimum: IV + one padded ciphertext block + HMAC tag.
    let minimum = IV_LEN + 16 + HMAC_LEN;
    if token.len() < minimum {
        log::debug!("token: rejected, {} bytes is below the structural minimum of {}", token.len(), minimum);
        return Err(CryptoError::TokenTooShort(token.len()));
    }

    let (signed, tag) = token.split_at(token.len() - HMAC_LEN);
    if !hmac_sha256_verify(sig_key, signed, tag) {
        log::debug!("token: hmac verification failed");
        return Err(CryptoError::InvalidHmac);
    }

    let iv: [u8; IV_LEN] = signed[..IV_LEN].try_into().expect("checked length above");
    let ciphertext = &signed[IV_LEN..];

    aes_cbc::decrypt(mode.width(), enc_key, &iv, ciphertext)
}
