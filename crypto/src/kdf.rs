//! HKDF-SHA256 and HMAC-SHA256 used for session-key derivation and
//! per-packet proofs.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// `HKDF(shared, salt) -> len` bytes, no `info` (matches the spec's
/// derivation calls, which never pass an info string).
pub fn derive(shared: &[u8], salt: &[u8], len: usize) -> Vec<u8> {
    let hk = Hkdf::<Sha256>::new(Some(salt), shared);
    let mut okm = vec![0u8; len];
    hk.expand(&[], &mut okm).expect("hkdf output length is bounded by 255*32 bytes");
    okm
}

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Constant-time HMAC verification (via `Mac::verify_slice`).
pub fn hmac_sha256_verify(key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(data);
    mac.verify_slice(tag).is_ok()
}
