//! Identity: a pair of long-term keys (X25519 for ECDH, Ed25519 for
//! signing) plus their 16-byte truncated identity hash.
//!
//! `Identity` is the public half (what you learn about a peer); a holder
//! of the matching private scalars wraps them in `PrivateIdentity`, the
//! only place those scalars live in memory. Both implement the encrypt/
//! decrypt and sign/verify halves of §4.1.

pub mod error;

use common_types::Hash16;
pub use error::{IdentityError, Result};
use ed25519_dalek::{SigningKey, VerifyingKey};
use std::sync::Mutex;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};

use crypto::timing::TimingPad;
use crypto::token::{self, KeyMode};
use crypto::{ed25519, kdf, x25519};

pub const PUBLIC_LEN: usize = 64;
pub const PRIVATE_LEN: usize = 64;

/// The public half of an identity: an X25519 public key and an Ed25519
/// verifying key, concatenated as the 64-byte "public form" of §3.
#[derive(Clone)]
pub struct Identity {
    x25519_public: X25519Public,
    ed25519_verifying: VerifyingKey,
}

impl Identity {
    pub fn new_from_public_keys(x25519_public: X25519Public, ed25519_verifying: VerifyingKey) -> Self {
        Identity { x25519_public, ed25519_verifying }
    }

    pub fn from_public_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PUBLIC_LEN {
            return Err(IdentityError::Malformed("public identity must be 64 bytes"));
        }
        let x25519_public = x25519::public_from_bytes(&bytes[..32])?;
        let ed25519_verifying = ed25519::verifying_key_from_bytes(&bytes[32..64])?;
        Ok(Identity { x25519_public, ed25519_verifying })
    }

    pub fn to_public_bytes(&self) -> [u8; PUBLIC_LEN] {
        let mut out = [0u8; PUBLIC_LEN];
        out[..32].copy_from_slice(self.x25519_public.as_bytes());
        out[32..].copy_from_slice(self.ed25519_verifying.as_bytes());
        out
    }

    /// Leading 16 bytes of SHA-256 over the public form.
    pub fn hash(&self) -> Hash16 {
        let public = self.to_public_bytes();
        Hash16::of(&[&public])
    }

    pub fn verify(&self, sig: &[u8], msg: &[u8]) -> Result<()> {
        ed25519::verify(&self.ed25519_verifying, sig, msg).map_err(Into::into)
    }

    pub fn x25519_public(&self) -> &X25519Public {
        &self.x25519_public
    }

    pub fn ed25519_verifying(&self) -> &VerifyingKey {
        &self.ed25519_verifying
    }

    /// Asymmetric encrypt to this identity: sample an ephemeral X25519
    /// keypair, ECDH against this identity's public key, derive a Token
    /// key with HKDF salted by this identity's hash, and Token-encrypt.
    /// Returns `ephemeral_pub(32) || Token(plaintext, key)`.
    pub fn encrypt_for(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let ephemeral_private = x25519::generate();
        let ephemeral_public = X25519Public::from(&ephemeral_private);

        let shared = x25519::ecdh(&ephemeral_private, &self.x25519_public);
        let key = kdf::derive(&shared, self.hash().as_bytes(), KeyMode::Aes128.key_len());

        let body = token::encrypt(KeyMode::Aes128, &key, plaintext)?;

        let mut out = Vec::with_capacity(32 + body.len());
        out.extend_from_slice(ephemeral_public.as_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }
}

/// The private half: the two secret scalars, plus the padded-signing
/// machinery required by §4.1.
pub struct PrivateIdentity {
    x25519_private: StaticSecret,
    ed25519_signing: SigningKey,
    sign_timing: Mutex<TimingPad>,
}

impl PrivateIdentity {
    pub fn new() -> Self {
        PrivateIdentity {
            x25519_private: x25519::generate(),
            ed25519_signing: ed25519::generate(),
            sign_timing: Mutex::new(TimingPad::new(true)),
        }
    }

    pub fn from_private_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PRIVATE_LEN {
            return Err(IdentityError::Malformed("private identity must be 64 bytes"));
        }
        let x25519_private = x25519::private_from_bytes(&bytes[..32])?;
        let ed25519_signing = ed25519::signing_key_from_bytes(&bytes[32..64])?;
        Ok(PrivateIdentity { x25519_private, ed25519_signing, sign_timing: Mutex::new(TimingPad::new(true)) })
    }

    pub fn to_private_bytes(&self) -> [u8; PRIVATE_LEN] {
        let mut out = [0u8; PRIVATE_LEN];
        out[..32].copy_from_slice(&self.x25519_private.to_bytes());
        out[32..].copy_from_slice(self.ed25519_signing.as_bytes());
        out
    }

    pub fn public(&self) -> Identity {
        Identity {
            x25519_public: X25519Public::from(&self.x25519_private),
            ed25519_verifying: self.ed25519_signing.verifying_key(),
        }
    }

    pub fn hash(&self) -> Hash16 {
        self.public().hash()
    }

    pub fn x25519_private(&self) -> &StaticSecret {
        &self.x25519_private
    }

    pub fn ed25519_signing(&self) -> &SigningKey {
        &self.ed25519_signing
    }

    /// Signs `msg`, padding wall-clock latency up to the rolling maximum
    /// observed over recent signs (§4.1 timing-inference mitigation).
    pub fn sign(&self, msg: &[u8]) -> [u8; 64] {
        let mut timing = self.sign_timing.lock().expect("sign_timing mutex poisoned");
        timing.run(|| ed25519::sign(&self.ed25519_signing, msg))
    }

    /// Asymmetric decrypt addressed to this identity: split the leading 32
    /// bytes as the sender's ephemeral X25519 public key, ECDH against our
    /// private key, derive the Token key with HKDF salted by our own
    /// identity hash, and Token-decrypt the remainder.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < 32 {
            return Err(IdentityError::CiphertextTooShort);
        }
        let (ephemeral_bytes, body) = ciphertext.split_at(32);
        let ephemeral_public = x25519::public_from_bytes(ephemeral_bytes)?;

        let shared = x25519::ecdh(&self.x25519_private, &ephemeral_public);
        let key = kdf::derive(&shared, self.hash().as_bytes(), KeyMode::Aes128.key_len());

        token::decrypt(KeyMode::Aes128, &key, body).map_err(Into::into)
    }
}

impl Default for PrivateIdentity {
    fn default() -> Self {
        Self::new()
    }
}

/// Verifies that `signature` covers `destination_hash || public_keys ||
/// app_data` under `identity`'s verifying key. This is the signature half
/// of announce validation; the "identity hash matches destination hash
/// derivation" half lives in the `destination` crate, which knows how
/// destination hashes are built.
pub fn verify_announce_signature(
    identity: &Identity,
    destination_hash: &[u8],
    public_keys: &[u8; PUBLIC_LEN],
    app_data: &[u8],
    signature: &[u8],
) -> Result<()> {
    let mut signed = Vec::with_capacity(destination_hash.len() + PUBLIC_LEN + app_data.len());
    signed.extend_from_slice(destination_hash);
    signed.extend_from_slice(public_keys);
    signed.extend_from_slice(app_data);
    identity.verify(signature, &signed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let priv_id = PrivateIdentity::new();
        let pub_id = priv_id.public();
        let msg = b"reticulum identity test";

        let sig = priv_id.sign(msg);
        assert!(pub_id.verify(&sig, msg).is_ok());
    }

    #[test]
    fn encrypt_for_then_decrypt_round_trips() {
        let alice = PrivateIdentity::new();
        let bob = PrivateIdentity::new();

        let plaintext = vec![0x41u8; 256];
        let ciphertext = bob.public().encrypt_for(&plaintext).unwrap();
        let decrypted = bob.decrypt(&ciphertext).unwrap();

        assert_eq!(decrypted, plaintext);
        // unrelated identity cannot decrypt
        assert!(alice.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn private_bytes_round_trip_to_same_public_identity() {
        let priv_id = PrivateIdentity::new();
        let bytes = priv_id.to_private_bytes();
        let restored = PrivateIdentity::from_private_bytes(&bytes).unwrap();

        assert_eq!(priv_id.public().to_public_bytes(), restored.public().to_public_bytes());
    }

    #[test]
    fn identity_hash_is_deterministic() {
        let priv_id = PrivateIdentity::new();
        assert_eq!(priv_id.hash(), priv_id.public().hash());
        assert_eq!(priv_id.hash(), priv_id.public().hash());
    }
}
