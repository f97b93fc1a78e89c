//! The two-message Link handshake of §4.5: LINKREQUEST then PROOF.
//!
//! Both sides generate a fresh ephemeral X25519 keypair for the life of the
//! link, so the ECDH that seeds session keys is ephemeral-ephemeral and
//! forward-secret; the responder signs the proof with the destination's
//! long-term Ed25519 key so the initiator can check it against an identity
//! it already trusts. This resolves the literal wording in favor of
//! forward secrecy: a responder proof built only from its long-term X25519
//! key would make `responder_ephemeral_pub` in the wire format meaningless.

use common_types::Hash16;
use crypto::token::KeyMode;
use crypto::{kdf, x25519};
use ed25519_dalek::{Signature, SigningKey, VerifyingKey, SIGNATURE_LENGTH};
use identity::Identity;
use rand_core::OsRng;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroizing;

use crate::error::{LinkError, Result};

const X25519_PUB_LEN: usize = 32;
const ED25519_PUB_LEN: usize = 32;
pub const REQUEST_PAYLOAD_LEN: usize = X25519_PUB_LEN + ED25519_PUB_LEN;
pub const PROOF_PAYLOAD_LEN: usize = X25519_PUB_LEN + ED25519_PUB_LEN + SIGNATURE_LENGTH;

/// Session key material, already split by `crypto::token` convention (first
/// half AES, second half HMAC) and sized for `KeyMode::Aes256`. Zeroized on
/// drop so a closed Link doesn't leave derived key bytes sitting in memory.
pub type SessionKeys = Zeroizing<Vec<u8>>;

/// The initiator's per-link ephemeral keys, held until the proof arrives.
pub struct PendingRequest {
    pub x25519_private: StaticSecret,
    pub ed25519_signing: SigningKey,
}

impl PendingRequest {
    pub fn generate() -> Self {
        PendingRequest { x25519_private: x25519::generate(), ed25519_signing: SigningKey::generate(&mut OsRng) }
    }

    /// `ephemeral_x25519_pub(32) || ephemeral_ed25519_pub(32)`.
    pub fn request_payload(&self) -> [u8; REQUEST_PAYLOAD_LEN] {
        let mut out = [0u8; REQUEST_PAYLOAD_LEN];
        out[..32].copy_from_slice(X25519Public::from(&self.x25519_private).as_bytes());
        out[32..].copy_from_slice(self.ed25519_signing.verifying_key().as_bytes());
        out
    }
}

pub fn link_id_from_request(request_payload: &[u8]) -> Hash16 {
    Hash16::of(&[request_payload])
}

pub struct ParsedRequest {
    pub initiator_x25519_public: X25519Public,
    pub initiator_ed25519_public: VerifyingKey,
}

pub fn parse_request(payload: &[u8]) -> Result<ParsedRequest> {
    if payload.len() != REQUEST_PAYLOAD_LEN {
        return Err(LinkError::MalformedHandshake { expected: REQUEST_PAYLOAD_LEN, got: payload.len() });
    }
    let initiator_x25519_public = x25519::public_from_bytes(&payload[..32])?;
    let initiator_ed25519_public =
        crypto::ed25519::verifying_key_from_bytes(&payload[32..64]).map_err(LinkError::from)?;
    Ok(ParsedRequest { initiator_x25519_public, initiator_ed25519_public })
}

/// Built by the responder: its own ephemeral X25519 keypair plus the
/// session keys derived against the initiator's ephemeral public key.
pub struct ResponderHandshake {
    pub x25519_private: StaticSecret,
    pub session_keys: SessionKeys,
}

impl ResponderHandshake {
    pub fn derive(link_id: &Hash16, initiator_x25519_public: &X25519Public) -> Self {
        let x25519_private = x25519::generate();
        let shared = x25519::ecdh(&x25519_private, initiator_x25519_public);
        let session_keys = Zeroizing::new(kdf::derive(&shared, link_id.as_bytes(), KeyMode::Aes256.key_len()));
        ResponderHandshake { x25519_private, session_keys }
    }

    /// `responder_ephemeral_pub(64) || signature(64)`, where
    /// `responder_ephemeral_pub` is this link's fresh X25519 public key
    /// concatenated with the destination's long-term Ed25519 public key
    /// (not a fresh Ed25519 key: the initiator verifies against the
    /// identity it already trusts, not against bytes carried in the proof).
    pub fn proof_payload(&self, link_id: &Hash16, destination_signing: &SigningKey) -> Vec<u8> {
        let responder_ephemeral_pub = self.ephemeral_pub(destination_signing);

        let mut signed = Vec::with_capacity(Hash16::LEN + REQUEST_PAYLOAD_LEN);
        signed.extend_from_slice(link_id.as_bytes());
        signed.extend_from_slice(&responder_ephemeral_pub);
        let signature: Signature = destination_signing.sign(&signed);

        let mut out = Vec::with_capacity(PROOF_PAYLOAD_LEN);
        out.extend_from_slice(&responder_ephemeral_pub);
        out.extend_from_slice(&signature.to_bytes());
        out
    }

    fn ephemeral_pub(&self, destination_signing: &SigningKey) -> [u8; REQUEST_PAYLOAD_LEN] {
        let mut out = [0u8; REQUEST_PAYLOAD_LEN];
        out[..32].copy_from_slice(X25519Public::from(&self.x25519_private).as_bytes());
        out[32..].copy_from_slice(destination_signing.verifying_key().as_bytes());
        out
    }
}

/// Verifies a PROOF payload against the already-known destination identity
/// and, on success, derives the same session keys the responder derived.
pub fn verify_proof(
    link_id: &Hash16,
    destination_identity: &Identity,
    pending: &PendingRequest,
    proof_payload: &[u8],
) -> Result<SessionKeys> {
    if proof_payload.len() != PROOF_PAYLOAD_LEN {
        return Err(LinkError::MalformedHandshake { expected: PROOF_PAYLOAD_LEN, got: proof_payload.len() });
    }

    let responder_ephemeral_pub = &proof_payload[..REQUEST_PAYLOAD_LEN];
    let signature_bytes = &proof_payload[REQUEST_PAYLOAD_LEN..];

    let mut signed = Vec::with_capacity(Hash16::LEN + REQUEST_PAYLOAD_LEN);
    signed.extend_from_slice(link_id.as_bytes());
    signed.extend_from_slice(responder_ephemeral_pub);

    destination_identity.verify(signature_bytes, &signed).map_err(|_| LinkError::InvalidProof)?;

    let responder_x25519_public = x25519::public_from_bytes(&responder_ephemeral_pub[..32])?;
    let shared = x25519::ecdh(&pending.x25519_private, &responder_x25519_public);
    Ok(Zeroizing::new(kdf::derive(&shared, link_id.as_bytes(), KeyMode::Aes256.key_len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use identity::PrivateIdentity;

    #[test]
    fn handshake_derives_matching_session_keys() {
        let destination = PrivateIdentity::new();

        let initiator = PendingRequest::generate();
        let request_payload = initiator.request_payload();
        let link_id = link_id_from_request(&request_payload);

        let parsed = parse_request(&request_payload).unwrap();
        let responder = ResponderHandshake::derive(&link_id, &parsed.initiator_x25519_public);

        let proof_payload = responder.proof_payload(&link_id, &destination_signing_key(&destination));

        let session_keys =
            verify_proof(&link_id, &destination.public(), &initiator, &proof_payload).unwrap();

        assert_eq!(session_keys, responder.session_keys);
    }

    #[test]
    fn tampered_proof_fails_verification() {
        let destination = PrivateIdentity::new();
        let initiator = PendingRequest::generate();
        let request_payload = initiator.request_payload();
        let link_id = link_id_from_request(&request_payload);

        let parsed = parse_request(&request_payload).unwrap();
        let responder = ResponderHandshake::derive(&link_id, &parsed.initiator_x25519_public);
        let mut proof_payload = responder.proof_payload(&link_id, &destination_signing_key(&destination));
        let last = proof_payload.len() - 1;
        proof_payload[last] ^= 0x01;

        assert!(verify_proof(&link_id, &destination.public(), &initiator, &proof_payload).is_err());
    }

    fn destination_signing_key(identity: &PrivateIdentity) -> SigningKey {
        SigningKey::from_bytes(&identity.to_private_bytes()[32..64].try_into().unwrap())
    }
}
