use crate::error::DestinationError;
use crate::name::{hash_of, DestinationName};
use crate::Result;
use common_types::DestinationHash;
use identity::{verify_announce_signature, Identity, PrivateIdentity, PUBLIC_LEN};

const APP_DATA_LEN_FIELD: usize = 2;
const SIGNATURE_LEN: usize = 64;

/// Builds the announce wire payload of §6:
/// `public_keys(64) || app_data_len(u16) || app_data || signature(64)`,
/// with the signature covering `destination_hash || public_keys || app_data`.
pub fn build_announce(identity: &PrivateIdentity, destination_hash: &DestinationHash, app_data: &[u8]) -> Vec<u8> {
    let public_keys = identity.public().to_public_bytes();

    let mut signed = Vec::with_capacity(destination_hash.as_bytes().len() + PUBLIC_LEN + app_data.len());
    signed.extend_from_slice(destination_hash.as_bytes());
    signed.extend_from_slice(&public_keys);
    signed.extend_from_slice(app_data);
    let signature = identity.sign(&signed);

    let mut out = Vec::with_capacity(PUBLIC_LEN + APP_DATA_LEN_FIELD + app_data.len() + SIGNATURE_LEN);
    out.extend_from_slice(&public_keys);
    out.extend_from_slice(&(app_data.len() as u16).to_be_bytes());
    out.extend_from_slice(app_data);
    out.extend_from_slice(&signature);
    out
}

/// Validates that an announce is internally self-consistent: the
/// recomputed SINGLE destination hash for `name` and the identity carried
/// in the announce must equal `destination_hash`, and the signature must
/// verify. Returns the announced `Identity` on success.
pub fn validate_announce(name: &DestinationName, destination_hash: &DestinationHash, announce: &[u8]) -> Result<Identity> {
    if announce.len() < PUBLIC_LEN + APP_DATA_LEN_FIELD + SIGNATURE_LEN {
        return Err(DestinationError::AnnounceTooShort);
    }

    let public_keys: [u8; PUBLIC_LEN] = announce[..PUBLIC_LEN].try_into().expect("checked length above");
    let app_data_len = u16::from_be_bytes(
        announce[PUBLIC_LEN..PUBLIC_LEN + APP_DATA_LEN_FIELD].try_into().expect("checked length above"),
    ) as usize;

    let app_data_start = PUBLIC_LEN + APP_DATA_LEN_FIELD;
    let app_data_end = app_data_start + app_data_len;
    if announce.len() != app_data_end + SIGNATURE_LEN {
        return Err(DestinationError::AnnounceLengthMismatch);
    }

    let app_data = &announce[app_data_start..app_data_end];
    let signature = &announce[app_data_end..];

    let identity = Identity::from_public_bytes(&public_keys)?;

    let expected_hash = hash_of(name, Some(&identity.hash()));
    if &expected_hash != destination_hash {
        log::debug!("announce: destination hash mismatch for {}", name.as_string());
        return Err(DestinationError::AnnounceHashMismatch);
    }

    verify_announce_signature(&identity, destination_hash.as_bytes(), &public_keys, app_data, signature)?;

    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announce_round_trips() {
        let name = DestinationName::new("rns_unit_tests", &["announce"]).unwrap();
        let identity = PrivateIdentity::new();
        let hash = hash_of(&name, Some(&identity.hash()));

        let announce = build_announce(&identity, &hash, b"hello world");
        let validated = validate_announce(&name, &hash, &announce).unwrap();

        assert_eq!(validated.to_public_bytes(), identity.public().to_public_bytes());
    }

    #[test]
    fn tampered_app_data_fails_validation() {
        let name = DestinationName::new("rns_unit_tests", &["announce"]).unwrap();
        let identity = PrivateIdentity::new();
        let hash = hash_of(&name, Some(&identity.hash()));

        let mut announce = build_announce(&identity, &hash, b"hello world");
        let last = announce.len() - 1;
        announce[last - 20] ^= 0x01;

        assert!(validate_announce(&name, &hash, &announce).is_err());
    }
}
