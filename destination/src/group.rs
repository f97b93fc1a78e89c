use crate::name::{hash_of, DestinationName};
use crate::Result;
use common_types::DestinationHash;
use crypto::token::{self, KeyMode};

/// A GROUP destination: no bound Identity, just a shared 32-byte symmetric
/// key (one AES-128 half plus one HMAC half) used directly as a Token key.
///
/// The canonical source double-base64-encodes on top of the Token
/// envelope here; §9 flags that as almost certainly accidental, so this
/// implementation is a plain Token envelope with no extra encoding layer.
pub struct GroupDestination {
    name: DestinationName,
    hash: DestinationHash,
    key: [u8; 32],
}

impl GroupDestination {
    pub fn new(name: DestinationName, key: [u8; 32]) -> Self {
        let hash = hash_of(&name, None);
        GroupDestination { name, hash, key }
    }

    pub fn generate(name: DestinationName) -> Self {
        let key: Vec<u8> = token::generate_key(KeyMode::Aes128);
        let mut fixed = [0u8; 32];
        fixed.copy_from_slice(&key);
        Self::new(name, fixed)
    }

    pub fn name(&self) -> &DestinationName {
        &self.name
    }

    pub fn hash(&self) -> DestinationHash {
        self.hash
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(token::encrypt(KeyMode::Aes128, &self.key, plaintext)?)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(token::decrypt(KeyMode::Aes128, &self.key, ciphertext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_round_trips_with_shared_key() {
        let name = DestinationName::new("rns_unit_tests", &["group"]).unwrap();
        let dest = GroupDestination::generate(name);

        let plaintext = b"shared secret payload".to_vec();
        let ciphertext = dest.encrypt(&plaintext).unwrap();
        assert_eq!(dest.decrypt(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn group_hash_has_no_identity_salt() {
        let name = DestinationName::new("rns_unit_tests", &["group"]).unwrap();
        let a = GroupDestination::generate(name.clone());
        let b = GroupDestination::generate(name);
        // Two GROUP destinations of the same name hash identically even
        // with different keys, since GROUP hashes don't fold in identity.
        assert_eq!(a.hash(), b.hash());
    }
}
