use crate::name::{hash_of, DestinationName};
use common_types::DestinationHash;

/// A PLAIN destination holds no key material; "encrypt" and "decrypt" are
/// both the identity function.
///
/// §9 flags that the canonical source's PLAIN `decrypt` references an
/// unbound local and its behavior is undefined; this implementation
/// resolves that by specifying decrypt (and encrypt) as identity, per the
/// spec's instruction.
pub struct PlainDestination {
    name: DestinationName,
    hash: DestinationHash,
}

impl PlainDestination {
    pub fn new(name: DestinationName) -> Self {
        let hash = hash_of(&name, None);
        PlainDestination { name, hash }
    }

    pub fn name(&self) -> &DestinationName {
        &self.name
    }

    pub fn hash(&self) -> DestinationHash {
        self.hash
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        plaintext.to_vec()
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Vec<u8> {
        ciphertext.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_is_identity_both_ways() {
        let dest = PlainDestination::new(DestinationName::new("rns_unit_tests", &["plain"]).unwrap());
        let data = b"unencrypted".to_vec();
        assert_eq!(dest.encrypt(&data), data);
        assert_eq!(dest.decrypt(&data), data);
    }
}
