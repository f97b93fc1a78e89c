use crate::name::{hash_of, DestinationName};
use crate::proof::ProofStrategy;
use crate::Result;
use common_types::DestinationHash;
use identity::{Identity, PrivateIdentity};

/// A lightweight, cloneable reference to a SINGLE destination's identity
/// and address — what a `Link` needs to hold on to without owning the
/// full input/output destination object.
#[derive(Clone)]
pub struct DestinationDesc {
    pub address_hash: DestinationHash,
    pub identity: Identity,
}

/// The IN half of a SINGLE destination: owns the private identity, can
/// decrypt payloads addressed to it and answer LINKREQUESTs with a proof.
pub struct SingleInputDestination {
    name: DestinationName,
    identity: PrivateIdentity,
    hash: DestinationHash,
    proof_strategy: ProofStrategy,
}

impl SingleInputDestination {
    pub fn new(name: DestinationName, identity: PrivateIdentity, proof_strategy: ProofStrategy) -> Self {
        let hash = hash_of(&name, Some(&identity.hash()));
        SingleInputDestination { name, identity, hash, proof_strategy }
    }

    pub fn name(&self) -> &DestinationName {
        &self.name
    }

    pub fn hash(&self) -> DestinationHash {
        self.hash
    }

    pub fn proof_strategy(&self) -> ProofStrategy {
        self.proof_strategy
    }

    pub fn identity(&self) -> &PrivateIdentity {
        &self.identity
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(self.identity.decrypt(ciphertext)?)
    }

    pub fn desc(&self) -> DestinationDesc {
        DestinationDesc { address_hash: self.hash, identity: self.identity.public() }
    }
}

/// The OUT half of a SINGLE destination: knows only the peer's public
/// identity, and can encrypt payloads addressed to it.
pub struct SingleOutputDestination {
    name: DestinationName,
    identity: Identity,
    hash: DestinationHash,
}

impl SingleOutputDestination {
    pub fn new(name: DestinationName, identity: Identity) -> Self {
        let hash = hash_of(&name, Some(&identity.hash()));
        SingleOutputDestination { name, identity, hash }
    }

    pub fn name(&self) -> &DestinationName {
        &self.name
    }

    pub fn hash(&self) -> DestinationHash {
        self.hash
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(self.identity.encrypt_for(plaintext)?)
    }

    pub fn desc(&self) -> DestinationDesc {
        DestinationDesc { address_hash: self.hash, identity: self.identity.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_round_trips_through_matching_in_destination() {
        let name = DestinationName::new("rns_unit_tests", &["single"]).unwrap();
        let server_identity = PrivateIdentity::new();
        let input = SingleInputDestination::new(name.clone(), server_identity, ProofStrategy::ProveAll);

        let output = SingleOutputDestination::new(name, input.identity().public());

        let plaintext = b"hello single destination".to_vec();
        let ciphertext = output.encrypt(&plaintext).unwrap();
        assert_eq!(input.decrypt(&ciphertext).unwrap(), plaintext);

        assert_eq!(input.hash(), output.hash());
    }
}
