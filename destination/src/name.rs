use crate::error::{DestinationError, Result};
use common_types::{DestinationHash, Hash16};

/// `app_name` joined with its `aspects` by `.`, e.g. `rns_unit_tests.link.establish`.
/// Dots are forbidden inside a component since they are the join separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationName {
    app_name: String,
    aspects: Vec<String>,
}

impl DestinationName {
    pub fn new(app_name: impl Into<String>, aspects: &[&str]) -> Result<Self> {
        let app_name = app_name.into();
        for component in std::iter::once(app_name.as_str()).chain(aspects.iter().copied()) {
            if component.contains('.') {
                return Err(DestinationError::DotInComponent(component.to_string()));
            }
        }
        Ok(DestinationName { app_name, aspects: aspects.iter().map(|s| s.to_string()).collect() })
    }

    pub fn as_string(&self) -> String {
        let mut parts = Vec::with_capacity(1 + self.aspects.len());
        parts.push(self.app_name.as_str());
        parts.extend(self.aspects.iter().map(String::as_str));
        parts.join(".")
    }
}

/// `SHA256(name.utf8 [|| identity_hash])[:10]`. `identity_hash` is present
/// for SINGLE destinations and absent for GROUP/PLAIN.
pub fn hash_of(name: &DestinationName, identity_hash: Option<&Hash16>) -> DestinationHash {
    let name_bytes = name.as_string().into_bytes();
    match identity_hash {
        Some(hash) => DestinationHash::of(&[&name_bytes, hash.as_bytes()]),
        None => DestinationHash::of(&[&name_bytes]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_dot_in_component() {
        assert!(DestinationName::new("rns.unit", &[]).is_err());
        assert!(DestinationName::new("rns", &["a.b"]).is_err());
    }

    #[test]
    fn joins_app_name_and_aspects_with_dots() {
        let name = DestinationName::new("rns_unit_tests", &["link", "establish"]).unwrap();
        assert_eq!(name.as_string(), "rns_unit_tests.link.establish");
    }

    #[test]
    fn single_destination_hash_is_10_bytes_and_deterministic() {
        let identity_hash = Hash16::from([0x65u8; 16]);
        let name = DestinationName::new("rns_unit_tests", &["link", "establish"]).unwrap();

        let a = hash_of(&name, Some(&identity_hash));
        let b = hash_of(&name, Some(&identity_hash));

        assert_eq!(a.as_bytes().len(), 10);
        assert_eq!(a, b);
    }
}
