//! Destinations: named endpoints hashed to 10 bytes, each with its own
//! encrypt/decrypt rule depending on type (SINGLE/GROUP/PLAIN).

pub mod announce;
pub mod error;
pub mod group;
pub mod name;
pub mod plain;
pub mod proof;
pub mod single;

pub use announce::{build_announce, validate_announce};
pub use error::{DestinationError, Result};
pub use group::GroupDestination;
pub use name::{hash_of, DestinationName};
pub use plain::PlainDestination;
pub use proof::ProofStrategy;
pub use single::{DestinationDesc, SingleInputDestination, SingleOutputDestination};
