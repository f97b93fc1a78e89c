//! Small hash newtypes shared by every Reticulum crate.
//!
//! Reticulum truncates SHA-256 output to different widths depending on what
//! is being named (10 bytes for a destination hash, 16 bytes for an
//! identity or link hash). Rather than pass raw `Vec<u8>`/`[u8; N]` around
//! and risk mixing up widths, every truncated hash is a distinct
//! `Truncated<N>` newtype.

use sha2::{Digest, Sha256};
use std::fmt;

/// Full, untruncated SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest256([u8; 32]);

impl Digest256 {
    pub fn of(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Digest256(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn truncate<const N: usize>(&self) -> Truncated<N> {
        assert!(N <= 32, "truncated hash cannot be wider than sha256 output");
        let mut out = [0u8; N];
        out.copy_from_slice(&self.0[..N]);
        Truncated(out)
    }
}

impl From<[u8; 32]> for Digest256 {
    fn from(v: [u8; 32]) -> Self {
        Digest256(v)
    }
}

impl AsRef<[u8]> for Digest256 {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

impl fmt::Debug for Digest256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Digest256[{}]", hex::encode(self.0))
    }
}

/// A SHA-256 digest truncated to `N` bytes: a destination hash (10), an
/// identity/link hash (16), or a packet hash (16).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Truncated<const N: usize>([u8; N]);

impl<const N: usize> Truncated<N> {
    pub const LEN: usize = N;

    /// Hash `parts` with SHA-256 and truncate to `N` bytes. This is the
    /// workhorse behind destination hashes, identity hashes, and link ids.
    pub fn of(parts: &[&[u8]]) -> Self {
        Digest256::of(parts).truncate()
    }

    pub fn zero() -> Self {
        Truncated([0u8; N])
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != N {
            return None;
        }
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Some(Truncated(out))
    }
}

impl<const N: usize> From<[u8; N]> for Truncated<N> {
    fn from(v: [u8; N]) -> Self {
        Truncated(v)
    }
}

impl<const N: usize> AsRef<[u8]> for Truncated<N> {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

impl<const N: usize> fmt::Debug for Truncated<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Truncated<{}>[{}]", N, hex::encode(self.0))
    }
}

impl<const N: usize> fmt::Display for Truncated<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Destination hashes are the leading 10 bytes of SHA-256.
pub type DestinationHash = Truncated<10>;
/// Identity hashes, link ids, and packet hashes are the leading 16 bytes.
pub type Hash16 = Truncated<16>;

#[cfg(any(test, feature = "testing"))]
mod rand_support {
    use super::Truncated;
    use rand_core::RngCore;

    impl<const N: usize> Truncated<N> {
        pub fn random(rng: &mut impl RngCore) -> Self {
            let mut out = [0u8; N];
            rng.fill_bytes(&mut out);
            Truncated(out)
        }
    }
}
