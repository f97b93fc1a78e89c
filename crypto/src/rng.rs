//! CSPRNG access point. A single place to swap the source of randomness
//! (e.g. for a future vendored/system-crypto provider split, see DESIGN.md)
//! without touching call sites.

use rand_core::{OsRng, RngCore};

pub fn fill(buf: &mut [u8]) {
    OsRng.fill_bytes(buf);
}

pub fn bytes<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    fill(&mut out);
    out
}
