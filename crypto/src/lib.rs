//! Cryptographic primitives for Reticulum: X25519 ECDH, Ed25519 sign/verify,
//! HKDF-SHA256, HMAC-SHA256, AES-CBC/PKCS7, and the Token authenticated
//! symmetric envelope built from them.

pub mod aes_cbc;
pub mod ed25519;
pub mod error;
pub mod kdf;
pub mod rng;
pub mod timing;
pub mod token;
pub mod x25519;

pub use error::{CryptoError, Result};
pub use token::KeyMode;
