//! Hashing utilities for the wallet
//!
//! Provides the SHA-256 and HASH160 primitives used for action hashes,
//! signed-message digests and identity derivation.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// A 32-byte digest
pub type Hash256 = [u8; 32];

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Computes RIPEMD160(SHA256(data)), the identity digest for public keys
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut ripemd = Ripemd160::new();
    ripemd.update(sha256(data));
    ripemd.finalize().into()
}
