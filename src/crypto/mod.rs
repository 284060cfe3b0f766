//! Cryptographic utilities for the wallet
//!
//! This module provides:
//! - SHA-256 and HASH160 hashing
//! - ECDSA key management (secp256k1)
//! - Recoverable signatures and signer recovery
//! - 20-byte identities

pub mod address;
pub mod hash;
pub mod keys;

pub use address::{Address, ADDRESS_LEN};
pub use hash::{hash160, sha256, sha256_hex, Hash256};
pub use keys::{
    public_key_from_hex, recover, sign_hash, signed_message_hash, KeyError, KeyPair,
    SIGNATURE_LEN,
};
