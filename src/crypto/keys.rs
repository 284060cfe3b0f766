//! ECDSA key management for signers
//!
//! Provides key pair generation, recoverable signing, and public-key
//! recovery using the secp256k1 elliptic curve.

use rand::rngs::OsRng;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use super::address::Address;
use super::hash::{sha256, Hash256};

/// Length of an encoded recoverable signature: r || s || v
pub const SIGNATURE_LEN: usize = 65;

/// Domain prefix for signed-message digests
const SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Multisig Signed Message:\n32";

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid address")]
    InvalidAddress,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// The signer identity of this key
    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key)
    }

    /// Sign an action hash, producing a 65-byte recoverable signature
    pub fn sign(&self, hash: &Hash256) -> Vec<u8> {
        sign_hash(&self.secret_key, hash)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Digest that signers actually sign for a given action hash
///
/// The prefix keeps a raw action hash from ever being a valid signing
/// target for some other protocol.
pub fn signed_message_hash(hash: &Hash256) -> Hash256 {
    let mut data = Vec::with_capacity(SIGNED_MESSAGE_PREFIX.len() + hash.len());
    data.extend_from_slice(SIGNED_MESSAGE_PREFIX);
    data.extend_from_slice(hash);
    sha256(&data)
}

/// Sign an action hash with a secret key
pub fn sign_hash(secret_key: &SecretKey, hash: &Hash256) -> Vec<u8> {
    let secp = Secp256k1::new();
    let message = Message::from_digest(signed_message_hash(hash));
    let (recovery_id, compact) = secp
        .sign_ecdsa_recoverable(&message, secret_key)
        .serialize_compact();

    let mut signature = Vec::with_capacity(SIGNATURE_LEN);
    signature.extend_from_slice(&compact);
    signature.push(recovery_id.to_i32() as u8);
    signature
}

/// Recover the signer identity from an action hash and a signature
///
/// `v` is accepted either raw (0..=3) or offset by 27. Anything malformed is
/// rejected rather than mapped to some unrelated identity.
pub fn recover(hash: &Hash256, signature: &[u8]) -> Result<Address, KeyError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(KeyError::InvalidSignature);
    }

    let v = match signature[64] {
        v @ 0..=3 => v,
        v @ 27..=30 => v - 27,
        _ => return Err(KeyError::InvalidSignature),
    };
    let recovery_id =
        RecoveryId::from_i32(i32::from(v)).map_err(|_| KeyError::InvalidSignature)?;
    let sig = RecoverableSignature::from_compact(&signature[..64], recovery_id)
        .map_err(|_| KeyError::InvalidSignature)?;

    let secp = Secp256k1::new();
    let message = Message::from_digest(signed_message_hash(hash));
    let public_key = secp
        .recover_ecdsa(&message, &sig)
        .map_err(|_| KeyError::InvalidSignature)?;

    Ok(Address::from_public_key(&public_key))
}

/// Parse a public key from hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}
