//! Signer and account identities
//!
//! An [`Address`] is the 20-byte HASH160 of a compressed secp256k1 public key.
//! Addresses order bytewise; that ordering is the canonical signer order.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::hash::hash160;
use super::keys::KeyError;

/// Length of an identity in bytes
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte identity for signers, recipients and accounts
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Wrap raw bytes
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive the identity of a public key
    pub fn from_public_key(public_key: &secp256k1::PublicKey) -> Self {
        Self(hash160(&public_key.serialize()))
    }

    /// Build from a slice, which must be exactly 20 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let array: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| KeyError::InvalidAddress)?;
        Ok(Self(array))
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Hex form with `0x` prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| KeyError::InvalidAddress)?;
        Self::from_slice(&bytes)
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

// Hex strings so addresses can key JSON maps
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip_and_prefix() {
        let address = Address::new([0xab; ADDRESS_LEN]);
        let text = address.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.parse::<Address>().unwrap(), address);
        assert_eq!(text[2..].parse::<Address>().unwrap(), address);
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(matches!(
            "0xabcd".parse::<Address>(),
            Err(KeyError::InvalidAddress)
        ));
        assert!("not hex".parse::<Address>().is_err());
    }

    #[test]
    fn test_ordering_is_bytewise() {
        let mut low = [0u8; ADDRESS_LEN];
        low[0] = 1;
        let mut high = [0u8; ADDRESS_LEN];
        high[0] = 2;
        assert!(Address::new(low) < Address::new(high));
    }

    #[test]
    fn test_serde_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(Address::new([7; ADDRESS_LEN]), 5u64);
        let json = serde_json::to_string(&map).unwrap();
        let back: std::collections::BTreeMap<Address, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
