//! Signature sets accompanying an authorization request
//!
//! A set is an ordered list of `(signer, signature)` pairs. Signers must be
//! strictly ascending, which rules out duplicates with a single linear pass.

use crate::crypto::{Address, Hash256, KeyPair};
use serde::{Deserialize, Serialize};

/// One signer's approval of an action hash
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignatureEntry {
    /// Claimed signer identity
    pub signer: Address,
    /// 65-byte recoverable signature
    pub signature: Vec<u8>,
}

impl SignatureEntry {
    pub fn new(signer: Address, signature: Vec<u8>) -> Self {
        Self { signer, signature }
    }

    /// Sign `hash` with `key_pair`
    pub fn sign(hash: &Hash256, key_pair: &KeyPair) -> Self {
        Self::new(key_pair.address(), key_pair.sign(hash))
    }
}

/// Transient collection of approvals for one request
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignatureSet {
    entries: Vec<SignatureEntry>,
}

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap entries exactly as given, in the given order
    pub fn from_entries(entries: Vec<SignatureEntry>) -> Self {
        Self { entries }
    }

    /// Collect signatures from `keys` over `hash`, sorted by signer
    pub fn collect(hash: &Hash256, keys: &[&KeyPair]) -> Self {
        let entries = keys.iter().map(|k| SignatureEntry::sign(hash, k)).collect();
        let mut set = Self::from_entries(entries);
        set.sort();
        set
    }

    /// Append without reordering
    pub fn push(&mut self, entry: SignatureEntry) {
        self.entries.push(entry);
    }

    /// Put entries into canonical ascending-signer order
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.signer.cmp(&b.signer));
    }

    pub fn entries(&self) -> &[SignatureEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Claimed signers in order
    pub fn signers(&self) -> Vec<Address> {
        self.entries.iter().map(|e| e.signer).collect()
    }
}
