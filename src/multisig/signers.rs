//! Authorized signer set
//!
//! Holds the M-of-N configuration of an account: the ordered signer list and
//! the number of approvals required.

use crate::crypto::Address;
use crate::multisig::error::WalletError;
use serde::{Deserialize, Serialize};

/// Ordered, duplicate-free signer identities plus the approval threshold
///
/// Invariant: `1 <= threshold <= signers.len()`. Deserialization goes
/// through [`SignerSet::new`], so a stored set is held to it too.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "SignerSetData")]
pub struct SignerSet {
    /// Signers in insertion order
    signers: Vec<Address>,
    /// Minimum approvals required (M in M-of-N)
    threshold: u8,
}

impl SignerSet {
    /// Create a signer set
    ///
    /// # Errors
    /// `DuplicateSigner` if an identity repeats, `InvalidThreshold` if the
    /// threshold is zero or exceeds the signer count
    pub fn new(signers: Vec<Address>, threshold: u8) -> Result<Self, WalletError> {
        let mut sorted = signers.clone();
        sorted.sort();
        for pair in sorted.windows(2) {
            if pair[0] == pair[1] {
                return Err(WalletError::DuplicateSigner(pair[0]));
            }
        }

        check_threshold(threshold, signers.len())?;

        Ok(Self { signers, threshold })
    }

    pub fn is_signer(&self, identity: &Address) -> bool {
        self.signers.contains(identity)
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    /// Signer at position `index` in insertion order
    pub fn get(&self, index: usize) -> Option<&Address> {
        self.signers.get(index)
    }

    /// Add a signer and set a new threshold
    pub fn add(&mut self, identity: Address, new_threshold: u8) -> Result<(), WalletError> {
        if self.is_signer(&identity) {
            return Err(WalletError::DuplicateSigner(identity));
        }
        check_threshold(new_threshold, self.signers.len() + 1)?;

        self.signers.push(identity);
        self.threshold = new_threshold;
        Ok(())
    }

    /// Remove a signer and set a new threshold
    pub fn remove(&mut self, identity: &Address, new_threshold: u8) -> Result<(), WalletError> {
        let position = self
            .signers
            .iter()
            .position(|s| s == identity)
            .ok_or(WalletError::UnknownSigner(*identity))?;
        check_threshold(new_threshold, self.signers.len() - 1)?;

        self.signers.remove(position);
        self.threshold = new_threshold;
        Ok(())
    }

    /// Change only the threshold
    pub fn set_threshold(&mut self, new_threshold: u8) -> Result<(), WalletError> {
        check_threshold(new_threshold, self.signers.len())?;
        self.threshold = new_threshold;
        Ok(())
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.signers.len())
    }
}

/// Unchecked wire form of a [`SignerSet`]
#[derive(Deserialize)]
struct SignerSetData {
    signers: Vec<Address>,
    threshold: u8,
}

impl TryFrom<SignerSetData> for SignerSet {
    type Error = WalletError;

    fn try_from(data: SignerSetData) -> Result<Self, Self::Error> {
        SignerSet::new(data.signers, data.threshold)
    }
}

fn check_threshold(threshold: u8, signer_count: usize) -> Result<(), WalletError> {
    if threshold == 0 {
        return Err(WalletError::InvalidThreshold(
            "threshold must be at least 1".to_string(),
        ));
    }
    if threshold as usize > signer_count {
        return Err(WalletError::InvalidThreshold(format!(
            "threshold {} exceeds signer count {}",
            threshold, signer_count
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    fn three_signers() -> SignerSet {
        SignerSet::new(vec![addr(1), addr(2), addr(3)], 2).unwrap()
    }

    #[test]
    fn test_creation() {
        let set = three_signers();
        assert_eq!(set.threshold(), 2);
        assert_eq!(set.len(), 3);
        assert_eq!(set.description(), "2-of-3");
        assert_eq!(set.get(0), Some(&addr(1)));
        assert!(set.is_signer(&addr(2)));
        assert!(!set.is_signer(&addr(9)));
    }

    #[test]
    fn test_creation_validation() {
        assert!(matches!(
            SignerSet::new(vec![addr(1), addr(2)], 0),
            Err(WalletError::InvalidThreshold(_))
        ));
        assert!(matches!(
            SignerSet::new(vec![addr(1), addr(2)], 3),
            Err(WalletError::InvalidThreshold(_))
        ));
        assert!(matches!(
            SignerSet::new(vec![addr(1), addr(1)], 1),
            Err(WalletError::DuplicateSigner(_))
        ));
        // A single signer with threshold 1 is a valid account
        assert!(SignerSet::new(vec![addr(1)], 1).is_ok());
    }

    #[test]
    fn test_add() {
        let mut set = three_signers();
        set.add(addr(4), 3).unwrap();
        assert!(set.is_signer(&addr(4)));
        assert_eq!(set.description(), "3-of-4");

        assert_eq!(set.add(addr(4), 2), Err(WalletError::DuplicateSigner(addr(4))));
        assert!(matches!(set.add(addr(5), 6), Err(WalletError::InvalidThreshold(_))));
        assert!(matches!(set.add(addr(5), 0), Err(WalletError::InvalidThreshold(_))));
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_remove() {
        let mut set = three_signers();
        assert_eq!(
            set.remove(&addr(9), 2),
            Err(WalletError::UnknownSigner(addr(9)))
        );
        // Would leave 2 signers with threshold 3
        assert!(matches!(
            set.remove(&addr(3), 3),
            Err(WalletError::InvalidThreshold(_))
        ));
        assert_eq!(set.len(), 3);

        set.remove(&addr(2), 2).unwrap();
        assert_eq!(set.signers(), &[addr(1), addr(3)]);
        assert_eq!(set.threshold(), 2);
    }

    #[test]
    fn test_deserialize_enforces_invariants() {
        let set = three_signers();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(serde_json::from_str::<SignerSet>(&json).unwrap(), set);

        let a = addr(1).to_string();
        let b = addr(2).to_string();
        let zero = format!(r#"{{"signers":["{}","{}"],"threshold":0}}"#, a, b);
        let too_high = format!(r#"{{"signers":["{}","{}"],"threshold":3}}"#, a, b);
        let duplicate = format!(r#"{{"signers":["{}","{}"],"threshold":1}}"#, a, a);
        for json in [zero, too_high, duplicate] {
            assert!(serde_json::from_str::<SignerSet>(&json).is_err(), "{}", json);
        }
    }

    #[test]
    fn test_set_threshold() {
        let mut set = three_signers();
        set.set_threshold(3).unwrap();
        assert_eq!(set.threshold(), 3);
        assert!(set.set_threshold(4).is_err());
        assert!(set.set_threshold(0).is_err());
        assert_eq!(set.threshold(), 3);
    }
}
