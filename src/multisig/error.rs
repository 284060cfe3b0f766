//! Errors for authorization, dispatch and streams

use crate::crypto::Address;
use crate::host::HostError;
use thiserror::Error;

/// Every way an authorization or withdrawal can be rejected
///
/// None of these are fatal: each leaves the account unchanged and tells the
/// caller what to fix before retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Stale or future nonce: expected {expected}, got {got}")]
    StaleOrFutureNonce { expected: u64, got: u64 },
    #[error("Supplied hash does not match the action")]
    HashMismatch,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Signers must be strictly ascending with no duplicates")]
    DuplicateOrUnsortedSigner,
    #[error("Unknown signer: {0}")]
    UnknownSigner(Address),
    #[error("Insufficient signatures: have {have}, need {need}")]
    InsufficientSignatures { have: usize, need: u8 },
    #[error("Effect rejected: {0}")]
    EffectRejected(String),
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("Duplicate signer: {0}")]
    DuplicateSigner(Address),
    #[error("Stream already open for {0}")]
    StreamAlreadyOpen(Address),
    #[error("No active stream for {0}")]
    NoActiveStream(Address),
    #[error("Insufficient stream balance: available {available}, requested {requested}")]
    InsufficientStreamBalance { available: u128, requested: u128 },
    #[error("Invalid stream: {0}")]
    InvalidStream(String),
    #[error("An action is still in progress")]
    ActionInProgress,
    #[error("Action failed: {0}")]
    ActionFailed(Box<WalletError>),
}

impl From<HostError> for WalletError {
    fn from(err: HostError) -> Self {
        WalletError::EffectRejected(err.to_string())
    }
}

impl WalletError {
    /// The innermost cause, looking through `ActionFailed`
    pub fn root(&self) -> &WalletError {
        match self {
            WalletError::ActionFailed(inner) => inner.root(),
            other => other,
        }
    }
}
