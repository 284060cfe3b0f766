//! Multi-signature authorization
//!
//! An account acts only when at least `threshold` of its signers approve the
//! exact action at the current nonce. Administrative changes (signers,
//! threshold, streams) travel through the same gate as transfers.
//!
//! # Example
//!
//! ```ignore
//! use multisig_stream_wallet::multisig::{Action, ExecuteRequest, MultisigWallet, SignatureSet};
//!
//! // Propose: hash the action at the current nonce
//! let action = Action::transfer(recipient, 100);
//! let hash = wallet.hash_action(&action);
//!
//! // Signers approve off-band; signatures sorted by signer identity
//! let signatures = SignatureSet::collect(&hash, &[&alice, &bob]);
//!
//! // Submit
//! let request = ExecuteRequest::new(wallet.nonce(), action, signatures);
//! wallet.execute_transaction(&mut host, submitter, &request)?;
//! ```

pub mod action;
pub mod error;
pub mod replay;
pub mod signature;
pub mod signers;
pub mod wallet;

pub use action::{action_hash, Action, AdminCall, MAX_PAYLOAD_LEN};
pub use error::WalletError;
pub use replay::ReplayGuard;
pub use signature::{SignatureEntry, SignatureSet};
pub use signers::SignerSet;
pub use wallet::{ExecuteRequest, MultisigWallet, Receipt};
