//! Multisig Stream Wallet: a shared custodial account guarded by M-of-N signatures
//!
//! This crate provides:
//! - A replay counter that makes every approved action single-use
//! - A canonical action hash bound to environment, account and nonce
//! - Recoverable secp256k1 signatures with strict signer ordering
//! - One dispatch point for transfers, calls and self-administration
//! - Rate-limited payment streams drawn down without a fresh quorum
//! - An account registry with JSON persistence
//!
//! # Example
//!
//! ```rust
//! use multisig_stream_wallet::{
//!     Action, ExecuteRequest, InMemoryHost, KeyPair, Registry, SignatureSet, DEV_DOMAIN_ID,
//! };
//!
//! let mut keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
//! keys.sort_by_key(|k| k.address());
//! let signers = keys.iter().map(|k| k.address()).collect();
//!
//! // A 2-of-3 account holding 1000 units
//! let mut registry = Registry::new();
//! let account = registry
//!     .create_account(keys[0].address(), DEV_DOMAIN_ID, signers, 2)
//!     .unwrap();
//! registry.deposit(&account, keys[0].address(), 1_000).unwrap();
//!
//! // Two signers approve a transfer at the current nonce
//! let recipient = KeyPair::generate().address();
//! let action = Action::transfer(recipient, 250);
//! let wallet = registry.get(&account).unwrap();
//! let hash = wallet.hash_action(&action);
//! let signatures = SignatureSet::collect(&hash, &[&keys[0], &keys[2]]);
//! let request = ExecuteRequest::new(wallet.nonce(), action, signatures);
//!
//! let mut host = InMemoryHost::new();
//! registry
//!     .execute_transaction(&account, &mut host, keys[1].address(), &request)
//!     .unwrap();
//!
//! assert_eq!(host.balance_of(&recipient), 250);
//! assert_eq!(registry.get(&account).unwrap().nonce(), 1);
//! ```

pub mod config;
pub mod crypto;
pub mod events;
pub mod host;
pub mod multisig;
pub mod registry;
pub mod storage;
pub mod stream;

// Re-export commonly used types
pub use config::{StorageConfig, WalletSettings, DEV_DOMAIN_ID};
pub use crypto::{Address, Hash256, KeyPair};
pub use events::{EventLog, EventRecord, WalletEvent};
pub use host::{Host, HostError, InMemoryHost};
pub use multisig::{
    Action, AdminCall, ExecuteRequest, MultisigWallet, Receipt, SignatureSet, SignerSet,
    WalletError,
};
pub use registry::{AccountSummary, Registry, RegistryError};
pub use storage::{Storage, StorageError};
pub use stream::{Stream, StreamLedger};
