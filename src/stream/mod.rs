//! Payment streams
//!
//! A stream is a pre-approved, rate-limited allowance for one recipient.
//! Opening and closing require quorum approval; drawing down does not.
//!
//! # Example
//!
//! ```ignore
//! use multisig_stream_wallet::stream::StreamLedger;
//!
//! let mut ledger = StreamLedger::new(1);
//! ledger.open(recipient, 3, 15, now)?;
//!
//! // Five intervals later the whole cap has accrued
//! assert_eq!(ledger.balance(&recipient, now + 5), 15);
//! ledger.withdraw(&recipient, 3, now + 5)?;
//! ```

pub mod ledger;

pub use ledger::{Stream, StreamLedger};
