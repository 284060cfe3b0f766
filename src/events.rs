//! Audit events for external observers
//!
//! Every committed state transition appends one or more records to an
//! [`EventLog`]. Records are never consulted by the authorization logic;
//! indexers and monitors drain or replay them.

use crate::crypto::{Address, Hash256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single observable fact
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum WalletEvent {
    /// Value arrived from outside
    Deposit {
        sender: Address,
        amount: u128,
        balance: u128,
    },
    /// An authorized action committed
    ExecuteTransaction {
        caller: Address,
        target: Address,
        value: u128,
        payload: Vec<u8>,
        nonce: u64,
        hash: Hash256,
    },
    SignerAdded {
        signer: Address,
        threshold: u8,
    },
    SignerRemoved {
        signer: Address,
        threshold: u8,
    },
    ThresholdChanged {
        threshold: u8,
    },
    OpenStream {
        recipient: Address,
        rate: u128,
        cap: u128,
        opened_at: u64,
    },
    /// Stream deleted; `forfeited` is the accrued allowance left unwithdrawn
    CloseStream {
        recipient: Address,
        forfeited: u128,
    },
    Withdraw {
        recipient: Address,
        amount: u128,
        reason: String,
    },
    /// Registry announced a new account
    Create {
        index: usize,
        account: Address,
        creator: Address,
        signers: Vec<Address>,
        threshold: u8,
    },
    /// Registry (re-)broadcast of an account's ownership
    Owner {
        account: Address,
        signers: Vec<Address>,
        threshold: u8,
    },
}

/// An event stamped with its emitting account and wall-clock time
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    pub account: Address,
    pub event: WalletEvent,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only list of records
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event emitted by `account`
    pub fn emit(&mut self, account: Address, event: WalletEvent) {
        self.records.push(EventRecord {
            account,
            event,
            recorded_at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Events only, in emission order
    pub fn events(&self) -> impl Iterator<Item = &WalletEvent> {
        self.records.iter().map(|r| &r.event)
    }

    pub fn last(&self) -> Option<&WalletEvent> {
        self.records.last().map(|r| &r.event)
    }

    /// Records appended since position `from`
    pub fn since(&self, from: usize) -> &[EventRecord] {
        &self.records[from.min(self.records.len())..]
    }

    /// Hand all records to a consumer, leaving the log empty
    pub fn drain(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.records)
    }

    /// Drop records past `len`; used when a transition is rolled back
    pub(crate) fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }
}
