//! Registry of multisig accounts
//!
//! Handles creation, lookup and coordination of accounts.

use crate::config::WalletSettings;
use crate::crypto::{hash160, Address};
use crate::events::{EventLog, WalletEvent};
use crate::host::Host;
use crate::multisig::{ExecuteRequest, MultisigWallet, Receipt, WalletError};
use crate::stream::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised by the registry itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Account not found: {0}")]
    UnknownAccount(Address),
    #[error("No account at index {0}")]
    UnknownIndex(usize),
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),
}

/// What `lookup` reports about an account
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub handle: Address,
    pub threshold: u8,
    pub balance: u128,
}

/// Append-only directory of accounts
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Registry {
    /// Accounts in creation order
    accounts: Vec<MultisigWallet>,
    /// Account handle -> position in `accounts`
    index: HashMap<Address, usize>,
    /// Settings applied to new accounts
    settings: WalletSettings,
    /// Registry-level events (Create, Owner)
    events: EventLog,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry whose accounts use `settings`
    pub fn with_settings(settings: WalletSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Create a new account and announce it
    pub fn create_account(
        &mut self,
        creator: Address,
        domain_id: u64,
        signers: Vec<Address>,
        threshold: u8,
    ) -> Result<Address, RegistryError> {
        let index = self.accounts.len();
        let handle = self.generate_handle(&creator, domain_id, &signers);

        let wallet = MultisigWallet::new(handle, domain_id, signers, threshold, self.settings)?;
        let signers = wallet.signers().to_vec();

        self.index.insert(handle, index);
        self.accounts.push(wallet);

        log::info!(
            "Account {} created at index {} ({}-of-{}, domain {})",
            handle,
            index,
            threshold,
            signers.len(),
            domain_id
        );

        self.events.emit(
            handle,
            WalletEvent::Create {
                index,
                account: handle,
                creator,
                signers: signers.clone(),
                threshold,
            },
        );
        self.events.emit(
            handle,
            WalletEvent::Owner {
                account: handle,
                signers,
                threshold,
            },
        );

        Ok(handle)
    }

    /// Handle = HASH160(creator || index || domain || signers)
    ///
    /// The creation index makes every handle unique, even for identical
    /// signer sets.
    fn generate_handle(&self, creator: &Address, domain_id: u64, signers: &[Address]) -> Address {
        let mut data = Vec::with_capacity(20 + 8 + 8 + signers.len() * 20);
        data.extend_from_slice(creator.as_bytes());
        data.extend_from_slice(&(self.accounts.len() as u64).to_be_bytes());
        data.extend_from_slice(&domain_id.to_be_bytes());
        for signer in signers {
            data.extend_from_slice(signer.as_bytes());
        }
        Address::new(hash160(&data))
    }

    /// Get account count
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Handle of the account at `index`
    pub fn account_at(&self, index: usize) -> Option<Address> {
        self.accounts.get(index).map(|w| w.address())
    }

    /// Handle, threshold and balance of the account at `index`
    pub fn lookup(&self, index: usize) -> Result<AccountSummary, RegistryError> {
        let wallet = self
            .accounts
            .get(index)
            .ok_or(RegistryError::UnknownIndex(index))?;
        Ok(AccountSummary {
            handle: wallet.address(),
            threshold: wallet.threshold(),
            balance: wallet.balance(),
        })
    }

    /// Check if a handle belongs to a registered account
    pub fn exists(&self, handle: &Address) -> bool {
        self.index.contains_key(handle)
    }

    pub fn get(&self, handle: &Address) -> Option<&MultisigWallet> {
        self.index.get(handle).and_then(|&i| self.accounts.get(i))
    }

    pub fn get_mut(&mut self, handle: &Address) -> Option<&mut MultisigWallet> {
        match self.index.get(handle) {
            Some(&i) => self.accounts.get_mut(i),
            None => None,
        }
    }

    /// List all accounts in creation order
    pub fn list(&self) -> &[MultisigWallet] {
        &self.accounts
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Hand registry events to an indexer, leaving the log empty
    pub fn take_events(&mut self) -> EventLog {
        std::mem::take(&mut self.events)
    }

    /// Re-broadcast the ownership of an account
    pub fn emit_owner(
        &mut self,
        handle: &Address,
        signers: Vec<Address>,
        threshold: u8,
    ) -> Result<(), RegistryError> {
        if !self.exists(handle) {
            return Err(RegistryError::UnknownAccount(*handle));
        }
        self.events.emit(
            *handle,
            WalletEvent::Owner {
                account: *handle,
                signers,
                threshold,
            },
        );
        Ok(())
    }

    /// External funding of an account
    pub fn deposit(
        &mut self,
        handle: &Address,
        sender: Address,
        amount: u128,
    ) -> Result<u128, RegistryError> {
        Ok(self.wallet_mut(handle)?.deposit(sender, amount)?)
    }

    /// Forward an authorization request to an account
    ///
    /// If the action changed the signer set or threshold, the new ownership
    /// is re-broadcast.
    pub fn execute_transaction<H: Host + ?Sized>(
        &mut self,
        handle: &Address,
        host: &mut H,
        caller: Address,
        request: &ExecuteRequest,
    ) -> Result<Receipt, RegistryError> {
        let wallet = self.wallet_mut(handle)?;
        let before = (wallet.signers().to_vec(), wallet.threshold());

        let receipt = wallet.execute_transaction(host, caller, request)?;

        let after = (wallet.signers().to_vec(), wallet.threshold());
        if before != after {
            let (signers, threshold) = after;
            self.emit_owner(handle, signers, threshold)?;
        }
        Ok(receipt)
    }

    /// Forward a stream withdrawal to an account
    pub fn stream_withdraw<H: Host + ?Sized>(
        &mut self,
        handle: &Address,
        host: &mut H,
        caller: Address,
        amount: u128,
        reason: &str,
    ) -> Result<Stream, RegistryError> {
        Ok(self
            .wallet_mut(handle)?
            .stream_withdraw(host, caller, amount, reason)?)
    }

    /// Whether the handle index agrees with the account list
    ///
    /// Only a registry read back from disk can violate this.
    pub fn is_consistent(&self) -> bool {
        self.index.len() == self.accounts.len()
            && self
                .accounts
                .iter()
                .enumerate()
                .all(|(i, w)| self.index.get(&w.address()) == Some(&i))
    }

    fn wallet_mut(&mut self, handle: &Address) -> Result<&mut MultisigWallet, RegistryError> {
        self.get_mut(handle)
            .ok_or(RegistryError::UnknownAccount(*handle))
    }
}
