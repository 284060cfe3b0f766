//! Multi-signature account
//!
//! [`MultisigWallet`] is the protected account. It has exactly two ways to
//! change state:
//!
//! - [`MultisigWallet::execute_transaction`], the quorum-gated entry point for
//!   transfers, generic calls and every administrative effect
//! - [`MultisigWallet::stream_withdraw`], the signature-free draw-down of a
//!   stream by its recipient
//!
//! Both run verify, then commit local state, then hand the external effect to
//! the [`Host`]. Any error after verification restores the state captured
//! before the commit.

use crate::config::WalletSettings;
use crate::crypto::{recover, Address, Hash256};
use crate::events::{EventLog, WalletEvent};
use crate::host::Host;
use crate::multisig::action::{action_hash, Action, AdminCall, MAX_PAYLOAD_LEN};
use crate::multisig::error::WalletError;
use crate::multisig::replay::ReplayGuard;
use crate::multisig::signature::SignatureSet;
use crate::multisig::signers::SignerSet;
use crate::stream::{Stream, StreamLedger};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authorization request: the action, the counter it was signed over,
/// and the approvals
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecuteRequest {
    pub counter: u64,
    pub action: Action,
    /// Hash the proposer computed, checked against our own if present
    pub hash: Option<Hash256>,
    pub signatures: SignatureSet,
}

impl ExecuteRequest {
    pub fn new(counter: u64, action: Action, signatures: SignatureSet) -> Self {
        Self {
            counter,
            action,
            hash: None,
            signatures,
        }
    }

    pub fn with_hash(mut self, hash: Hash256) -> Self {
        self.hash = Some(hash);
        self
    }
}

/// Outcome of a committed action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Counter consumed by the action
    pub nonce: u64,
    pub hash: Hash256,
}

/// Everything a rollback has to restore
#[derive(Clone, Debug, Serialize, Deserialize)]
struct AccountState {
    signers: SignerSet,
    replay: ReplayGuard,
    balance: u128,
    streams: StreamLedger,
}

/// A multi-signature custodial account
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultisigWallet {
    /// Identity of the account itself
    address: Address,
    /// Environment the account's signatures are scoped to
    domain_id: u64,
    state: AccountState,
    events: EventLog,
    created_at: DateTime<Utc>,
    /// Depth of `atomically` frames currently running; nonzero only while a
    /// host call is in progress
    #[serde(skip)]
    in_flight: u32,
}

impl MultisigWallet {
    /// Create an account with its initial signers
    pub fn new(
        address: Address,
        domain_id: u64,
        signers: Vec<Address>,
        threshold: u8,
        settings: WalletSettings,
    ) -> Result<Self, WalletError> {
        let signers = SignerSet::new(signers, threshold)?;

        Ok(Self {
            address,
            domain_id,
            state: AccountState {
                signers,
                replay: ReplayGuard::new(),
                balance: 0,
                streams: StreamLedger::new(settings.stream_interval_secs),
            },
            events: EventLog::new(),
            created_at: Utc::now(),
            in_flight: 0,
        })
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn domain_id(&self) -> u64 {
        self.domain_id
    }

    /// Counter the next action must be signed over
    pub fn nonce(&self) -> u64 {
        self.state.replay.current()
    }

    pub fn threshold(&self) -> u8 {
        self.state.signers.threshold()
    }

    pub fn signers(&self) -> &[Address] {
        self.state.signers.signers()
    }

    pub fn signer_at(&self, index: usize) -> Option<&Address> {
        self.state.signers.get(index)
    }

    pub fn signer_count(&self) -> usize {
        self.state.signers.len()
    }

    pub fn is_signer(&self, identity: &Address) -> bool {
        self.state.signers.is_signer(identity)
    }

    /// Get human-readable description like "2-of-3"
    pub fn description(&self) -> String {
        self.state.signers.description()
    }

    pub fn balance(&self) -> u128 {
        self.state.balance
    }

    pub fn stream(&self, recipient: &Address) -> Option<&Stream> {
        self.state.streams.get(recipient)
    }

    pub fn streams(&self) -> &StreamLedger {
        &self.state.streams
    }

    /// Amount `recipient` could withdraw at time `now`
    pub fn stream_balance(&self, recipient: &Address, now: u64) -> u128 {
        self.state.streams.balance(recipient, now)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Hand the audit log to an indexer, leaving it empty
    ///
    /// Refused while an action is running, since its records may still be
    /// rolled back.
    pub fn take_events(&mut self) -> Result<EventLog, WalletError> {
        if self.in_flight > 0 {
            return Err(WalletError::ActionInProgress);
        }
        Ok(std::mem::take(&mut self.events))
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Canonical hash of an action against this account
    pub fn transaction_hash(
        &self,
        counter: u64,
        target: &Address,
        value: u128,
        payload: &[u8],
    ) -> Hash256 {
        action_hash(self.domain_id, &self.address, counter, target, value, payload)
    }

    /// Hash of `action` at the current nonce, ready to be signed
    pub fn hash_action(&self, action: &Action) -> Hash256 {
        self.transaction_hash(self.nonce(), &action.target, action.value, &action.payload)
    }

    /// Recover who signed `hash`
    pub fn recover(&self, hash: &Hash256, signature: &[u8]) -> Result<Address, WalletError> {
        recover(hash, signature).map_err(|_| WalletError::InvalidSignature)
    }

    // =========================================================================
    // Funding
    // =========================================================================

    /// Accept value from outside
    pub fn deposit(&mut self, sender: Address, amount: u128) -> Result<u128, WalletError> {
        let balance = self
            .state
            .balance
            .checked_add(amount)
            .ok_or_else(|| WalletError::EffectRejected("balance overflow".to_string()))?;
        self.state.balance = balance;
        self.emit(WalletEvent::Deposit {
            sender,
            amount,
            balance,
        });
        Ok(balance)
    }

    // =========================================================================
    // Authorization
    // =========================================================================

    /// Check a request without changing anything
    ///
    /// Returns the action hash on success. Checks run in a fixed order:
    /// counter, payload size, hash, signature recovery, ordering, membership,
    /// threshold.
    pub fn verify(&self, request: &ExecuteRequest) -> Result<Hash256, WalletError> {
        let expected = self.nonce();
        if request.counter != expected {
            return Err(WalletError::StaleOrFutureNonce {
                expected,
                got: request.counter,
            });
        }

        let action = &request.action;
        if action.payload.len() > MAX_PAYLOAD_LEN {
            return Err(WalletError::EffectRejected(format!(
                "payload of {} bytes exceeds limit of {}",
                action.payload.len(),
                MAX_PAYLOAD_LEN
            )));
        }

        let hash = self.transaction_hash(
            request.counter,
            &action.target,
            action.value,
            &action.payload,
        );
        if let Some(supplied) = request.hash {
            if supplied != hash {
                return Err(WalletError::HashMismatch);
            }
        }

        let mut recovered = Vec::with_capacity(request.signatures.len());
        for entry in request.signatures.entries() {
            let signer = self.recover(&hash, &entry.signature)?;
            if signer != entry.signer {
                return Err(WalletError::InvalidSignature);
            }
            recovered.push(signer);
        }

        if recovered.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(WalletError::DuplicateOrUnsortedSigner);
        }

        if let Some(stranger) = recovered.iter().find(|s| !self.is_signer(s)) {
            return Err(WalletError::UnknownSigner(*stranger));
        }

        let need = self.threshold();
        if recovered.len() < need as usize {
            return Err(WalletError::InsufficientSignatures {
                have: recovered.len(),
                need,
            });
        }

        Ok(hash)
    }

    /// Authorize and execute an action
    ///
    /// `caller` is whoever submitted the request; it is recorded, not
    /// trusted. On success the nonce has advanced by exactly one. On any
    /// error the account is exactly as it was.
    pub fn execute_transaction<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        caller: Address,
        request: &ExecuteRequest,
    ) -> Result<Receipt, WalletError> {
        let hash = self.verify(request).map_err(|e| {
            log::debug!("Rejected action on {}: {}", self.address, e);
            e
        })?;

        let action = &request.action;
        let result = self.atomically(|wallet| {
            let nonce = wallet.state.replay.next_counter();
            wallet.emit(WalletEvent::ExecuteTransaction {
                caller,
                target: action.target,
                value: action.value,
                payload: action.payload.clone(),
                nonce,
                hash,
            });
            wallet.apply(host, action)?;
            Ok(Receipt { nonce, hash })
        });

        match result {
            Ok(receipt) => {
                log::info!(
                    "Executed action {} on {} (nonce {})",
                    hex::encode(hash),
                    self.address,
                    receipt.nonce
                );
                Ok(receipt)
            }
            Err(e) => {
                log::warn!("Rolled back action on {}: {}", self.address, e);
                Err(WalletError::ActionFailed(Box::new(e)))
            }
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Perform an authorized effect
    ///
    /// Only reachable from `execute_transaction`, after verification and
    /// after the nonce has advanced.
    fn apply<H: Host + ?Sized>(&mut self, host: &mut H, action: &Action) -> Result<(), WalletError> {
        if action.target == self.address {
            if action.value != 0 {
                return Err(WalletError::EffectRejected(
                    "administrative effects carry no value".to_string(),
                ));
            }
            let call = AdminCall::decode(&action.payload).ok_or_else(|| {
                WalletError::EffectRejected("unrecognized administrative payload".to_string())
            })?;
            return self.apply_admin(call, host.timestamp());
        }

        let balance = self.state.balance;
        if balance < action.value {
            return Err(WalletError::EffectRejected(format!(
                "insufficient balance: have {}, need {}",
                balance, action.value
            )));
        }
        self.state.balance = balance - action.value;

        host.call(self, action.target, action.value, &action.payload)
            .map_err(WalletError::from)
    }

    fn apply_admin(&mut self, call: AdminCall, now: u64) -> Result<(), WalletError> {
        match call {
            AdminCall::AddSigner { signer, threshold } => {
                self.state.signers.add(signer, threshold)?;
                log::info!("Signer {} added to {} ({})", signer, self.address, self.description());
                self.emit(WalletEvent::SignerAdded { signer, threshold });
            }
            AdminCall::RemoveSigner { signer, threshold } => {
                self.state.signers.remove(&signer, threshold)?;
                log::info!(
                    "Signer {} removed from {} ({})",
                    signer,
                    self.address,
                    self.description()
                );
                self.emit(WalletEvent::SignerRemoved { signer, threshold });
            }
            AdminCall::SetThreshold { threshold } => {
                self.state.signers.set_threshold(threshold)?;
                log::info!("Threshold of {} set to {}", self.address, self.description());
                self.emit(WalletEvent::ThresholdChanged { threshold });
            }
            AdminCall::OpenStream {
                recipient,
                rate,
                cap,
            } => {
                let opened_at = self.state.streams.open(recipient, rate, cap, now)?.opened_at;
                log::info!(
                    "Stream opened on {} for {}: {} per interval up to {}",
                    self.address,
                    recipient,
                    rate,
                    cap
                );
                self.emit(WalletEvent::OpenStream {
                    recipient,
                    rate,
                    cap,
                    opened_at,
                });
            }
            AdminCall::CloseStream { recipient } => {
                let (_, forfeited) = self.state.streams.close(&recipient, now)?;
                log::info!(
                    "Stream on {} for {} closed, {} forfeited",
                    self.address,
                    recipient,
                    forfeited
                );
                self.emit(WalletEvent::CloseStream {
                    recipient,
                    forfeited,
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Streams
    // =========================================================================

    /// Draw `amount` from the caller's own stream, without signatures
    ///
    /// Returns the stream as it stands afterwards (a stream drawn to its cap
    /// is already removed from the ledger).
    pub fn stream_withdraw<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        caller: Address,
        amount: u128,
        reason: &str,
    ) -> Result<Stream, WalletError> {
        let now = host.timestamp();
        let result = self.atomically(|wallet| {
            let stream = wallet.state.streams.withdraw(&caller, amount, now)?;

            let balance = wallet.state.balance;
            if balance < amount {
                return Err(WalletError::EffectRejected(format!(
                    "insufficient balance: have {}, need {}",
                    balance, amount
                )));
            }
            wallet.state.balance = balance - amount;
            wallet.emit(WalletEvent::Withdraw {
                recipient: caller,
                amount,
                reason: reason.to_string(),
            });

            host.call(wallet, caller, amount, &[])?;
            Ok(stream)
        });

        match &result {
            Ok(stream) => log::info!(
                "Stream withdrawal of {} by {} from {} ({}/{} drawn): {}",
                amount,
                caller,
                self.address,
                stream.withdrawn,
                stream.cap,
                reason
            ),
            Err(e) => log::debug!("Rejected withdrawal by {} from {}: {}", caller, self.address, e),
        }
        result
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Run `f`, restoring state and events if it fails
    fn atomically<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, WalletError>,
    ) -> Result<T, WalletError> {
        let snapshot = self.state.clone();
        let mark = self.events.len();

        self.in_flight += 1;
        let result = f(self);
        self.in_flight -= 1;
        if result.is_err() {
            self.state = snapshot;
            self.events.truncate(mark);
        }
        result
    }

    fn emit(&mut self, event: WalletEvent) {
        self.events.emit(self.address, event);
    }
}
