//! Execution environment seam
//!
//! The wallet never moves value or talks to other parties by itself. After an
//! action is authorized and its local state committed, the effect is handed
//! to a [`Host`], which also supplies the only clock streams trust.

use crate::crypto::Address;
use crate::multisig::{MultisigWallet, WalletError};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Why the environment refused or failed an effect
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("call to {0} reverted")]
    Reverted(Address),
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u128, need: u128 },
    #[error("{0}")]
    Rejected(String),
    #[error("reentrant call failed: {0}")]
    Reentry(#[from] WalletError),
}

/// The environment an account executes in
pub trait Host {
    /// Current time in unix seconds
    fn timestamp(&self) -> u64;

    /// Deliver `value` and `payload` to `target` on behalf of `wallet`
    ///
    /// The wallet passes itself so the callee may call back into it; by then
    /// the nonce has advanced and the value has been debited. An `Err` makes
    /// the wallet roll the whole action back.
    fn call(
        &mut self,
        wallet: &mut MultisigWallet,
        target: Address,
        value: u128,
        payload: &[u8],
    ) -> Result<(), HostError>;
}

/// Callback run when a hooked target is called
pub type CallHook =
    Box<dyn FnMut(&mut MultisigWallet, &mut InMemoryHost, u128, &[u8]) -> Result<(), HostError>>;

/// A self-contained environment: external balances, a settable clock,
/// and optional behavior per target
pub struct InMemoryHost {
    now: u64,
    balances: HashMap<Address, u128>,
    rejecting: HashSet<Address>,
    hooks: HashMap<Address, CallHook>,
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHost {
    /// Host whose clock starts at the current wall-clock time
    pub fn new() -> Self {
        Self::at(Utc::now().timestamp().max(0) as u64)
    }

    /// Host whose clock starts at `now`
    pub fn at(now: u64) -> Self {
        Self {
            now,
            balances: HashMap::new(),
            rejecting: HashSet::new(),
            hooks: HashMap::new(),
        }
    }

    pub fn set_time(&mut self, now: u64) {
        self.now = now;
    }

    pub fn advance(&mut self, secs: u64) {
        self.now = self.now.saturating_add(secs);
    }

    /// External balance of an identity
    pub fn balance_of(&self, address: &Address) -> u128 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Credit an external identity out of thin air
    pub fn mint(&mut self, address: Address, amount: u128) {
        *self.balances.entry(address).or_insert(0) += amount;
    }

    /// Move external value from `from` into `wallet`
    pub fn fund(
        &mut self,
        wallet: &mut MultisigWallet,
        from: Address,
        amount: u128,
    ) -> Result<(), HostError> {
        let have = self.balance_of(&from);
        if have < amount {
            return Err(HostError::InsufficientFunds { have, need: amount });
        }
        wallet.deposit(from, amount)?;
        self.balances.insert(from, have - amount);
        Ok(())
    }

    /// Make every call to `target` fail
    pub fn reject_calls_to(&mut self, target: Address) {
        self.rejecting.insert(target);
    }

    /// Run `hook` whenever `target` is called, after the value is credited
    pub fn on_call<F>(&mut self, target: Address, hook: F)
    where
        F: FnMut(&mut MultisigWallet, &mut InMemoryHost, u128, &[u8]) -> Result<(), HostError>
            + 'static,
    {
        self.hooks.insert(target, Box::new(hook));
    }
}

impl Host for InMemoryHost {
    fn timestamp(&self) -> u64 {
        self.now
    }

    fn call(
        &mut self,
        wallet: &mut MultisigWallet,
        target: Address,
        value: u128,
        payload: &[u8],
    ) -> Result<(), HostError> {
        if self.rejecting.contains(&target) {
            return Err(HostError::Reverted(target));
        }

        let saved = self.balances.clone();
        *self.balances.entry(target).or_insert(0) += value;

        // The hook is detached while it runs so it can borrow the host
        let result = match self.hooks.remove(&target) {
            Some(mut hook) => {
                let result = hook(wallet, self, value, payload);
                self.hooks.insert(target, hook);
                result
            }
            None => Ok(()),
        };

        if result.is_err() {
            self.balances = saved;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalletSettings;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    fn wallet() -> MultisigWallet {
        MultisigWallet::new(addr(0xaa), 1, vec![addr(1)], 1, WalletSettings::default()).unwrap()
    }

    #[test]
    fn test_clock() {
        let mut host = InMemoryHost::at(100);
        assert_eq!(host.timestamp(), 100);
        host.advance(5);
        assert_eq!(host.timestamp(), 105);
        host.set_time(7);
        assert_eq!(host.timestamp(), 7);
        assert!(InMemoryHost::new().timestamp() > 0);
    }

    #[test]
    fn test_call_credits_target() {
        let mut host = InMemoryHost::at(0);
        let mut wallet = wallet();
        host.call(&mut wallet, addr(2), 40, &[]).unwrap();
        assert_eq!(host.balance_of(&addr(2)), 40);
    }

    #[test]
    fn test_rejecting_target() {
        let mut host = InMemoryHost::at(0);
        let mut wallet = wallet();
        host.reject_calls_to(addr(2));
        assert_eq!(
            host.call(&mut wallet, addr(2), 40, &[]),
            Err(HostError::Reverted(addr(2)))
        );
        assert_eq!(host.balance_of(&addr(2)), 0);
    }

    #[test]
    fn test_failing_hook_restores_balances() {
        let mut host = InMemoryHost::at(0);
        let mut wallet = wallet();
        host.on_call(addr(3), |_, _, _, _| Err(HostError::Rejected("nope".to_string())));

        assert_eq!(
            host.call(&mut wallet, addr(3), 9, b"x"),
            Err(HostError::Rejected("nope".to_string()))
        );
        assert_eq!(host.balance_of(&addr(3)), 0);

        // Hook stays registered
        assert!(host.call(&mut wallet, addr(3), 9, b"x").is_err());
    }

    #[test]
    fn test_fund() {
        let mut host = InMemoryHost::at(0);
        let mut wallet = wallet();
        host.mint(addr(5), 100);

        host.fund(&mut wallet, addr(5), 60).unwrap();
        assert_eq!(wallet.balance(), 60);
        assert_eq!(host.balance_of(&addr(5)), 40);

        assert_eq!(
            host.fund(&mut wallet, addr(5), 41),
            Err(HostError::InsufficientFunds { have: 40, need: 41 })
        );
        assert_eq!(wallet.balance(), 60);
    }
}
