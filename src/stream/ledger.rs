//! Stream ledger implementation
//!
//! Tracks at most one stream per recipient and the accrual arithmetic.

use crate::crypto::Address;
use crate::multisig::WalletError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A time-accruing allowance for one recipient
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stream {
    pub recipient: Address,
    /// Amount accrued per interval
    pub rate: u128,
    /// Most that can ever be paid out under this stream
    pub cap: u128,
    /// Host timestamp at open, in seconds
    pub opened_at: u64,
    /// Cumulative amount paid out
    pub withdrawn: u128,
}

impl Stream {
    /// Total accrued since open, floor(elapsed * rate / interval)
    pub fn accrued(&self, now: u64, interval_secs: u64) -> u128 {
        let elapsed = u128::from(now.saturating_sub(self.opened_at));
        let interval = u128::from(interval_secs.max(1));
        elapsed.saturating_mul(self.rate) / interval
    }

    /// What the recipient may withdraw right now
    pub fn available(&self, now: u64, interval_secs: u64) -> u128 {
        self.cap
            .min(self.accrued(now, interval_secs))
            .saturating_sub(self.withdrawn)
    }

    pub fn is_exhausted(&self) -> bool {
        self.withdrawn >= self.cap
    }
}

/// All open streams of one account
///
/// Invariant: for every stream, `withdrawn <= min(cap, accrued)`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "StreamLedgerData")]
pub struct StreamLedger {
    streams: BTreeMap<Address, Stream>,
    interval_secs: u64,
}

impl Default for StreamLedger {
    fn default() -> Self {
        Self::new(1)
    }
}

impl StreamLedger {
    /// Create an empty ledger accruing per `interval_secs`
    pub fn new(interval_secs: u64) -> Self {
        Self {
            streams: BTreeMap::new(),
            interval_secs: interval_secs.max(1),
        }
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    pub fn get(&self, recipient: &Address) -> Option<&Stream> {
        self.streams.get(recipient)
    }

    pub fn contains(&self, recipient: &Address) -> bool {
        self.streams.contains_key(recipient)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stream> {
        self.streams.values()
    }

    /// Withdrawable amount for `recipient`, zero when no stream is open
    pub fn balance(&self, recipient: &Address, now: u64) -> u128 {
        self.streams
            .get(recipient)
            .map(|s| s.available(now, self.interval_secs))
            .unwrap_or(0)
    }

    /// Open a stream starting at `now`
    pub fn open(
        &mut self,
        recipient: Address,
        rate: u128,
        cap: u128,
        now: u64,
    ) -> Result<&Stream, WalletError> {
        if self.streams.contains_key(&recipient) {
            return Err(WalletError::StreamAlreadyOpen(recipient));
        }
        if rate == 0 {
            return Err(WalletError::InvalidStream(
                "rate must be greater than 0".to_string(),
            ));
        }
        if cap == 0 {
            return Err(WalletError::InvalidStream(
                "cap must be greater than 0".to_string(),
            ));
        }

        let stream = Stream {
            recipient,
            rate,
            cap,
            opened_at: now,
            withdrawn: 0,
        };
        Ok(self.streams.entry(recipient).or_insert(stream))
    }

    /// Record a withdrawal of `amount`
    ///
    /// Returns the stream as it stands after the withdrawal. A stream that
    /// reaches its cap is removed.
    pub fn withdraw(
        &mut self,
        recipient: &Address,
        amount: u128,
        now: u64,
    ) -> Result<Stream, WalletError> {
        let interval = self.interval_secs;
        let stream = self
            .streams
            .get_mut(recipient)
            .ok_or(WalletError::NoActiveStream(*recipient))?;

        if amount == 0 {
            return Err(WalletError::InvalidStream(
                "amount must be greater than 0".to_string(),
            ));
        }

        let available = stream.available(now, interval);
        if amount > available {
            return Err(WalletError::InsufficientStreamBalance {
                available,
                requested: amount,
            });
        }

        stream.withdrawn += amount;
        let snapshot = stream.clone();

        if snapshot.is_exhausted() {
            self.streams.remove(recipient);
            log::info!("Stream for {} exhausted at cap {}", recipient, snapshot.cap);
        }

        Ok(snapshot)
    }

    /// Delete a stream, forfeiting whatever has accrued but not been withdrawn
    ///
    /// Returns the removed stream and the forfeited amount.
    pub fn close(&mut self, recipient: &Address, now: u64) -> Result<(Stream, u128), WalletError> {
        let stream = self
            .streams
            .remove(recipient)
            .ok_or(WalletError::NoActiveStream(*recipient))?;
        let forfeited = stream.available(now, self.interval_secs);
        Ok((stream, forfeited))
    }
}

/// Unchecked wire form of a [`StreamLedger`]
#[derive(Deserialize)]
struct StreamLedgerData {
    streams: BTreeMap<Address, Stream>,
    interval_secs: u64,
}

impl TryFrom<StreamLedgerData> for StreamLedger {
    type Error = WalletError;

    fn try_from(data: StreamLedgerData) -> Result<Self, Self::Error> {
        if data.interval_secs == 0 {
            return Err(WalletError::InvalidStream(
                "interval must be at least one second".to_string(),
            ));
        }
        for (recipient, stream) in &data.streams {
            if *recipient != stream.recipient {
                return Err(WalletError::InvalidStream(format!(
                    "stream keyed by {} belongs to {}",
                    recipient, stream.recipient
                )));
            }
            if stream.rate == 0 || stream.cap == 0 {
                return Err(WalletError::InvalidStream(format!(
                    "stream for {} has zero rate or cap",
                    recipient
                )));
            }
            if stream.withdrawn > stream.cap {
                return Err(WalletError::InvalidStream(format!(
                    "stream for {} withdrew {} past its cap {}",
                    recipient, stream.withdrawn, stream.cap
                )));
            }
        }

        Ok(Self {
            streams: data.streams,
            interval_secs: data.interval_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: u64 = 1_700_000_000;

    fn recipient() -> Address {
        Address::new([0x42; 20])
    }

    #[test]
    fn test_open_and_accrue() {
        let mut ledger = StreamLedger::new(1);
        let stream = ledger.open(recipient(), 3, 15, T).unwrap();
        assert_eq!(stream.opened_at, T);
        assert_eq!(stream.withdrawn, 0);

        assert_eq!(ledger.balance(&recipient(), T), 0);
        assert_eq!(ledger.balance(&recipient(), T + 2), 6);
        assert_eq!(ledger.balance(&recipient(), T + 5), 15);
        // Capped
        assert_eq!(ledger.balance(&recipient(), T + 500), 15);
    }

    #[test]
    fn test_open_validation() {
        let mut ledger = StreamLedger::new(1);
        assert!(matches!(
            ledger.open(recipient(), 0, 15, T),
            Err(WalletError::InvalidStream(_))
        ));
        assert!(matches!(
            ledger.open(recipient(), 3, 0, T),
            Err(WalletError::InvalidStream(_))
        ));

        ledger.open(recipient(), 3, 15, T).unwrap();
        assert_eq!(
            ledger.open(recipient(), 1, 1, T).unwrap_err(),
            WalletError::StreamAlreadyOpen(recipient())
        );
    }

    #[test]
    fn test_accrual_truncates() {
        // 7 per 10-second interval: after 3 seconds only 2.1 has accrued
        let mut ledger = StreamLedger::new(10);
        ledger.open(recipient(), 7, 100, T).unwrap();
        assert_eq!(ledger.balance(&recipient(), T + 3), 2);
        assert_eq!(ledger.balance(&recipient(), T + 9), 6);
        assert_eq!(ledger.balance(&recipient(), T + 10), 7);
    }

    #[test]
    fn test_clock_before_open_accrues_nothing() {
        let mut ledger = StreamLedger::new(1);
        ledger.open(recipient(), 3, 15, T).unwrap();
        assert_eq!(ledger.balance(&recipient(), T - 100), 0);
    }

    #[test]
    fn test_withdraw_within_available() {
        let mut ledger = StreamLedger::new(1);
        ledger.open(recipient(), 3, 15, T).unwrap();

        let after = ledger.withdraw(&recipient(), 3, T + 5).unwrap();
        assert_eq!(after.withdrawn, 3);
        assert_eq!(ledger.balance(&recipient(), T + 5), 12);

        // 3 + 13 = 16 > cap of 15
        assert_eq!(
            ledger.withdraw(&recipient(), 13, T + 5).unwrap_err(),
            WalletError::InsufficientStreamBalance {
                available: 12,
                requested: 13
            }
        );
        assert_eq!(ledger.get(&recipient()).unwrap().withdrawn, 3);
    }

    #[test]
    fn test_withdrawn_never_exceeds_accrued() {
        let mut ledger = StreamLedger::new(1);
        ledger.open(recipient(), 2, 1_000, T).unwrap();

        let mut total = 0u128;
        for step in 1..=50u64 {
            let now = T + step;
            let request = u128::from(step % 7) + 1;
            if ledger.withdraw(&recipient(), request, now).is_ok() {
                total += request;
            }
            let stream = ledger.get(&recipient()).unwrap();
            assert_eq!(stream.withdrawn, total);
            assert!(stream.withdrawn <= stream.cap.min(stream.accrued(now, 1)));
        }
        assert!(total > 0);
    }

    #[test]
    fn test_exhaustion_removes_stream() {
        let mut ledger = StreamLedger::new(1);
        ledger.open(recipient(), 5, 10, T).unwrap();
        ledger.withdraw(&recipient(), 10, T + 2).unwrap();
        assert!(!ledger.contains(&recipient()));
        assert_eq!(
            ledger.withdraw(&recipient(), 1, T + 3).unwrap_err(),
            WalletError::NoActiveStream(recipient())
        );
    }

    #[test]
    fn test_withdraw_zero_and_missing() {
        let mut ledger = StreamLedger::new(1);
        assert_eq!(
            ledger.withdraw(&recipient(), 1, T).unwrap_err(),
            WalletError::NoActiveStream(recipient())
        );
        ledger.open(recipient(), 1, 10, T).unwrap();
        assert!(matches!(
            ledger.withdraw(&recipient(), 0, T + 1),
            Err(WalletError::InvalidStream(_))
        ));
    }

    #[test]
    fn test_close_forfeits() {
        let mut ledger = StreamLedger::new(1);
        ledger.open(recipient(), 1, 10, T).unwrap();
        ledger.withdraw(&recipient(), 2, T + 7).unwrap();

        let (closed, forfeited) = ledger.close(&recipient(), T + 7).unwrap();
        assert_eq!(closed.withdrawn, 2);
        assert_eq!(forfeited, 5);
        assert!(ledger.is_empty());

        assert_eq!(
            ledger.close(&recipient(), T + 8).unwrap_err(),
            WalletError::NoActiveStream(recipient())
        );
    }

    #[test]
    fn test_deserialize_enforces_invariants() {
        let mut ledger = StreamLedger::new(1);
        ledger.open(recipient(), 1, 10, T).unwrap();
        ledger.withdraw(&recipient(), 4, T + 5).unwrap();

        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(
            serde_json::from_value::<StreamLedger>(json.clone()).unwrap(),
            ledger
        );

        let key = recipient().to_string();
        let mut overdrawn = json.clone();
        overdrawn["streams"][&key]["withdrawn"] = serde_json::json!(11);
        let mut zero_rate = json.clone();
        zero_rate["streams"][&key]["rate"] = serde_json::json!(0);
        let mut zero_interval = json.clone();
        zero_interval["interval_secs"] = serde_json::json!(0);
        let mut wrong_owner = json;
        wrong_owner["streams"][&key]["recipient"] =
            serde_json::json!(Address::new([0x43; 20]).to_string());

        for bad in [overdrawn, zero_rate, zero_interval, wrong_owner] {
            assert!(serde_json::from_value::<StreamLedger>(bad).is_err());
        }
    }
}
