//! Replay protection counter

use serde::{Deserialize, Serialize};

/// Strictly increasing per-account nonce
///
/// Starts at 0 and advances once per committed action, so every action hash
/// is usable exactly once.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplayGuard {
    counter: u64,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The counter the next action must be signed over
    pub fn current(&self) -> u64 {
        self.counter
    }

    /// Consume the current counter, returning the value that was consumed
    pub fn next_counter(&mut self) -> u64 {
        let consumed = self.counter;
        self.counter += 1;
        consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strictly_increasing() {
        let mut guard = ReplayGuard::new();
        assert_eq!(guard.current(), 0);
        assert_eq!(guard.next_counter(), 0);
        assert_eq!(guard.next_counter(), 1);
        assert_eq!(guard.current(), 2);
    }
}
