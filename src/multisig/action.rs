//! Proposed actions and their canonical hash
//!
//! An action is `(target, value, payload)`. When the target is the account
//! itself the payload must be an encoded [`AdminCall`]; any other target gets
//! a generic call-with-value through the host.
//!
//! The action hash is the wire contract with off-band signers:
//!
//! ```text
//! SHA256("MSW1" || domain:u64be || account:20 || counter:u64be
//!        || target:20 || value:u128be || len(payload):u32be || payload)
//! ```

use crate::crypto::{sha256, Address, Hash256, ADDRESS_LEN};
use serde::{Deserialize, Serialize};

const HASH_TAG: &[u8; 4] = b"MSW1";

/// Largest payload an account will verify; keeps the u32 length prefix exact
pub const MAX_PAYLOAD_LEN: usize = 1 << 20;

const SELECTOR_ADD_SIGNER: u8 = 0x01;
const SELECTOR_REMOVE_SIGNER: u8 = 0x02;
const SELECTOR_SET_THRESHOLD: u8 = 0x03;
const SELECTOR_OPEN_STREAM: u8 = 0x04;
const SELECTOR_CLOSE_STREAM: u8 = 0x05;

/// Compute the canonical hash of an action
///
/// Payloads longer than [`MAX_PAYLOAD_LEN`] are rejected before hashing by
/// `MultisigWallet::verify`; here the prefix saturates rather than wraps.
pub fn action_hash(
    domain_id: u64,
    account: &Address,
    counter: u64,
    target: &Address,
    value: u128,
    payload: &[u8],
) -> Hash256 {
    let mut data = Vec::with_capacity(4 + 8 + 20 + 8 + 20 + 16 + 4 + payload.len());
    data.extend_from_slice(HASH_TAG);
    data.extend_from_slice(&domain_id.to_be_bytes());
    data.extend_from_slice(account.as_bytes());
    data.extend_from_slice(&counter.to_be_bytes());
    data.extend_from_slice(target.as_bytes());
    data.extend_from_slice(&value.to_be_bytes());
    let len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
    data.extend_from_slice(&len.to_be_bytes());
    data.extend_from_slice(payload);
    sha256(&data)
}

/// A proposed effect, before it is bound to an account and counter
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Action {
    pub target: Address,
    pub value: u128,
    pub payload: Vec<u8>,
}

impl Action {
    /// Plain value transfer
    pub fn transfer(to: Address, value: u128) -> Self {
        Self {
            target: to,
            value,
            payload: Vec::new(),
        }
    }

    /// Generic call with value and opaque payload
    pub fn call(target: Address, value: u128, payload: Vec<u8>) -> Self {
        Self {
            target,
            value,
            payload,
        }
    }

    /// Administrative effect on `account` itself
    pub fn admin(account: Address, call: &AdminCall) -> Self {
        Self {
            target: account,
            value: 0,
            payload: call.encode(),
        }
    }
}

/// The sealed set of administrative effects an account can apply to itself
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AdminCall {
    AddSigner { signer: Address, threshold: u8 },
    RemoveSigner { signer: Address, threshold: u8 },
    SetThreshold { threshold: u8 },
    OpenStream { recipient: Address, rate: u128, cap: u128 },
    CloseStream { recipient: Address },
}

impl AdminCall {
    /// Selector byte followed by fixed-width fields
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + ADDRESS_LEN + 32);
        match self {
            AdminCall::AddSigner { signer, threshold } => {
                out.push(SELECTOR_ADD_SIGNER);
                out.extend_from_slice(signer.as_bytes());
                out.push(*threshold);
            }
            AdminCall::RemoveSigner { signer, threshold } => {
                out.push(SELECTOR_REMOVE_SIGNER);
                out.extend_from_slice(signer.as_bytes());
                out.push(*threshold);
            }
            AdminCall::SetThreshold { threshold } => {
                out.push(SELECTOR_SET_THRESHOLD);
                out.push(*threshold);
            }
            AdminCall::OpenStream {
                recipient,
                rate,
                cap,
            } => {
                out.push(SELECTOR_OPEN_STREAM);
                out.extend_from_slice(recipient.as_bytes());
                out.extend_from_slice(&rate.to_be_bytes());
                out.extend_from_slice(&cap.to_be_bytes());
            }
            AdminCall::CloseStream { recipient } => {
                out.push(SELECTOR_CLOSE_STREAM);
                out.extend_from_slice(recipient.as_bytes());
            }
        }
        out
    }

    /// Decode a payload; `None` for unknown selectors or wrong lengths
    pub fn decode(payload: &[u8]) -> Option<Self> {
        let (&selector, body) = payload.split_first()?;
        let mut reader = Reader { body };

        let call = match selector {
            SELECTOR_ADD_SIGNER => AdminCall::AddSigner {
                signer: reader.address()?,
                threshold: reader.u8()?,
            },
            SELECTOR_REMOVE_SIGNER => AdminCall::RemoveSigner {
                signer: reader.address()?,
                threshold: reader.u8()?,
            },
            SELECTOR_SET_THRESHOLD => AdminCall::SetThreshold {
                threshold: reader.u8()?,
            },
            SELECTOR_OPEN_STREAM => AdminCall::OpenStream {
                recipient: reader.address()?,
                rate: reader.u128()?,
                cap: reader.u128()?,
            },
            SELECTOR_CLOSE_STREAM => AdminCall::CloseStream {
                recipient: reader.address()?,
            },
            _ => return None,
        };

        reader.body.is_empty().then_some(call)
    }
}

struct Reader<'a> {
    body: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.body.len() < n {
            return None;
        }
        let (head, tail) = self.body.split_at(n);
        self.body = tail;
        Some(head)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u128(&mut self) -> Option<u128> {
        let bytes: [u8; 16] = self.take(16)?.try_into().ok()?;
        Some(u128::from_be_bytes(bytes))
    }

    fn address(&mut self) -> Option<Address> {
        Address::from_slice(self.take(ADDRESS_LEN)?).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn test_admin_call_decodes_what_it_encodes() {
        let calls = [
            AdminCall::AddSigner {
                signer: addr(4),
                threshold: 2,
            },
            AdminCall::RemoveSigner {
                signer: addr(3),
                threshold: 1,
            },
            AdminCall::SetThreshold { threshold: 3 },
            AdminCall::OpenStream {
                recipient: addr(9),
                rate: 3,
                cap: 15,
            },
            AdminCall::CloseStream { recipient: addr(9) },
        ];
        for call in calls {
            assert_eq!(AdminCall::decode(&call.encode()), Some(call));
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(AdminCall::decode(&[]), None);
        assert_eq!(AdminCall::decode(&[0x00]), None);
        assert_eq!(AdminCall::decode(&[0xff, 1, 2]), None);

        // Truncated and over-long payloads
        let mut encoded = AdminCall::SetThreshold { threshold: 2 }.encode();
        encoded.push(0);
        assert_eq!(AdminCall::decode(&encoded), None);
        let encoded = AdminCall::CloseStream { recipient: addr(1) }.encode();
        assert_eq!(AdminCall::decode(&encoded[..10]), None);
    }

    #[test]
    fn test_hash_binds_every_field() {
        let base = action_hash(31337, &addr(1), 0, &addr(2), 5, b"data");
        assert_eq!(base, action_hash(31337, &addr(1), 0, &addr(2), 5, b"data"));

        assert_ne!(base, action_hash(1, &addr(1), 0, &addr(2), 5, b"data"));
        assert_ne!(base, action_hash(31337, &addr(7), 0, &addr(2), 5, b"data"));
        assert_ne!(base, action_hash(31337, &addr(1), 1, &addr(2), 5, b"data"));
        assert_ne!(base, action_hash(31337, &addr(1), 0, &addr(7), 5, b"data"));
        assert_ne!(base, action_hash(31337, &addr(1), 0, &addr(2), 6, b"data"));
        assert_ne!(base, action_hash(31337, &addr(1), 0, &addr(2), 5, b"datb"));
    }

    #[test]
    fn test_hash_layout_is_stable() {
        let account = addr(0x11);
        let target = addr(0x22);
        let payload = [0xde, 0xad];

        let mut expected = Vec::new();
        expected.extend_from_slice(b"MSW1");
        expected.extend_from_slice(&7u64.to_be_bytes());
        expected.extend_from_slice(&[0x11; 20]);
        expected.extend_from_slice(&3u64.to_be_bytes());
        expected.extend_from_slice(&[0x22; 20]);
        expected.extend_from_slice(&100u128.to_be_bytes());
        expected.extend_from_slice(&2u32.to_be_bytes());
        expected.extend_from_slice(&payload);

        assert_eq!(
            action_hash(7, &account, 3, &target, 100, &payload),
            sha256(&expected)
        );
    }

    #[test]
    fn test_action_constructors() {
        let transfer = Action::transfer(addr(2), 10);
        assert!(transfer.payload.is_empty());

        let admin = Action::admin(addr(1), &AdminCall::SetThreshold { threshold: 1 });
        assert_eq!(admin.target, addr(1));
        assert_eq!(admin.value, 0);
        assert_eq!(
            AdminCall::decode(&admin.payload),
            Some(AdminCall::SetThreshold { threshold: 1 })
        );
    }
}
