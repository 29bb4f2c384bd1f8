//! Relay call nonces.
//!
//! Every signer owns independent nonce channels. A relay nonce packs the channel in its upper
//! 128 bits and the sequence number in its lower 128 bits, so instructions on one channel must
//! be submitted in order while channels progress independently.

use std::cell::RefCell;

use alloy_primitives::{map::HashMap, Address, U256};
use tracing::trace;

/// A packed `channel << 128 | sequence` relay nonce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelayNonce {
    /// The channel.
    pub channel: u128,
    /// The position in the channel.
    pub sequence: u128,
}

impl RelayNonce {
    /// Creates a nonce.
    pub const fn new(channel: u128, sequence: u128) -> Self {
        Self { channel, sequence }
    }

    /// The packed `uint256` value.
    pub fn packed(self) -> U256 {
        (U256::from(self.channel) << 128) | U256::from(self.sequence)
    }

    /// Splits a packed `uint256` value.
    pub fn unpack(value: U256) -> Self {
        let limbs = value.as_limbs();
        let sequence = (limbs[1] as u128) << 64 | limbs[0] as u128;
        let channel = (limbs[3] as u128) << 64 | limbs[2] as u128;
        Self { channel, sequence }
    }
}

impl From<U256> for RelayNonce {
    fn from(value: U256) -> Self {
        Self::unpack(value)
    }
}

impl From<RelayNonce> for U256 {
    fn from(nonce: RelayNonce) -> Self {
        nonce.packed()
    }
}

/// The submitted nonce is not the next one of its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expected nonce {expected:?}, got {submitted:?}")]
pub struct NonceMismatch {
    /// The next expected nonce.
    pub expected: RelayNonce,
    /// The submitted nonce.
    pub submitted: RelayNonce,
}

/// The next expected sequence number of every `(signer, channel)` pair.
#[derive(Debug, Default)]
pub struct NonceLedger {
    sequences: RefCell<HashMap<(Address, u128), u128>>,
}

impl NonceLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// The next nonce `signer` must use on `channel`.
    pub fn next(&self, signer: Address, channel: u128) -> RelayNonce {
        let sequence = self.sequences.borrow().get(&(signer, channel)).copied().unwrap_or_default();
        RelayNonce::new(channel, sequence)
    }

    /// Returns `true` if `nonce` is the next one of its channel.
    pub fn is_valid(&self, signer: Address, nonce: RelayNonce) -> bool {
        self.next(signer, nonce.channel) == nonce
    }

    /// Consumes `nonce`, advancing its channel by one.
    pub fn consume(&self, signer: Address, nonce: RelayNonce) -> Result<(), NonceMismatch> {
        let expected = self.next(signer, nonce.channel);
        let next = nonce.sequence.checked_add(1);
        match next {
            Some(next) if expected == nonce => {
                self.sequences.borrow_mut().insert((signer, nonce.channel), next);
                trace!(signer = %signer, channel = nonce.channel, sequence = nonce.sequence, "Relay nonce consumed");
                Ok(())
            }
            _ => Err(NonceMismatch { expected, submitted: nonce }),
        }
    }

    /// Gives back a nonce consumed by an instruction that failed afterwards.
    ///
    /// Has no effect unless `nonce` is the last one consumed on its channel.
    pub fn restore(&self, signer: Address, nonce: RelayNonce) {
        let mut sequences = self.sequences.borrow_mut();
        if let Some(sequence) = sequences.get_mut(&(signer, nonce.channel)) {
            if nonce.sequence.checked_add(1) == Some(*sequence) {
                *sequence = nonce.sequence;
            }
        }
    }
}
