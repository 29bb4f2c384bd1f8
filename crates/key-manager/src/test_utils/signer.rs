use alloy_primitives::{Address, Bytes, B256, U256};
use k256::ecdsa::SigningKey;

use crate::relay::{public_key_to_address, relay_call_digest, sign_digest};

/// A deterministic secp256k1 key for signing relay calls and ERC1271 messages.
#[derive(Clone, Debug)]
pub struct TestSigner {
    key: SigningKey,
    address: Address,
}

impl TestSigner {
    /// Derives a signer from a one-byte seed. Distinct non-zero seeds give distinct signers.
    pub fn from_seed(seed: u8) -> Self {
        assert_ne!(seed, 0, "the zero scalar is not a valid key");
        let key = SigningKey::from_slice(&[seed; 32]).expect("valid secp256k1 scalar");
        let address = public_key_to_address(key.verifying_key());
        Self { key, address }
    }

    /// The address of the signer.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Signs a 32-byte hash.
    pub fn sign_hash(&self, hash: B256) -> Bytes {
        sign_digest(&self.key, hash).expect("signing never fails for a valid key")
    }

    /// Signs a relay call addressed to `key_manager` on `chain_id`.
    pub fn sign_relay_call(
        &self,
        key_manager: Address,
        chain_id: u64,
        nonce: U256,
        validity: U256,
        payload: &[u8],
    ) -> Bytes {
        self.sign_hash(relay_call_digest(key_manager, chain_id, nonce, validity, U256::ZERO, payload))
    }
}
