//! Relay calls (LSP25): instructions signed off-chain and submitted by anyone.
//!
//! The signer signs an EIP-191 version 0 message ("data with intended validator") whose
//! validator is the key manager:
//!
//! ```text
//! keccak256(0x19 ++ 0x00 ++ keyManager ++ uint256(25) ++ uint256(chainId) ++ uint256(nonce)
//!           ++ uint256(validityTimestamps) ++ uint256(value) ++ payload)
//! ```

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

use crate::{
    constants::lsp25::{EIP191_PREFIX, SIGNATURE_LENGTH, VERSION},
    KeyManagerError,
};

/// The time window in which a relay call may be executed.
///
/// Packed as `from << 128 | to` in seconds. A zero window is always valid, and `to == 0` means
/// the window never ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ValidityWindow {
    /// First valid timestamp.
    pub from: u128,
    /// Last valid timestamp, or zero for no end.
    pub to: u128,
}

impl ValidityWindow {
    /// A window that is always valid.
    pub const UNRESTRICTED: Self = Self { from: 0, to: 0 };

    /// Creates a window.
    pub const fn new(from: u128, to: u128) -> Self {
        Self { from, to }
    }

    /// The packed `uint256` value.
    pub fn packed(self) -> U256 {
        (U256::from(self.from) << 128) | U256::from(self.to)
    }

    /// Splits a packed `uint256` value.
    pub fn unpack(value: U256) -> Self {
        let limbs = value.as_limbs();
        let to = (limbs[1] as u128) << 64 | limbs[0] as u128;
        let from = (limbs[3] as u128) << 64 | limbs[2] as u128;
        Self { from, to }
    }

    /// Checks that `now` lies in the window.
    pub fn check(self, now: u64) -> Result<(), KeyManagerError> {
        let now = u128::from(now);
        if now < self.from {
            return Err(KeyManagerError::RelayCallBeforeStartTime);
        }
        if self.to != 0 && now > self.to {
            return Err(KeyManagerError::RelayCallExpired);
        }
        Ok(())
    }
}

/// The digest a relay call signer signs.
pub fn relay_call_digest(
    key_manager: Address,
    chain_id: u64,
    nonce: U256,
    validity: U256,
    value: U256,
    payload: &[u8],
) -> B256 {
    let mut message = Vec::with_capacity(2 + 20 + 5 * 32 + payload.len());
    message.extend_from_slice(&EIP191_PREFIX);
    message.extend_from_slice(key_manager.as_slice());
    message.extend_from_slice(&U256::from(VERSION).to_be_bytes::<32>());
    message.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    message.extend_from_slice(&nonce.to_be_bytes::<32>());
    message.extend_from_slice(&validity.to_be_bytes::<32>());
    message.extend_from_slice(&value.to_be_bytes::<32>());
    message.extend_from_slice(payload);
    keccak256(message)
}

/// Recovers the signer of a 65-byte `r ++ s ++ v` signature over `digest`.
///
/// `v` may be given as `0`/`1` or `27`/`28`.
pub fn recover_signer(digest: B256, signature: &[u8]) -> Result<Address, KeyManagerError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(KeyManagerError::InvalidRelaySignature);
    }
    let v = match signature[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        _ => return Err(KeyManagerError::InvalidRelaySignature),
    };
    let recovery_id =
        RecoveryId::try_from(v).map_err(|_| KeyManagerError::InvalidRelaySignature)?;
    let signature = Signature::from_slice(&signature[..64])
        .map_err(|_| KeyManagerError::InvalidRelaySignature)?;
    let recovered_key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
        .map_err(|_| KeyManagerError::InvalidRelaySignature)?;
    Ok(public_key_to_address(&recovered_key))
}

/// Signs `digest`, producing a 65-byte `r ++ s ++ v` signature with `v` in `27`/`28`.
pub fn sign_digest(key: &SigningKey, digest: B256) -> Result<Bytes, k256::ecdsa::Error> {
    let (signature, recovery_id) = key.sign_prehash_recoverable(digest.as_slice())?;
    let mut out = Vec::with_capacity(SIGNATURE_LENGTH);
    out.extend_from_slice(&signature.to_bytes());
    out.push(recovery_id.to_byte() + 27);
    Ok(out.into())
}

/// The address of a secp256k1 public key: the last 20 bytes of the keccak256 of the
/// uncompressed point without its `0x04` prefix.
pub fn public_key_to_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}
