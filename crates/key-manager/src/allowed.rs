//! Per-controller restriction lists: allowed calls and allowed data keys.
//!
//! Both lists narrow what the coarse [`Permissions`](crate::Permissions) bitmask grants. When a
//! list is stored and non-empty it is the final authority for its category; when it is absent
//! the bitmask alone decides.

use alloy_primitives::{Address, Bytes, FixedBytes, B256};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{
    compact::{decode_compact_bytes_array, encode_compact_bytes_array, CodecError},
    constants::{
        lsp6::{ALLOWED_CALL_ENTRY_LENGTH, MAX_DATA_KEY_PREFIX_LENGTH},
        wildcard::{ANY_ADDRESS, ANY_INTERFACE_ID, ANY_SELECTOR},
    },
    Operation,
};

bitflags! {
    /// The kinds of call an allowed call entry admits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CallTypes: u32 {
        /// Transfer value along with the call.
        const VALUE = 1 << 0;
        /// `CALL`
        const CALL = 1 << 1;
        /// `STATICCALL`
        const STATIC_CALL = 1 << 2;
        /// `DELEGATECALL`
        const DELEGATE_CALL = 1 << 3;
    }
}

impl CallTypes {
    /// The call type of an operation.
    ///
    /// Returns `None` for contract creation, which allowed calls never restrict.
    pub const fn of_operation(operation: Operation) -> Option<Self> {
        match operation {
            Operation::Call => Some(Self::CALL),
            Operation::StaticCall => Some(Self::STATIC_CALL),
            Operation::DelegateCall => Some(Self::DELEGATE_CALL),
            Operation::Create | Operation::Create2 => None,
        }
    }
}

/// One entry of `AddressPermissions:AllowedCalls:<controller>`.
///
/// Encoded as 32 bytes: `bytes4 callTypes ++ address ++ bytes4 interfaceId ++ bytes4 selector`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllowedCall {
    /// The call types this entry admits.
    pub call_types: CallTypes,
    /// The target, or [`ANY_ADDRESS`].
    pub target: Address,
    /// The ERC165 interface the target must support, or [`ANY_INTERFACE_ID`].
    pub interface_id: FixedBytes<4>,
    /// The function selector, or [`ANY_SELECTOR`]. A call without data has selector `0x00000000`.
    pub selector: FixedBytes<4>,
}

impl AllowedCall {
    /// Creates an entry.
    pub const fn new(
        call_types: CallTypes,
        target: Address,
        interface_id: FixedBytes<4>,
        selector: FixedBytes<4>,
    ) -> Self {
        Self { call_types, target, interface_id, selector }
    }

    /// An entry admitting any function of `target` with the given call types.
    pub const fn any_function_of(call_types: CallTypes, target: Address) -> Self {
        Self::new(call_types, target, ANY_INTERFACE_ID, ANY_SELECTOR)
    }

    /// Encodes the entry into its 32-byte form.
    pub fn encode(&self) -> [u8; ALLOWED_CALL_ENTRY_LENGTH] {
        let mut out = [0u8; ALLOWED_CALL_ENTRY_LENGTH];
        out[..4].copy_from_slice(&self.call_types.bits().to_be_bytes());
        out[4..24].copy_from_slice(self.target.as_slice());
        out[24..28].copy_from_slice(self.interface_id.as_slice());
        out[28..].copy_from_slice(self.selector.as_slice());
        out
    }

    fn decode(index: usize, offset: usize, entry: &[u8]) -> Result<Self, CodecError> {
        if entry.len() != ALLOWED_CALL_ENTRY_LENGTH {
            return Err(CodecError::InvalidElementLength { offset, length: entry.len() });
        }
        let call_types =
            CallTypes::from_bits_retain(u32::from_be_bytes([entry[0], entry[1], entry[2], entry[3]]));
        let allowed = Self {
            call_types,
            target: Address::from_slice(&entry[4..24]),
            interface_id: FixedBytes::from_slice(&entry[24..28]),
            selector: FixedBytes::from_slice(&entry[28..]),
        };
        if allowed.target == ANY_ADDRESS &&
            allowed.interface_id == ANY_INTERFACE_ID &&
            allowed.selector == ANY_SELECTOR
        {
            return Err(CodecError::WildcardCall { index });
        }
        Ok(allowed)
    }

    /// Returns `true` if the entry admits the call types, target and selector. The interface
    /// requirement is checked separately, see [`Self::required_interface`].
    pub fn admits(&self, required: CallTypes, target: Address, selector: FixedBytes<4>) -> bool {
        self.call_types.contains(required) &&
            (self.target == ANY_ADDRESS || self.target == target) &&
            (self.selector == ANY_SELECTOR || self.selector == selector)
    }

    /// The ERC165 interface the target must support, if the entry pins one.
    pub fn required_interface(&self) -> Option<FixedBytes<4>> {
        (self.interface_id != ANY_INTERFACE_ID).then_some(self.interface_id)
    }
}

/// Decodes an `AddressPermissions:AllowedCalls:<controller>` value.
pub fn decode_allowed_calls(value: &[u8]) -> Result<Vec<AllowedCall>, CodecError> {
    let mut offset = 0;
    let mut calls = Vec::new();
    for (index, entry) in decode_compact_bytes_array(value)?.into_iter().enumerate() {
        calls.push(AllowedCall::decode(index, offset, entry)?);
        offset += 2 + entry.len();
    }
    Ok(calls)
}

/// Encodes an `AddressPermissions:AllowedCalls:<controller>` value.
pub fn encode_allowed_calls(calls: &[AllowedCall]) -> Bytes {
    encode_compact_bytes_array(calls.iter().map(AllowedCall::encode))
}

/// The key prefixes of `AddressPermissions:AllowedERC725YDataKeys:<controller>`.
///
/// Every prefix is 1 to 32 bytes long.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Bytes>", into = "Vec<Bytes>")]
pub struct AllowedDataKeys(Vec<Bytes>);

impl AllowedDataKeys {
    /// Creates the list from key prefixes.
    ///
    /// Fails with [`CodecError::InvalidElementLength`] on an empty prefix or one longer than
    /// 32 bytes. The offset is that of the prefix in the encoded value.
    pub fn new<I, T>(prefixes: I) -> Result<Self, CodecError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        let mut offset = 0;
        let mut checked = Vec::new();
        for prefix in prefixes {
            let prefix = prefix.into();
            if prefix.is_empty() || prefix.len() > MAX_DATA_KEY_PREFIX_LENGTH {
                return Err(CodecError::InvalidElementLength { offset, length: prefix.len() });
            }
            offset += 2 + prefix.len();
            checked.push(prefix);
        }
        Ok(Self(checked))
    }

    /// Decodes a stored value.
    pub fn decode(value: &[u8]) -> Result<Self, CodecError> {
        Self::new(decode_compact_bytes_array(value)?.into_iter().map(Bytes::copy_from_slice))
    }

    /// Encodes the list into its stored form.
    pub fn encode(&self) -> Bytes {
        encode_compact_bytes_array(&self.0)
    }

    /// Returns `true` if no prefix is listed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The listed prefixes.
    pub fn prefixes(&self) -> &[Bytes] {
        &self.0
    }

    /// Returns `true` if `key` starts with one of the listed prefixes.
    pub fn allows(&self, key: B256) -> bool {
        self.0.iter().any(|prefix| key.starts_with(prefix))
    }
}

impl TryFrom<Vec<Bytes>> for AllowedDataKeys {
    type Error = CodecError;

    fn try_from(prefixes: Vec<Bytes>) -> Result<Self, Self::Error> {
        Self::new(prefixes)
    }
}

impl From<AllowedDataKeys> for Vec<Bytes> {
    fn from(keys: AllowedDataKeys) -> Self {
        keys.0
    }
}
