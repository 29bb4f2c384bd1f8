//! Reserved data keys interpreted by the key manager.
//!
//! Permissions live in the account's generic key/value store under LSP2 keys:
//!
//! - `AddressPermissions:Permissions:<controller>` (`MappingWithGrouping`)
//! - `AddressPermissions:AllowedCalls:<controller>` (`MappingWithGrouping`)
//! - `AddressPermissions:AllowedERC725YDataKeys:<controller>` (`MappingWithGrouping`)
//! - `AddressPermissions[]` (`Array`), listing the controllers
//!
//! A `MappingWithGrouping` key is `bytes6(keccak256(first)) ++ bytes4(keccak256(second)) ++
//! 0x0000 ++ bytes20(address)`. The array stores its `uint128` length under
//! `keccak256("AddressPermissions[]")` and each element under `bytes16(lengthKey) ++
//! uint128(index)`.

use alloy_primitives::{keccak256, Address, B256};
use once_cell::sync::Lazy;

use crate::constants::lsp6::{
    ADDRESS_PERMISSIONS, ADDRESS_PERMISSIONS_ARRAY, ALLOWED_CALLS, ALLOWED_ERC725Y_DATA_KEYS,
    ARRAY_PREFIX_LENGTH, MAPPING_PREFIX_LENGTH, PERMISSIONS,
};

static PERMISSIONS_PREFIX: Lazy<[u8; MAPPING_PREFIX_LENGTH]> =
    Lazy::new(|| mapping_with_grouping_prefix(ADDRESS_PERMISSIONS, PERMISSIONS));

static ALLOWED_CALLS_PREFIX: Lazy<[u8; MAPPING_PREFIX_LENGTH]> =
    Lazy::new(|| mapping_with_grouping_prefix(ADDRESS_PERMISSIONS, ALLOWED_CALLS));

static ALLOWED_DATA_KEYS_PREFIX: Lazy<[u8; MAPPING_PREFIX_LENGTH]> =
    Lazy::new(|| mapping_with_grouping_prefix(ADDRESS_PERMISSIONS, ALLOWED_ERC725Y_DATA_KEYS));

static ARRAY_LENGTH_KEY: Lazy<B256> = Lazy::new(|| keccak256(ADDRESS_PERMISSIONS_ARRAY));

static NAMESPACE_PREFIX: Lazy<[u8; 6]> = Lazy::new(|| {
    let mut prefix = [0u8; 6];
    prefix.copy_from_slice(&keccak256(ADDRESS_PERMISSIONS)[..6]);
    prefix
});

/// Computes the 12-byte prefix of an LSP2 `MappingWithGrouping` key.
pub fn mapping_with_grouping_prefix(first: &str, second: &str) -> [u8; MAPPING_PREFIX_LENGTH] {
    let mut prefix = [0u8; MAPPING_PREFIX_LENGTH];
    prefix[..6].copy_from_slice(&keccak256(first)[..6]);
    prefix[6..10].copy_from_slice(&keccak256(second)[..4]);
    prefix
}

fn mapping_key(prefix: &[u8; MAPPING_PREFIX_LENGTH], controller: Address) -> B256 {
    let mut key = B256::ZERO;
    key[..MAPPING_PREFIX_LENGTH].copy_from_slice(prefix);
    key[MAPPING_PREFIX_LENGTH..].copy_from_slice(controller.as_slice());
    key
}

/// The `AddressPermissions:Permissions:<controller>` data key.
pub fn permissions_key(controller: Address) -> B256 {
    mapping_key(&PERMISSIONS_PREFIX, controller)
}

/// The `AddressPermissions:AllowedCalls:<controller>` data key.
pub fn allowed_calls_key(controller: Address) -> B256 {
    mapping_key(&ALLOWED_CALLS_PREFIX, controller)
}

/// The `AddressPermissions:AllowedERC725YDataKeys:<controller>` data key.
pub fn allowed_data_keys_key(controller: Address) -> B256 {
    mapping_key(&ALLOWED_DATA_KEYS_PREFIX, controller)
}

/// The `AddressPermissions[]` data key, holding the number of controllers as a `uint128`.
pub fn controllers_length_key() -> B256 {
    *ARRAY_LENGTH_KEY
}

/// The data key of the `index`-th element of `AddressPermissions[]`.
pub fn controller_index_key(index: u128) -> B256 {
    let mut key = B256::ZERO;
    key[..ARRAY_PREFIX_LENGTH].copy_from_slice(&ARRAY_LENGTH_KEY[..ARRAY_PREFIX_LENGTH]);
    key[ARRAY_PREFIX_LENGTH..].copy_from_slice(&index.to_be_bytes());
    key
}

/// What a data key means to the key manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKeyKind {
    /// `AddressPermissions:Permissions:<controller>`.
    Permissions(Address),
    /// `AddressPermissions:AllowedCalls:<controller>`.
    AllowedCalls(Address),
    /// `AddressPermissions:AllowedERC725YDataKeys:<controller>`.
    AllowedDataKeys(Address),
    /// `AddressPermissions[]`.
    ControllersLength,
    /// `AddressPermissions[index]`.
    ControllerIndex(u128),
    /// A key in the `AddressPermissions` namespace that none of the above recognise.
    UnrecognisedPermissionKey,
    /// Any other key, written under the `SETDATA` rules.
    Regular,
}

impl DataKeyKind {
    /// Returns `true` if writing this key changes the controller set.
    pub const fn is_permission_key(&self) -> bool {
        !matches!(self, Self::Regular)
    }
}

/// Classifies a data key.
pub fn classify_data_key(key: B256) -> DataKeyKind {
    if key == *ARRAY_LENGTH_KEY {
        return DataKeyKind::ControllersLength;
    }
    if key[..ARRAY_PREFIX_LENGTH] == ARRAY_LENGTH_KEY[..ARRAY_PREFIX_LENGTH] {
        let mut index = [0u8; 16];
        index.copy_from_slice(&key[ARRAY_PREFIX_LENGTH..]);
        return DataKeyKind::ControllerIndex(u128::from_be_bytes(index));
    }

    let controller = Address::from_slice(&key[MAPPING_PREFIX_LENGTH..]);
    let prefix = &key[..MAPPING_PREFIX_LENGTH];
    if prefix == PERMISSIONS_PREFIX.as_slice() {
        DataKeyKind::Permissions(controller)
    } else if prefix == ALLOWED_CALLS_PREFIX.as_slice() {
        DataKeyKind::AllowedCalls(controller)
    } else if prefix == ALLOWED_DATA_KEYS_PREFIX.as_slice() {
        DataKeyKind::AllowedDataKeys(controller)
    } else if key[..6] == NAMESPACE_PREFIX[..] {
        DataKeyKind::UnrecognisedPermissionKey
    } else {
        DataKeyKind::Regular
    }
}
