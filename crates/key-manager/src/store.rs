//! Permissions stored in the account's data store.
//!
//! [`PermissionStore`] reads them, [`PermissionUpdate`] produces the data key writes that change
//! them. Neither authorizes anything: the writes are sent through the key manager like any other
//! payload.

use alloy_primitives::{Address, Bytes, B256};

use crate::{
    allowed::{decode_allowed_calls, encode_allowed_calls, AllowedCall, AllowedDataKeys},
    compact::CodecError,
    data_keys::{
        allowed_calls_key, allowed_data_keys_key, controller_index_key, controllers_length_key,
        permissions_key,
    },
    constants::lsp6::MAX_CONTROLLER_SCAN,
    AccountCall, DataEntry, Erc725Account, Permissions,
};

/// Read view over the permissions of an account.
#[derive(Debug)]
pub struct PermissionStore<'a, A> {
    account: &'a A,
}

impl<A> Clone for PermissionStore<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for PermissionStore<'_, A> {}

impl<'a, A: Erc725Account> PermissionStore<'a, A> {
    /// Creates a view over `account`.
    pub const fn new(account: &'a A) -> Self {
        Self { account }
    }

    /// The account.
    pub const fn account(&self) -> &'a A {
        self.account
    }

    /// The permission bitmask of `controller`.
    pub fn permissions_of(&self, controller: Address) -> Permissions {
        Permissions::from_word(&self.account.get_data(permissions_key(controller)))
    }

    /// The allowed calls of `controller`. Empty if none are stored.
    pub fn allowed_calls_of(&self, controller: Address) -> Result<Vec<AllowedCall>, CodecError> {
        decode_allowed_calls(&self.account.get_data(allowed_calls_key(controller)))
    }

    /// The allowed data keys of `controller`. Empty if none are stored.
    pub fn allowed_data_keys_of(&self, controller: Address) -> Result<AllowedDataKeys, CodecError> {
        AllowedDataKeys::decode(&self.account.get_data(allowed_data_keys_key(controller)))
    }

    /// The length stored under `AddressPermissions[]`.
    pub fn controller_count(&self) -> u128 {
        decode_u128(&self.account.get_data(controllers_length_key())).unwrap_or_default()
    }

    /// The controllers listed in `AddressPermissions[]`, skipping empty or malformed slots.
    ///
    /// At most [`MAX_CONTROLLER_SCAN`] slots are read.
    pub fn controllers(&self) -> Vec<Address> {
        (0..self.controller_count().min(MAX_CONTROLLER_SCAN))
            .filter_map(|index| decode_address(&self.account.get_data(controller_index_key(index))))
            .collect()
    }

    /// Starts a set of changes over the current permissions.
    pub fn update(&self) -> PermissionUpdate<'a, A> {
        PermissionUpdate { store: *self, entries: Vec::new() }
    }
}

/// Decodes a 16-byte big-endian `uint128` value.
pub(crate) fn decode_u128(value: &[u8]) -> Option<u128> {
    let bytes: [u8; 16] = value.try_into().ok()?;
    Some(u128::from_be_bytes(bytes))
}

fn decode_address(value: &[u8]) -> Option<Address> {
    (value.len() == 20).then(|| Address::from_slice(value))
}

/// A batch of permission changes, encoded as data key writes.
///
/// Every change sees the effect of the previous ones, so a controller can be added and
/// restricted in the same batch.
#[derive(Debug)]
pub struct PermissionUpdate<'a, A> {
    store: PermissionStore<'a, A>,
    entries: Vec<DataEntry>,
}

impl<A: Erc725Account> PermissionUpdate<'_, A> {
    fn current(&self, key: B256) -> Bytes {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.clone())
            .unwrap_or_else(|| self.store.account.get_data(key))
    }

    fn write(&mut self, key: B256, value: impl Into<Bytes>) {
        let value = value.into();
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => entry.value = value,
            None => self.entries.push(DataEntry::new(key, value)),
        }
    }

    fn controller_count(&self) -> u128 {
        decode_u128(&self.current(controllers_length_key())).unwrap_or_default()
    }

    fn position_of(&self, controller: Address) -> Option<u128> {
        (0..self.controller_count().min(MAX_CONTROLLER_SCAN)).find(|index| {
            decode_address(&self.current(controller_index_key(*index))) == Some(controller)
        })
    }

    /// Adds `permissions` to the bitmask of `controller`, listing it if it is new.
    ///
    /// A controller is new while its permissions key is unset.
    pub fn grant(self, controller: Address, permissions: Permissions) -> Self {
        let current = Permissions::from_word(&self.current(permissions_key(controller)));
        self.write_permissions(controller, current | permissions)
    }

    /// Replaces the bitmask of `controller`, listing it if it is new.
    pub fn set_permissions(self, controller: Address, permissions: Permissions) -> Self {
        self.write_permissions(controller, permissions)
    }

    fn write_permissions(mut self, controller: Address, permissions: Permissions) -> Self {
        let key = permissions_key(controller);
        let is_new = self.current(key).is_empty();
        self.write(key, permissions.to_word().to_vec());
        if is_new {
            self.append_controller(controller);
        }
        self
    }

    fn append_controller(&mut self, controller: Address) {
        let count = self.controller_count();
        let Some(length) = count.checked_add(1) else {
            return;
        };
        self.write(controller_index_key(count), Bytes::copy_from_slice(controller.as_slice()));
        self.write(controllers_length_key(), Bytes::copy_from_slice(&length.to_be_bytes()));
    }

    /// Clears the bitmask and the restriction lists of `controller` and removes it from
    /// `AddressPermissions[]`, moving the last controller into its slot.
    pub fn revoke(mut self, controller: Address) -> Self {
        for key in
            [permissions_key(controller), allowed_calls_key(controller), allowed_data_keys_key(controller)]
        {
            if !self.current(key).is_empty() {
                self.write(key, Bytes::new());
            }
        }

        if let Some(position) = self.position_of(controller) {
            let last = self.controller_count() - 1;
            if position != last {
                let moved = self.current(controller_index_key(last));
                self.write(controller_index_key(position), moved);
            }
            self.write(controller_index_key(last), Bytes::new());
            self.write(controllers_length_key(), Bytes::copy_from_slice(&last.to_be_bytes()));
        }
        self
    }

    /// Replaces the allowed calls of `controller`. An empty list clears the key.
    pub fn set_allowed_calls(mut self, controller: Address, calls: &[AllowedCall]) -> Self {
        self.write(allowed_calls_key(controller), encode_allowed_calls(calls));
        self
    }

    /// Replaces the allowed data keys of `controller`. An empty list clears the key.
    pub fn set_allowed_data_keys(mut self, controller: Address, keys: &AllowedDataKeys) -> Self {
        self.write(allowed_data_keys_key(controller), keys.encode());
        self
    }

    /// Appends `controller` to `AddressPermissions[]` unless it is found in the first
    /// [`MAX_CONTROLLER_SCAN`] slots. Nothing is written once the length reaches `u128::MAX`.
    pub fn add_controller(mut self, controller: Address) -> Self {
        if self.position_of(controller).is_none() {
            self.append_controller(controller);
        }
        self
    }

    /// The data key writes, in the order they were first made.
    pub fn into_entries(self) -> Vec<DataEntry> {
        self.entries
    }

    /// The writes as a payload for the key manager.
    ///
    /// Returns `None` if there is nothing to write.
    pub fn into_payload(self) -> Option<Bytes> {
        (!self.entries.is_empty()).then(|| AccountCall::SetData(self.entries).encode())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashMap};

    use super::*;
    use crate::{allowed::CallTypes, AccountError, Operation};
    use alloy_primitives::{address, hex, FixedBytes, U256};

    const ALICE: Address = address!("a11ce00000000000000000000000000000000001");
    const BOB: Address = address!("b0b0000000000000000000000000000000000002");
    const CAROL: Address = address!("ca7010000000000000000000000000000000003a");

    #[derive(Default)]
    struct DataOnly(RefCell<HashMap<B256, Bytes>>);

    impl DataOnly {
        fn apply(&self, entries: Vec<DataEntry>) {
            let mut data = self.0.borrow_mut();
            for entry in entries {
                if entry.value.is_empty() {
                    data.remove(&entry.key);
                } else {
                    data.insert(entry.key, entry.value);
                }
            }
        }
    }

    impl Erc725Account for DataOnly {
        fn address(&self) -> Address {
            Address::ZERO
        }
        fn owner(&self) -> Address {
            Address::ZERO
        }
        fn get_data(&self, key: B256) -> Bytes {
            self.0.borrow().get(&key).cloned().unwrap_or_default()
        }
        fn set_data(&self, _: Address, key: B256, value: Bytes) -> Result<(), AccountError> {
            self.apply(vec![DataEntry::new(key, value)]);
            Ok(())
        }
        fn execute(
            &self,
            _: Address,
            operation: Operation,
            _: Address,
            _: U256,
            _: Bytes,
        ) -> Result<Bytes, AccountError> {
            Err(AccountError::Custom(format!("{operation} unsupported")))
        }
        fn transfer_ownership(&self, _: Address, _: Address) -> Result<(), AccountError> {
            Ok(())
        }
        fn renounce_ownership(&self, _: Address) -> Result<(), AccountError> {
            Ok(())
        }
        fn supports_interface(&self, _: Address, _: FixedBytes<4>) -> bool {
            false
        }
    }

    #[test]
    fn test_unset_controller_reads_empty() {
        let account = DataOnly::default();
        let store = PermissionStore::new(&account);
        assert!(store.permissions_of(ALICE).is_empty());
        assert!(store.allowed_calls_of(ALICE).unwrap().is_empty());
        assert!(store.allowed_data_keys_of(ALICE).unwrap().is_empty());
        assert!(store.controllers().is_empty());
    }

    #[test]
    fn test_grant_lists_new_controller_once() {
        let account = DataOnly::default();
        let store = PermissionStore::new(&account);
        let entries = store
            .update()
            .grant(ALICE, Permissions::CALL)
            .grant(ALICE, Permissions::TRANSFER_VALUE)
            .grant(BOB, Permissions::SIGN)
            .into_entries();
        account.apply(entries);

        assert_eq!(store.permissions_of(ALICE), Permissions::CALL | Permissions::TRANSFER_VALUE);
        assert_eq!(store.permissions_of(BOB), Permissions::SIGN);
        assert_eq!(store.controller_count(), 2);
        assert_eq!(store.controllers(), vec![ALICE, BOB]);
        assert_eq!(
            account.get_data(controllers_length_key()).as_ref(),
            &hex!("00000000000000000000000000000002")
        );
    }

    #[test]
    fn test_set_permissions_replaces_bits() {
        let account = DataOnly::default();
        let store = PermissionStore::new(&account);
        account.apply(store.update().grant(ALICE, Permissions::ALL).into_entries());
        account.apply(store.update().set_permissions(ALICE, Permissions::SIGN).into_entries());
        assert_eq!(store.permissions_of(ALICE), Permissions::SIGN);
        assert_eq!(store.controllers(), vec![ALICE]);
    }

    #[test]
    fn test_revoke_moves_last_controller() {
        let account = DataOnly::default();
        let store = PermissionStore::new(&account);
        let calls = [AllowedCall::any_function_of(CallTypes::CALL, BOB)];
        account.apply(
            store
                .update()
                .grant(ALICE, Permissions::CALL)
                .set_allowed_calls(ALICE, &calls)
                .grant(BOB, Permissions::CALL)
                .grant(CAROL, Permissions::CALL)
                .into_entries(),
        );
        assert_eq!(store.allowed_calls_of(ALICE).unwrap(), calls);

        account.apply(store.update().revoke(ALICE).into_entries());
        assert!(store.permissions_of(ALICE).is_empty());
        assert!(store.allowed_calls_of(ALICE).unwrap().is_empty());
        assert_eq!(store.controllers(), vec![CAROL, BOB]);
        assert!(account.get_data(controller_index_key(2)).is_empty());
    }

    #[test]
    fn test_revoke_of_unknown_controller_writes_nothing() {
        let account = DataOnly::default();
        let store = PermissionStore::new(&account);
        assert!(store.update().revoke(ALICE).into_payload().is_none());
    }
}
