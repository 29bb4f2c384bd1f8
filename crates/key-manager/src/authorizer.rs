//! The decision table of the key manager.
//!
//! [`Authorizer::authorize`] is a pure function of the controller, the decoded request and the
//! permissions stored in the account. It either allows the request as a whole or names the
//! first missing permission or violated restriction.

use alloy_primitives::{Address, Bytes};

use crate::{
    allowed::{decode_allowed_calls, CallTypes},
    data_keys::{allowed_calls_key, allowed_data_keys_key, classify_data_key, DataKeyKind},
    store::decode_u128,
    AccountCall, AllowedDataKeys, DataEntry, Denial, Erc725Account, ExecutionRequest, Operation,
    PermissionStore, Permissions,
};

/// Decides whether a controller may run a request.
#[derive(Debug)]
pub struct Authorizer<'a, A> {
    store: PermissionStore<'a, A>,
}

impl<'a, A: Erc725Account> Authorizer<'a, A> {
    /// Creates an authorizer over the permissions stored in `account`.
    pub const fn new(account: &'a A) -> Self {
        Self { store: PermissionStore::new(account) }
    }

    /// Authorizes `call` for `controller`.
    ///
    /// Batches are allowed only if every element is.
    pub fn authorize(&self, controller: Address, call: &AccountCall) -> Result<(), Denial> {
        let permissions = self.store.permissions_of(controller);
        if permissions.is_empty() {
            return Err(Denial::NoPermissionsSet { controller });
        }
        let check = Check { controller, permissions };

        match call {
            AccountCall::SetData(entries) => {
                for entry in entries {
                    match self.permission_key_requirement(entry)? {
                        Some(required) => check.require(required)?,
                        None => self.authorize_regular_key(&check, entry)?,
                    }
                }
                Ok(())
            }
            AccountCall::Execute(requests) => {
                for request in requests {
                    self.authorize_execution(&check, request)?;
                }
                Ok(())
            }
            AccountCall::TransferOwnership(_) | AccountCall::RenounceOwnership => {
                check.require(Permissions::CHANGE_OWNER)
            }
        }
    }

    fn authorize_regular_key(&self, check: &Check, entry: &DataEntry) -> Result<(), Denial> {
        if check.permissions.contains(Permissions::SUPER_SET_DATA) {
            return Ok(());
        }
        check.require(Permissions::SET_DATA)?;

        let allowed = self.store.allowed_data_keys_of(check.controller).map_err(|_| {
            Denial::InvalidEncodedAllowedDataKeys {
                value: self.stored_allowed_data_keys(check.controller),
            }
        })?;
        if allowed.is_empty() || allowed.allows(entry.key) {
            Ok(())
        } else {
            Err(Denial::NotAllowedDataKey { controller: check.controller, key: entry.key })
        }
    }

    /// The permission needed to write a reserved permission data key, after validating the
    /// written value. Returns `None` for regular keys.
    fn permission_key_requirement(&self, entry: &DataEntry) -> Result<Option<Permissions>, Denial> {
        let kind = classify_data_key(entry.key);
        if !kind.is_permission_key() {
            return Ok(None);
        }
        let stored = self.store.account().get_data(entry.key);
        let invalid_value = || Denial::InvalidDataValue { key: entry.key, value: entry.value.clone() };

        let required = match kind {
            DataKeyKind::Permissions(_) => {
                if !entry.value.is_empty() && entry.value.len() != 32 {
                    return Err(invalid_value());
                }
                add_or_change(&stored)
            }
            DataKeyKind::AllowedCalls(_) => {
                if !entry.value.is_empty() {
                    decode_allowed_calls(&entry.value).map_err(|_| {
                        Denial::InvalidEncodedAllowedCalls { value: entry.value.clone() }
                    })?;
                }
                add_or_change(&stored)
            }
            DataKeyKind::AllowedDataKeys(_) => {
                if !entry.value.is_empty() {
                    AllowedDataKeys::decode(&entry.value).map_err(|_| {
                        Denial::InvalidEncodedAllowedDataKeys { value: entry.value.clone() }
                    })?;
                }
                add_or_change(&stored)
            }
            DataKeyKind::ControllersLength => {
                let new_length = decode_u128(&entry.value).ok_or_else(invalid_value)?;
                let current_length = decode_u128(&stored).unwrap_or_default();
                if new_length > current_length {
                    Permissions::ADD_PERMISSIONS
                } else {
                    Permissions::CHANGE_PERMISSIONS
                }
            }
            DataKeyKind::ControllerIndex(_) => {
                if !entry.value.is_empty() && entry.value.len() != 20 {
                    return Err(invalid_value());
                }
                add_or_change(&stored)
            }
            DataKeyKind::UnrecognisedPermissionKey | DataKeyKind::Regular => {
                return Err(Denial::UnrecognisedPermissionKey { key: entry.key })
            }
        };
        Ok(Some(required))
    }

    fn authorize_execution(&self, check: &Check, request: &ExecutionRequest) -> Result<(), Denial> {
        let transfers_value = request.transfers_value();

        if request.operation.is_deployment() {
            check.require(Permissions::DEPLOY)?;
            if transfers_value {
                check.require_any(Permissions::TRANSFER_VALUE, Permissions::SUPER_TRANSFER_VALUE)?;
            }
            return Ok(());
        }

        let (permission, super_permission) = match request.operation {
            Operation::StaticCall => (Permissions::STATIC_CALL, Permissions::SUPER_STATIC_CALL),
            Operation::DelegateCall => (Permissions::DELEGATE_CALL, Permissions::SUPER_DELEGATE_CALL),
            _ => (Permissions::CALL, Permissions::SUPER_CALL),
        };
        check.require_any(permission, super_permission)?;
        if transfers_value {
            check.require_any(Permissions::TRANSFER_VALUE, Permissions::SUPER_TRANSFER_VALUE)?;
        }

        let super_call = check.permissions.contains(super_permission);
        let super_value =
            !transfers_value || check.permissions.contains(Permissions::SUPER_TRANSFER_VALUE);
        if super_call && super_value {
            return Ok(());
        }

        let calls = self.store.allowed_calls_of(check.controller).map_err(|_| {
            Denial::InvalidEncodedAllowedCalls { value: self.stored_allowed_calls(check.controller) }
        })?;
        if calls.is_empty() {
            return Ok(());
        }

        let mut required = CallTypes::empty();
        if !super_call {
            required |= CallTypes::of_operation(request.operation).unwrap_or_default();
        }
        if !super_value {
            required |= CallTypes::VALUE;
        }
        let selector = request.selector();
        let admitted = calls.iter().any(|call| {
            call.admits(required, request.target, selector) &&
                call.required_interface().map_or(true, |interface_id| {
                    self.store.account().supports_interface(request.target, interface_id)
                })
        });
        if admitted {
            Ok(())
        } else {
            Err(Denial::NotAllowedCall {
                controller: check.controller,
                target: request.target,
                selector,
            })
        }
    }

    fn stored_allowed_calls(&self, controller: Address) -> Bytes {
        self.store.account().get_data(allowed_calls_key(controller))
    }

    fn stored_allowed_data_keys(&self, controller: Address) -> Bytes {
        self.store.account().get_data(allowed_data_keys_key(controller))
    }
}

/// The permission needed to write a permission data key: `ADDPERMISSIONS` while the key is
/// unset, `CHANGEPERMISSIONS` once it holds a value.
///
/// The controller whose key is written is not considered, so `CHANGEPERMISSIONS` can raise the
/// caller's own bitmask and `ADDPERMISSIONS` can create a fully privileged controller.
fn add_or_change(stored: &Bytes) -> Permissions {
    if stored.is_empty() {
        Permissions::ADD_PERMISSIONS
    } else {
        Permissions::CHANGE_PERMISSIONS
    }
}

struct Check {
    controller: Address,
    permissions: Permissions,
}

impl Check {
    fn require(&self, permission: Permissions) -> Result<(), Denial> {
        if self.permissions.contains(permission) {
            Ok(())
        } else {
            Err(Denial::NotAuthorised { controller: self.controller, permission })
        }
    }

    /// Requires `permission` or its super variant. A denial names `permission`.
    fn require_any(&self, permission: Permissions, super_permission: Permissions) -> Result<(), Denial> {
        if self.permissions.intersects(permission | super_permission) {
            Ok(())
        } else {
            Err(Denial::NotAuthorised { controller: self.controller, permission })
        }
    }
}
