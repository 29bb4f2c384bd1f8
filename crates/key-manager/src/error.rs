//! Error types of the key manager.
//!
//! Every failure maps to a custom error of [`ILSP6KeyManager`], so a failure raised inside a
//! nested call can travel through the account as revert data and be decoded again by the outer
//! dispatch.

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::{SolError, SolInterface};

use crate::{
    abi::ILSP6KeyManager::{self, ILSP6KeyManagerErrors},
    AccountError, Permissions, ReentrancyDetected,
};

/// Why the authorizer rejected a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    /// The controller holds no permission at all.
    #[error("{controller} has no permissions set")]
    NoPermissionsSet {
        /// The controller.
        controller: Address,
    },
    /// The controller lacks a required permission.
    #[error("{controller} is not authorised for {}", permission_name(.permission))]
    NotAuthorised {
        /// The controller.
        controller: Address,
        /// The missing permission.
        permission: Permissions,
    },
    /// No allowed call entry of the controller admits the call.
    #[error("{controller} is not allowed to call {selector} on {target}")]
    NotAllowedCall {
        /// The controller.
        controller: Address,
        /// The target of the call.
        target: Address,
        /// The selector of the call.
        selector: FixedBytes<4>,
    },
    /// The data key matches none of the controller's allowed data key prefixes.
    #[error("{controller} is not allowed to write data key {key}")]
    NotAllowedDataKey {
        /// The controller.
        controller: Address,
        /// The rejected key.
        key: B256,
    },
    /// A key in the `AddressPermissions` namespace the key manager does not recognise.
    #[error("unrecognised permission data key {key}")]
    UnrecognisedPermissionKey {
        /// The rejected key.
        key: B256,
    },
    /// The value written to a permission data key has the wrong shape.
    #[error("invalid value for permission data key {key}")]
    InvalidDataValue {
        /// The data key.
        key: B256,
        /// The rejected value.
        value: Bytes,
    },
    /// An allowed calls value is malformed.
    #[error("invalid encoded allowed calls")]
    InvalidEncodedAllowedCalls {
        /// The malformed value.
        value: Bytes,
    },
    /// An allowed data keys value is malformed.
    #[error("invalid encoded allowed data keys")]
    InvalidEncodedAllowedDataKeys {
        /// The malformed value.
        value: Bytes,
    },
}

fn permission_name(permission: &Permissions) -> String {
    permission.name().map(str::to_owned).unwrap_or_else(|| permission.names().join("|"))
}

/// Every failure of the key manager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyManagerError {
    /// The request was denied.
    #[error(transparent)]
    Denied(#[from] Denial),
    /// The payload calls a function the key manager does not forward.
    #[error("unknown function selector {0}")]
    UnknownSelector(FixedBytes<4>),
    /// The payload could not be ABI-decoded.
    #[error("invalid payload")]
    InvalidPayload,
    /// The arrays of a batch have different lengths.
    #[error("batch arrays have different lengths")]
    BatchLengthMismatch,
    /// The ERC725X operation type is out of range.
    #[error("invalid operation type {0}")]
    InvalidOperationType(U256),
    /// The relay nonce is not the next one of its channel.
    #[error("invalid relay nonce {nonce} for {signer}")]
    InvalidRelayNonce {
        /// The recovered signer.
        signer: Address,
        /// The submitted nonce.
        nonce: U256,
        /// The submitted signature.
        signature: Bytes,
    },
    /// No signer could be recovered from the relay signature.
    #[error("invalid relay signature")]
    InvalidRelaySignature,
    /// The validity window of the relay call has not started yet.
    #[error("relay call is not valid yet")]
    RelayCallBeforeStartTime,
    /// The validity window of the relay call has ended.
    #[error("relay call expired")]
    RelayCallExpired,
    /// A dispatch was attempted while another one is in flight.
    #[error("reentrant call")]
    ReentrantCall,
    /// The key manager is not bound to an account yet.
    #[error("key manager is not initialized")]
    NotInitialized,
    /// The key manager is already bound to an account, or is a locked base implementation.
    #[error("key manager is already initialized")]
    AlreadyInitialized,
    /// The account failed.
    #[error(transparent)]
    Account(#[from] AccountError),
}

impl From<ReentrancyDetected> for KeyManagerError {
    fn from(_: ReentrancyDetected) -> Self {
        Self::ReentrantCall
    }
}

impl KeyManagerError {
    /// Encodes the error as revert data.
    ///
    /// A revert bubbled up from the account is returned unchanged.
    pub fn abi_encode_revert(&self) -> Bytes {
        let encoded = match self {
            Self::Denied(denial) => match denial {
                Denial::NoPermissionsSet { controller } => {
                    ILSP6KeyManager::NoPermissionsSet { from: *controller }.abi_encode()
                }
                Denial::NotAuthorised { controller, permission } => ILSP6KeyManager::NotAuthorised {
                    from: *controller,
                    permission: permission_name(permission),
                }
                .abi_encode(),
                Denial::NotAllowedCall { controller, target, selector } => {
                    ILSP6KeyManager::NotAllowedCall { from: *controller, to: *target, selector: *selector }
                        .abi_encode()
                }
                Denial::NotAllowedDataKey { controller, key } => {
                    ILSP6KeyManager::NotAllowedERC725YDataKey { from: *controller, disallowedKey: *key }
                        .abi_encode()
                }
                Denial::UnrecognisedPermissionKey { key } => {
                    ILSP6KeyManager::NotRecognisedPermissionKey { dataKey: *key }.abi_encode()
                }
                Denial::InvalidDataValue { key, value } => {
                    ILSP6KeyManager::InvalidDataValuesForDataKeys {
                        dataKey: *key,
                        dataValue: value.clone(),
                    }
                    .abi_encode()
                }
                Denial::InvalidEncodedAllowedCalls { value } => {
                    ILSP6KeyManager::InvalidEncodedAllowedCalls { allowedCallsValue: value.clone() }
                        .abi_encode()
                }
                Denial::InvalidEncodedAllowedDataKeys { value } => {
                    ILSP6KeyManager::InvalidEncodedAllowedERC725YDataKeys { value: value.clone() }
                        .abi_encode()
                }
            },
            Self::UnknownSelector(selector) => {
                ILSP6KeyManager::InvalidERC725Function { invalidFunction: *selector }.abi_encode()
            }
            Self::InvalidPayload => ILSP6KeyManager::InvalidPayload {}.abi_encode(),
            Self::BatchLengthMismatch => ILSP6KeyManager::BatchLengthMismatch {}.abi_encode(),
            Self::InvalidOperationType(operation_type) => {
                ILSP6KeyManager::InvalidOperationType { operationType: *operation_type }.abi_encode()
            }
            Self::InvalidRelayNonce { signer, nonce, signature } => {
                ILSP6KeyManager::InvalidRelayNonce {
                    signer: *signer,
                    invalidNonce: *nonce,
                    signature: signature.clone(),
                }
                .abi_encode()
            }
            Self::InvalidRelaySignature => ILSP6KeyManager::InvalidRelaySignature {}.abi_encode(),
            Self::RelayCallBeforeStartTime => {
                ILSP6KeyManager::RelayCallBeforeStartTime {}.abi_encode()
            }
            Self::RelayCallExpired => ILSP6KeyManager::RelayCallExpired {}.abi_encode(),
            Self::ReentrantCall => ILSP6KeyManager::ReentrantCall {}.abi_encode(),
            Self::NotInitialized => ILSP6KeyManager::NotInitialized {}.abi_encode(),
            Self::AlreadyInitialized => ILSP6KeyManager::AlreadyInitialized {}.abi_encode(),
            Self::Account(AccountError::Reverted(output)) => return output.clone(),
            Self::Account(error) => {
                ILSP6KeyManager::AccountCallFailed { reason: error.to_string().into_bytes().into() }
                    .abi_encode()
            }
        };
        encoded.into()
    }

    /// Decodes revert data produced by [`Self::abi_encode_revert`].
    ///
    /// Data that is not a key manager error is kept as [`AccountError::Reverted`].
    pub fn decode_revert(data: &[u8]) -> Self {
        let Ok(error) = ILSP6KeyManagerErrors::abi_decode(data, true) else {
            return Self::Account(AccountError::Reverted(Bytes::copy_from_slice(data)));
        };
        match error {
            ILSP6KeyManagerErrors::NoPermissionsSet(e) => {
                Denial::NoPermissionsSet { controller: e.from }.into()
            }
            ILSP6KeyManagerErrors::NotAuthorised(e) => Denial::NotAuthorised {
                controller: e.from,
                permission: Permissions::parse_name(&e.permission).unwrap_or_default(),
            }
            .into(),
            ILSP6KeyManagerErrors::NotAllowedCall(e) => {
                Denial::NotAllowedCall { controller: e.from, target: e.to, selector: e.selector }
                    .into()
            }
            ILSP6KeyManagerErrors::NotAllowedERC725YDataKey(e) => {
                Denial::NotAllowedDataKey { controller: e.from, key: e.disallowedKey }.into()
            }
            ILSP6KeyManagerErrors::NotRecognisedPermissionKey(e) => {
                Denial::UnrecognisedPermissionKey { key: e.dataKey }.into()
            }
            ILSP6KeyManagerErrors::InvalidDataValuesForDataKeys(e) => {
                Denial::InvalidDataValue { key: e.dataKey, value: e.dataValue }.into()
            }
            ILSP6KeyManagerErrors::InvalidEncodedAllowedCalls(e) => {
                Denial::InvalidEncodedAllowedCalls { value: e.allowedCallsValue }.into()
            }
            ILSP6KeyManagerErrors::InvalidEncodedAllowedERC725YDataKeys(e) => {
                Denial::InvalidEncodedAllowedDataKeys { value: e.value }.into()
            }
            ILSP6KeyManagerErrors::InvalidERC725Function(e) => {
                Self::UnknownSelector(e.invalidFunction)
            }
            ILSP6KeyManagerErrors::InvalidPayload(_) => Self::InvalidPayload,
            ILSP6KeyManagerErrors::BatchLengthMismatch(_) => Self::BatchLengthMismatch,
            ILSP6KeyManagerErrors::InvalidOperationType(e) => {
                Self::InvalidOperationType(e.operationType)
            }
            ILSP6KeyManagerErrors::InvalidRelayNonce(e) => Self::InvalidRelayNonce {
                signer: e.signer,
                nonce: e.invalidNonce,
                signature: e.signature,
            },
            ILSP6KeyManagerErrors::InvalidRelaySignature(_) => Self::InvalidRelaySignature,
            ILSP6KeyManagerErrors::RelayCallBeforeStartTime(_) => Self::RelayCallBeforeStartTime,
            ILSP6KeyManagerErrors::RelayCallExpired(_) => Self::RelayCallExpired,
            ILSP6KeyManagerErrors::ReentrantCall(_) => Self::ReentrantCall,
            ILSP6KeyManagerErrors::NotInitialized(_) => Self::NotInitialized,
            ILSP6KeyManagerErrors::AlreadyInitialized(_) => Self::AlreadyInitialized,
            ILSP6KeyManagerErrors::AccountCallFailed(e) => Self::Account(AccountError::Custom(
                String::from_utf8_lossy(&e.reason).into_owned(),
            )),
        }
    }
}
