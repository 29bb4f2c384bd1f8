//! Decoding of the payloads sent to the key manager.
//!
//! A payload is calldata for one of the [`IERC725`] functions. It is decoded into an
//! [`AccountCall`], a closed set of variants the authorizer matches exhaustively.

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use serde::{Deserialize, Serialize};

use crate::{abi::IERC725, KeyManagerError, Operation};

/// A data key write.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataEntry {
    /// The data key.
    pub key: B256,
    /// The value. Empty bytes clear the key.
    pub value: Bytes,
}

impl DataEntry {
    /// Creates a data key write.
    pub fn new(key: B256, value: impl Into<Bytes>) -> Self {
        Self { key, value: value.into() }
    }
}

/// A low-level operation to forward to the account.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// The operation type.
    pub operation: Operation,
    /// The target. Ignored for deployments.
    pub target: Address,
    /// Value to transfer.
    pub value: U256,
    /// Call data, or init code for deployments.
    pub data: Bytes,
}

impl ExecutionRequest {
    /// Creates a request.
    pub fn new(operation: Operation, target: Address, value: U256, data: impl Into<Bytes>) -> Self {
        Self { operation, target, value, data: data.into() }
    }

    /// A `CALL` to `target`.
    pub fn call(target: Address, value: U256, data: impl Into<Bytes>) -> Self {
        Self::new(Operation::Call, target, value, data)
    }

    /// Returns `true` if the request transfers value.
    pub fn transfers_value(&self) -> bool {
        !self.value.is_zero()
    }

    /// The function selector called on the target. Data shorter than four bytes is
    /// right-padded with zeros, so a plain value transfer has selector `0x00000000`.
    pub fn selector(&self) -> FixedBytes<4> {
        let mut selector = FixedBytes::<4>::ZERO;
        let len = self.data.len().min(4);
        selector[..len].copy_from_slice(&self.data[..len]);
        selector
    }
}

/// A decoded payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountCall {
    /// `setData` / `setDataBatch`.
    SetData(Vec<DataEntry>),
    /// `execute` / `executeBatch`.
    Execute(Vec<ExecutionRequest>),
    /// `transferOwnership`.
    TransferOwnership(Address),
    /// `renounceOwnership`.
    RenounceOwnership,
}

impl AccountCall {
    /// Decodes a payload.
    ///
    /// Fails with [`KeyManagerError::UnknownSelector`] for any function outside of [`IERC725`],
    /// including overloads of the recognised ones.
    pub fn decode(payload: &[u8]) -> Result<Self, KeyManagerError> {
        let Some(selector) = payload.get(..4) else {
            return Err(KeyManagerError::InvalidPayload);
        };
        let selector: [u8; 4] = selector.try_into().map_err(|_| KeyManagerError::InvalidPayload)?;

        match selector {
            IERC725::setDataCall::SELECTOR => {
                let call = decode_call::<IERC725::setDataCall>(payload)?;
                Ok(Self::SetData(vec![DataEntry::new(call.dataKey, call.dataValue)]))
            }
            IERC725::setDataBatchCall::SELECTOR => {
                let call = decode_call::<IERC725::setDataBatchCall>(payload)?;
                if call.dataKeys.len() != call.dataValues.len() {
                    return Err(KeyManagerError::BatchLengthMismatch);
                }
                if call.dataKeys.is_empty() {
                    return Err(KeyManagerError::InvalidPayload);
                }
                let entries =
                    call.dataKeys.into_iter().zip(call.dataValues).map(|(k, v)| DataEntry::new(k, v));
                Ok(Self::SetData(entries.collect()))
            }
            IERC725::executeCall::SELECTOR => {
                let call = decode_call::<IERC725::executeCall>(payload)?;
                let operation = parse_operation(call.operationType)?;
                Ok(Self::Execute(vec![ExecutionRequest::new(
                    operation,
                    call.target,
                    call.value,
                    call.data,
                )]))
            }
            IERC725::executeBatchCall::SELECTOR => {
                let call = decode_call::<IERC725::executeBatchCall>(payload)?;
                let len = call.operationsType.len();
                if call.targets.len() != len || call.values.len() != len || call.datas.len() != len
                {
                    return Err(KeyManagerError::BatchLengthMismatch);
                }
                if len == 0 {
                    return Err(KeyManagerError::InvalidPayload);
                }
                let mut requests = Vec::with_capacity(len);
                for (((operation, target), value), data) in
                    call.operationsType.into_iter().zip(call.targets).zip(call.values).zip(call.datas)
                {
                    requests.push(ExecutionRequest::new(
                        parse_operation(operation)?,
                        target,
                        value,
                        data,
                    ));
                }
                Ok(Self::Execute(requests))
            }
            IERC725::transferOwnershipCall::SELECTOR => {
                let call = decode_call::<IERC725::transferOwnershipCall>(payload)?;
                Ok(Self::TransferOwnership(call.newOwner))
            }
            IERC725::renounceOwnershipCall::SELECTOR => {
                decode_call::<IERC725::renounceOwnershipCall>(payload)?;
                Ok(Self::RenounceOwnership)
            }
            _ => Err(KeyManagerError::UnknownSelector(selector.into())),
        }
    }

    /// Encodes the call as [`IERC725`] calldata. Single writes and single executions use the
    /// non-batch functions.
    pub fn encode(&self) -> Bytes {
        let calldata = match self {
            Self::SetData(entries) => match entries.as_slice() {
                [entry] => IERC725::setDataCall { dataKey: entry.key, dataValue: entry.value.clone() }
                    .abi_encode(),
                entries => IERC725::setDataBatchCall {
                    dataKeys: entries.iter().map(|entry| entry.key).collect(),
                    dataValues: entries.iter().map(|entry| entry.value.clone()).collect(),
                }
                .abi_encode(),
            },
            Self::Execute(requests) => match requests.as_slice() {
                [request] => IERC725::executeCall {
                    operationType: U256::from(request.operation.code()),
                    target: request.target,
                    value: request.value,
                    data: request.data.clone(),
                }
                .abi_encode(),
                requests => IERC725::executeBatchCall {
                    operationsType: requests
                        .iter()
                        .map(|request| U256::from(request.operation.code()))
                        .collect(),
                    targets: requests.iter().map(|request| request.target).collect(),
                    values: requests.iter().map(|request| request.value).collect(),
                    datas: requests.iter().map(|request| request.data.clone()).collect(),
                }
                .abi_encode(),
            },
            Self::TransferOwnership(new_owner) => {
                IERC725::transferOwnershipCall { newOwner: *new_owner }.abi_encode()
            }
            Self::RenounceOwnership => IERC725::renounceOwnershipCall {}.abi_encode(),
        };
        calldata.into()
    }
}

/// ABI encoding of the outputs of an `executeBatch`.
pub(crate) fn encode_batch_outputs(outputs: Vec<Bytes>) -> Bytes {
    outputs.abi_encode().into()
}

fn decode_call<C: SolCall>(payload: &[u8]) -> Result<C, KeyManagerError> {
    C::abi_decode(payload, true).map_err(|_| KeyManagerError::InvalidPayload)
}

fn parse_operation(code: U256) -> Result<Operation, KeyManagerError> {
    Operation::from_code(code).ok_or(KeyManagerError::InvalidOperationType(code))
}
