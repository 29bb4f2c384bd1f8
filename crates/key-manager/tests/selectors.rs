//! Tests for payload decoding: only the ERC725 functions the key manager recognises are
//! forwarded, and same-named overloads are rejected.

use alloy_primitives::{keccak256, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolError};
use lsp6_key_manager::{
    abi::{IERC725, ILSP6KeyManager},
    test_utils::*,
    *,
};

mod batch_overload {
    alloy_sol_types::sol! {
        function setData(bytes32[] dataKeys, bytes[] dataValues, string note) external;
    }
}

mod execute_overload {
    alloy_sol_types::sol! {
        function execute(uint256 operationType, address target, uint256 value, bytes data, bytes32 salt) external payable returns (bytes);
    }
}

fn keys() -> Vec<B256> {
    vec![keccak256("FirstKey"), keccak256("SecondKey")]
}

fn values() -> Vec<Bytes> {
    vec![Bytes::from_static(b"first"), Bytes::from_static(b"second")]
}

/// `setDataBatch(bytes32[],bytes[])` is forwarded.
#[test]
fn test_set_data_batch_passes() {
    let fixture = Lsp6Fixture::new();
    let payload = IERC725::setDataBatchCall { dataKeys: keys(), dataValues: values() }.abi_encode();

    fixture.execute(OWNER, &payload).unwrap();
    for (key, value) in keys().into_iter().zip(values()) {
        assert_eq!(fixture.data(key), value);
    }
}

/// `setData(bytes32[],bytes[],string)` is not a function the key manager knows, even though
/// the batch write it resembles would pass.
#[test]
fn test_set_data_overload_with_extra_argument_fails() {
    let fixture = Lsp6Fixture::new();
    let payload = batch_overload::setDataCall {
        dataKeys: keys(),
        dataValues: values(),
        note: "trust me".to_string(),
    }
    .abi_encode();

    assert_eq!(
        fixture.execute(OWNER, &payload),
        Err(KeyManagerError::UnknownSelector(batch_overload::setDataCall::SELECTOR.into()))
    );
    for key in keys() {
        assert!(fixture.data(key).is_empty());
    }
}

/// An `execute` overload carrying a salt is rejected before any authorization.
#[test]
fn test_execute_overload_fails() {
    let fixture = Lsp6Fixture::new();
    let payload = execute_overload::executeCall {
        operationType: U256::ZERO,
        target: OWNER,
        value: U256::from(1),
        data: Bytes::new(),
        salt: B256::ZERO,
    }
    .abi_encode();

    assert_eq!(
        fixture.execute(OWNER, &payload),
        Err(KeyManagerError::UnknownSelector(execute_overload::executeCall::SELECTOR.into()))
    );
    assert_eq!(fixture.balance(ACCOUNT), INITIAL_BALANCE);
}

/// Through the ABI entry point the failure surfaces as `InvalidERC725Function(bytes4)`.
#[test]
fn test_unknown_selector_revert_data() {
    let fixture = Lsp6Fixture::new();
    let payload = batch_overload::setDataCall {
        dataKeys: keys(),
        dataValues: values(),
        note: String::new(),
    }
    .abi_encode();
    let calldata = ILSP6KeyManager::executeCall { payload: payload.into() }.abi_encode();

    let error = fixture.dispatch(OWNER, &calldata).unwrap_err();
    assert_eq!(
        error.abi_encode_revert(),
        Bytes::from(
            ILSP6KeyManager::InvalidERC725Function {
                invalidFunction: batch_overload::setDataCall::SELECTOR.into()
            }
            .abi_encode()
        )
    );
    assert_eq!(KeyManagerError::decode_revert(&error.abi_encode_revert()), error);
}

/// Payloads too short to carry a selector, or whose arguments do not decode, are invalid.
#[test]
fn test_malformed_payloads() {
    let fixture = Lsp6Fixture::new();
    assert_eq!(fixture.execute(OWNER, &[]), Err(KeyManagerError::InvalidPayload));
    assert_eq!(fixture.execute(OWNER, &[0x44, 0xc0]), Err(KeyManagerError::InvalidPayload));

    let payload = IERC725::setDataCall { dataKey: B256::ZERO, dataValue: Bytes::new() }.abi_encode();
    assert_eq!(
        fixture.execute(OWNER, &payload[..payload.len() - 1]),
        Err(KeyManagerError::InvalidPayload)
    );
}

/// The key manager's own interface rejects unknown functions too.
#[test]
fn test_dispatch_unknown_function() {
    let fixture = Lsp6Fixture::new();
    let calldata = IERC725::renounceOwnershipCall {}.abi_encode();
    assert_eq!(
        fixture.dispatch(OWNER, &calldata),
        Err(KeyManagerError::UnknownSelector(IERC725::renounceOwnershipCall::SELECTOR.into()))
    );
}

/// A written key reads back exactly; unset keys read back empty and an empty write clears.
#[test]
fn test_set_data_round_trip() {
    let fixture = Lsp6Fixture::new();
    let key = keccak256("MyKey");
    assert!(fixture.data(key).is_empty());

    fixture.execute(OWNER, &set_data_payload(key, Bytes::from_static(b"hello"))).unwrap();
    assert_eq!(fixture.data(key), Bytes::from_static(b"hello"));

    fixture.execute(OWNER, &set_data_payload(key, Bytes::new())).unwrap();
    assert!(fixture.data(key).is_empty());
}
