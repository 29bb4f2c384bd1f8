//! Tests for the permission bitmask: which bits each operation needs, and how controllers are
//! added, edited and removed through the key manager.

use std::rc::Rc;

use alloy_primitives::{address, keccak256, Address, Bytes, U256};
use alloy_sol_types::SolCall;
use lsp6_key_manager::{abi::IERC725, test_utils::*, *};
use rstest::rstest;

const CONTROLLER: Address = address!("c0000000000000000000000000000000000000c1");
const TARGET: Address = address!("7000000000000000000000000000000000000007");
const NEW_OWNER: Address = address!("0000000000000000000000000000000000000e02");

fn fixture_with_target() -> Lsp6Fixture {
    let fixture = Lsp6Fixture::new();
    fixture.register(TARGET, TargetContract::new());
    fixture
}

/// Every operation is denied naming its permission when neither it nor its super variant is
/// held, and allowed with the permission alone.
#[rstest]
#[case::call(Operation::Call, Permissions::CALL, Permissions::SUPER_CALL)]
#[case::static_call(Operation::StaticCall, Permissions::STATIC_CALL, Permissions::SUPER_STATIC_CALL)]
#[case::delegate_call(
    Operation::DelegateCall,
    Permissions::DELEGATE_CALL,
    Permissions::SUPER_DELEGATE_CALL
)]
#[case::create(Operation::Create, Permissions::DEPLOY, Permissions::empty())]
#[case::create2(Operation::Create2, Permissions::DEPLOY, Permissions::empty())]
fn test_operation_requires_permission(
    #[case] operation: Operation,
    #[case] required: Permissions,
    #[case] bypass: Permissions,
) {
    let fixture = fixture_with_target();
    let payload = execute_payload(ExecutionRequest::new(operation, TARGET, U256::ZERO, Bytes::new()));

    fixture.seed_permissions(CONTROLLER, Permissions::all().difference(required | bypass));
    assert_eq!(
        fixture.execute(CONTROLLER, &payload),
        Err(Denial::NotAuthorised { controller: CONTROLLER, permission: required }.into())
    );

    fixture.seed_permissions(CONTROLLER, required);
    assert!(fixture.execute(CONTROLLER, &payload).is_ok());
}

/// The super variant of a call permission works on its own.
#[rstest]
#[case::call(Operation::Call, Permissions::SUPER_CALL)]
#[case::static_call(Operation::StaticCall, Permissions::SUPER_STATIC_CALL)]
#[case::delegate_call(Operation::DelegateCall, Permissions::SUPER_DELEGATE_CALL)]
fn test_super_permission_alone_suffices(#[case] operation: Operation, #[case] bypass: Permissions) {
    let fixture = fixture_with_target();
    fixture.seed_permissions(CONTROLLER, bypass);
    let payload = execute_payload(ExecutionRequest::new(operation, TARGET, U256::ZERO, Bytes::new()));
    assert!(fixture.execute(CONTROLLER, &payload).is_ok());
}

/// Sending value needs the call permission and a value permission.
#[rstest]
#[case::call_only(Permissions::CALL, Some(Permissions::TRANSFER_VALUE))]
#[case::value_only(Permissions::TRANSFER_VALUE, Some(Permissions::CALL))]
#[case::call_and_value(Permissions::CALL | Permissions::TRANSFER_VALUE, None)]
#[case::call_and_super_value(Permissions::CALL | Permissions::SUPER_TRANSFER_VALUE, None)]
#[case::super_call_only(Permissions::SUPER_CALL, Some(Permissions::TRANSFER_VALUE))]
fn test_value_transfer(#[case] permissions: Permissions, #[case] missing: Option<Permissions>) {
    let fixture = fixture_with_target();
    fixture.seed_permissions(CONTROLLER, permissions);
    let amount = U256::from(7);

    let result = fixture.execute(CONTROLLER, &transfer_payload(TARGET, amount));
    match missing {
        Some(permission) => {
            assert_eq!(
                result,
                Err(Denial::NotAuthorised { controller: CONTROLLER, permission }.into())
            );
            assert_eq!(fixture.balance(TARGET), U256::ZERO);
        }
        None => {
            result.unwrap();
            assert_eq!(fixture.balance(TARGET), amount);
        }
    }
}

/// A controller that never received a permission cannot do anything, not even read.
#[test]
fn test_unknown_controller_has_no_permissions() {
    let fixture = fixture_with_target();
    let payloads = [
        transfer_payload(TARGET, U256::ZERO),
        set_data_payload(keccak256("key"), vec![1u8]),
        AccountCall::RenounceOwnership.encode(),
    ];
    for payload in payloads {
        assert_eq!(
            fixture.execute(CONTROLLER, &payload),
            Err(Denial::NoPermissionsSet { controller: CONTROLLER }.into())
        );
    }
}

/// Static calls with value are refused by the account.
#[test]
fn test_static_call_with_value_fails_in_account() {
    let fixture = fixture_with_target();
    let payload =
        execute_payload(ExecutionRequest::new(Operation::StaticCall, TARGET, U256::from(1), Bytes::new()));
    assert_eq!(
        fixture.execute(OWNER, &payload),
        Err(KeyManagerError::Account(AccountError::ValueNotAllowed(Operation::StaticCall)))
    );
}

/// Granting adds bits, revoking removes the controller entirely.
#[test]
fn test_grant_and_revoke_lifecycle() {
    let fixture = fixture_with_target();

    fixture.grant(OWNER, CONTROLLER, Permissions::CALL).unwrap();
    fixture.grant(OWNER, CONTROLLER, Permissions::TRANSFER_VALUE).unwrap();
    assert_eq!(fixture.permissions_of(CONTROLLER), Permissions::CALL | Permissions::TRANSFER_VALUE);
    assert_eq!(fixture.permission_store().unwrap().controllers(), vec![OWNER, CONTROLLER]);

    fixture.execute(CONTROLLER, &transfer_payload(TARGET, U256::from(3))).unwrap();

    fixture.revoke(OWNER, CONTROLLER).unwrap();
    assert!(fixture.permissions_of(CONTROLLER).is_empty());
    assert_eq!(fixture.permission_store().unwrap().controllers(), vec![OWNER]);
    assert_eq!(
        fixture.execute(CONTROLLER, &transfer_payload(TARGET, U256::from(3))),
        Err(Denial::NoPermissionsSet { controller: CONTROLLER }.into())
    );
}

/// Controllers without `ADDPERMISSIONS` cannot hand out permissions.
#[test]
fn test_grant_needs_add_permissions() {
    let fixture = fixture_with_target();
    fixture.seed_permissions(CONTROLLER, Permissions::CALL | Permissions::SET_DATA);

    let newcomer = address!("d000000000000000000000000000000000000000");
    assert_eq!(
        fixture.grant(CONTROLLER, newcomer, Permissions::CALL),
        Err(Denial::NotAuthorised { controller: CONTROLLER, permission: Permissions::ADD_PERMISSIONS }
            .into())
    );
    assert!(fixture.permissions_of(newcomer).is_empty());
}

/// A permission change emits `PermissionsSet` ahead of the execution result.
#[test]
fn test_permission_change_events() {
    let fixture = fixture_with_target();
    fixture.grant(OWNER, CONTROLLER, Permissions::SIGN).unwrap();

    let events = fixture.take_events();
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        KeyManagerEvent::PermissionsSet { controller: CONTROLLER, permissions: Permissions::SIGN }
    );
    assert_eq!(
        events[1],
        KeyManagerEvent::Executed {
            caller: OWNER,
            selector: IERC725::setDataBatchCall::SELECTOR.into(),
            success: true,
            return_data: Bytes::new(),
        }
    );
    assert!(fixture.take_events().is_empty());
}

/// Calls return the output of the target.
#[test]
fn test_execute_returns_target_output() {
    let fixture = Lsp6Fixture::new();
    let target = Rc::new(TargetContract::new());
    fixture.register(TARGET, Rc::clone(&target));

    let set = ITargetContract::setNameCall { name: "lsp6".to_string() }.abi_encode();
    fixture.execute(OWNER, &execute_payload(ExecutionRequest::call(TARGET, U256::ZERO, set))).unwrap();
    assert_eq!(target.name(), "lsp6");

    let get = ITargetContract::getNameCall {}.abi_encode();
    let output =
        fixture.execute(OWNER, &execute_payload(ExecutionRequest::call(TARGET, U256::ZERO, get))).unwrap();
    assert_eq!(ITargetContract::getNameCall::abi_decode_returns(&output, true).unwrap()._0, "lsp6");
}

/// Batches are authorized as a whole and return every output.
#[test]
fn test_execute_batch() {
    let fixture = fixture_with_target();
    fixture.seed_permissions(CONTROLLER, Permissions::CALL | Permissions::TRANSFER_VALUE);
    let other = address!("0000000000000000000000000000000000000123");

    let batch = AccountCall::Execute(vec![
        ExecutionRequest::call(TARGET, U256::from(1), Bytes::new()),
        ExecutionRequest::call(other, U256::from(2), Bytes::new()),
    ]);
    let output = fixture.execute(CONTROLLER, &batch.encode()).unwrap();
    assert_eq!(
        IERC725::executeBatchCall::abi_decode_returns(&output, true).unwrap()._0,
        vec![Bytes::new(), Bytes::new()]
    );
    assert_eq!(fixture.balance(TARGET), U256::from(1));
    assert_eq!(fixture.balance(other), U256::from(2));

    let denied = AccountCall::Execute(vec![
        ExecutionRequest::call(TARGET, U256::from(1), Bytes::new()),
        ExecutionRequest::new(Operation::Create, Address::ZERO, U256::ZERO, Bytes::new()),
    ]);
    assert_eq!(
        fixture.execute(CONTROLLER, &denied.encode()),
        Err(Denial::NotAuthorised { controller: CONTROLLER, permission: Permissions::DEPLOY }.into())
    );
    assert_eq!(fixture.balance(TARGET), U256::from(1));
}

/// Ownership changes need `CHANGEOWNER`. Once ownership moves away, the key manager can no
/// longer act on the account.
#[test]
fn test_transfer_ownership() {
    let fixture = fixture_with_target();
    fixture.seed_permissions(CONTROLLER, Permissions::ALL.difference(Permissions::CHANGE_OWNER));

    let payload = AccountCall::TransferOwnership(NEW_OWNER).encode();
    assert_eq!(
        fixture.execute(CONTROLLER, &payload),
        Err(Denial::NotAuthorised { controller: CONTROLLER, permission: Permissions::CHANGE_OWNER }
            .into())
    );

    fixture.execute(OWNER, &payload).unwrap();
    assert_eq!(fixture.account.owner(), NEW_OWNER);
    assert_eq!(
        fixture.execute(OWNER, &transfer_payload(TARGET, U256::from(1))),
        Err(KeyManagerError::Account(AccountError::NotOwner(KEY_MANAGER)))
    );
}

/// Renouncing leaves the account without an owner.
#[test]
fn test_renounce_ownership() {
    let fixture = fixture_with_target();
    fixture.execute(OWNER, &AccountCall::RenounceOwnership.encode()).unwrap();
    assert_eq!(fixture.account.owner(), Address::ZERO);
}

/// Deployments return the raw address of the new contract and fund it with the value.
#[test]
fn test_deploy_returns_address() {
    let fixture = Lsp6Fixture::new();
    let payload = execute_payload(ExecutionRequest::new(
        Operation::Create,
        Address::ZERO,
        U256::from(5),
        Bytes::from_static(&[0x60, 0x00]),
    ));
    let output = fixture.execute(OWNER, &payload).unwrap();
    assert_eq!(output.len(), 20);
    let deployed = Address::from_slice(&output);
    assert_eq!(fixture.balance(deployed), U256::from(5));
    assert_eq!(fixture.chain.deployments(), 1);
}

/// A controller holding `ADDPERMISSIONS` may store any larger `AddressPermissions[]` length.
/// Later permission changes neither walk that range nor overflow it.
#[test]
fn test_inflated_controller_count() {
    let fixture = fixture_with_target();
    fixture.seed_permissions(CONTROLLER, Permissions::ADD_PERMISSIONS);
    let newcomers = [
        address!("d000000000000000000000000000000000000001"),
        address!("d000000000000000000000000000000000000002"),
    ];

    for (length, newcomer) in [1u128 << 40, u128::MAX].into_iter().zip(newcomers) {
        let payload =
            set_data_payload(data_keys::controllers_length_key(), length.to_be_bytes().to_vec());
        fixture.execute(CONTROLLER, &payload).unwrap();

        fixture.grant(OWNER, newcomer, Permissions::CALL).unwrap();
        assert_eq!(fixture.permissions_of(newcomer), Permissions::CALL);
        fixture.revoke(OWNER, newcomer).unwrap();
        assert!(fixture.permissions_of(newcomer).is_empty());
    }

    assert_eq!(
        fixture.data(data_keys::controllers_length_key()),
        Bytes::copy_from_slice(&u128::MAX.to_be_bytes())
    );
    assert_eq!(fixture.permission_store().unwrap().controllers(), vec![OWNER, CONTROLLER]);
}
