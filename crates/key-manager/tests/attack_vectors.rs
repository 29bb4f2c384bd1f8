//! Tests for the attacks the key manager must withstand: reentrancy drains, self-destruction
//! through `DELEGATECALL` and privilege escalation through the permission keys.

use std::rc::Rc;

use alloy_primitives::{address, Address, Bytes, U256};
use lsp6_key_manager::{test_utils::*, *};

const CONTROLLER: Address = address!("c0000000000000000000000000000000000000c1");
const ATTACKER: Address = address!("a77ac0000000000000000000000000000000000a");
const DESTRUCTOR: Address = address!("de57000000000000000000000000000000000001");
const AMOUNT: U256 = U256::from_limbs([10, 0, 0, 0]);

/// Sets up a controller paying `AMOUNT` to a contract that re-enters the key manager to be
/// paid a second time. The attacker contract holds the same permissions as the controller,
/// plus `extra`.
fn reentrancy_setup(
    config: KeyManagerConfig,
    attacker: ReentrantAttacker,
    extra: Permissions,
) -> (Lsp6Fixture, Rc<ReentrantAttacker>) {
    let fixture = Lsp6Fixture::with_config(config);
    let attacker = Rc::new(attacker);
    fixture.register(ATTACKER, Rc::clone(&attacker));
    fixture.seed_permissions(CONTROLLER, Permissions::CALL | Permissions::TRANSFER_VALUE);
    fixture.seed_permissions(ATTACKER, Permissions::CALL | Permissions::TRANSFER_VALUE | extra);
    (fixture, attacker)
}

/// A value-receive hook re-entering `execute` makes the whole instruction revert.
#[test]
fn test_reentrant_transfer_is_rejected() {
    let (fixture, attacker) = reentrancy_setup(
        KeyManagerConfig::default(),
        ReentrantAttacker::new(KEY_MANAGER, transfer_payload(ATTACKER, AMOUNT)),
        Permissions::empty(),
    );

    let result = fixture.execute(CONTROLLER, &transfer_payload(ATTACKER, AMOUNT));
    assert_eq!(result, Err(KeyManagerError::ReentrantCall));
    assert_eq!(fixture.balance(ATTACKER), U256::ZERO);
    assert_eq!(fixture.balance(ACCOUNT), INITIAL_BALANCE);
    assert!(fixture.take_events().is_empty());

    let Some(Err(AccountError::Reverted(revert))) = attacker.reentry_result() else {
        panic!("the attacker should have re-entered");
    };
    assert_eq!(KeyManagerError::decode_revert(&revert), KeyManagerError::ReentrantCall);
}

/// A re-entering caller without any permission is refused by the authorizer before the guard
/// is consulted.
#[test]
fn test_reentry_without_permissions_is_unauthorised() {
    const STRANGER: Address = address!("5700000000000000000000000000000000000001");
    let fixture = Lsp6Fixture::new();
    let attacker = Rc::new(ReentrantAttacker::new(KEY_MANAGER, transfer_payload(STRANGER, AMOUNT)));
    fixture.register(STRANGER, Rc::clone(&attacker));
    fixture.seed_permissions(CONTROLLER, Permissions::CALL | Permissions::TRANSFER_VALUE);

    let expected = KeyManagerError::from(Denial::NoPermissionsSet { controller: STRANGER });
    let result = fixture.execute(CONTROLLER, &transfer_payload(STRANGER, AMOUNT));
    assert_eq!(result, Err(expected.clone()));
    assert_eq!(fixture.balance(STRANGER), U256::ZERO);

    let Some(Err(AccountError::Reverted(revert))) = attacker.reentry_result() else {
        panic!("the attacker should have re-entered");
    };
    assert_eq!(KeyManagerError::decode_revert(&revert), expected);
}

/// An attacker swallowing the failed re-entry keeps only the single authorized transfer.
#[test]
fn test_swallowed_reentry_drains_nothing_extra() {
    let (fixture, attacker) = reentrancy_setup(
        KeyManagerConfig::default(),
        ReentrantAttacker::new(KEY_MANAGER, transfer_payload(ATTACKER, AMOUNT)).swallowing_failure(),
        Permissions::empty(),
    );

    fixture.execute(CONTROLLER, &transfer_payload(ATTACKER, AMOUNT)).unwrap();
    assert_eq!(fixture.balance(ATTACKER), AMOUNT);
    assert_eq!(fixture.balance(ACCOUNT), INITIAL_BALANCE - AMOUNT);
    assert!(matches!(attacker.reentry_result(), Some(Err(AccountError::Reverted(_)))));

    let events = fixture.take_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        KeyManagerEvent::Executed { caller, success: true, .. } if caller == CONTROLLER
    ));
}

/// The guard is released once the instruction finishes, so later instructions go through.
#[test]
fn test_guard_released_after_rejected_reentry() {
    let (fixture, _attacker) = reentrancy_setup(
        KeyManagerConfig::default(),
        ReentrantAttacker::new(KEY_MANAGER, transfer_payload(ATTACKER, AMOUNT)),
        Permissions::empty(),
    );

    assert!(fixture.execute(CONTROLLER, &transfer_payload(ATTACKER, AMOUNT)).is_err());
    // The attacker hook fires only once, so this transfer is not re-entered.
    fixture.execute(CONTROLLER, &transfer_payload(ATTACKER, AMOUNT)).unwrap();
    assert_eq!(fixture.balance(ATTACKER), AMOUNT);
}

/// Under the permission-gated policy, a controller holding `REENTRANCY` may re-enter.
#[test]
fn test_permission_gated_reentry() {
    let config = KeyManagerConfig::default().with_reentrancy(ReentrancyPolicy::PermissionGated);

    let (fixture, _attacker) = reentrancy_setup(
        config.clone(),
        ReentrantAttacker::new(KEY_MANAGER, transfer_payload(ATTACKER, AMOUNT)),
        Permissions::REENTRANCY,
    );
    fixture.execute(CONTROLLER, &transfer_payload(ATTACKER, AMOUNT)).unwrap();
    assert_eq!(fixture.balance(ATTACKER), AMOUNT * U256::from(2));
    assert_eq!(fixture.take_events().len(), 2);

    let (fixture, _attacker) = reentrancy_setup(
        config,
        ReentrantAttacker::new(KEY_MANAGER, transfer_payload(ATTACKER, AMOUNT)),
        Permissions::empty(),
    );
    assert_eq!(
        fixture.execute(CONTROLLER, &transfer_payload(ATTACKER, AMOUNT)),
        Err(KeyManagerError::ReentrantCall)
    );
    assert_eq!(fixture.balance(ATTACKER), U256::ZERO);
}

fn destroy_payload() -> Bytes {
    execute_payload(ExecutionRequest::new(
        Operation::DelegateCall,
        DESTRUCTOR,
        U256::ZERO,
        Bytes::new(),
    ))
}

/// `DELEGATECALL` is never implied, not even by `ALL_PERMISSIONS`.
#[test]
fn test_delegate_call_needs_explicit_permission() {
    let fixture = Lsp6Fixture::new();
    fixture.register(DESTRUCTOR, Destructor::new(ATTACKER));
    fixture.seed_permissions(CONTROLLER, Permissions::CALL | Permissions::SUPER_CALL);

    for caller in [OWNER, CONTROLLER] {
        assert_eq!(
            fixture.execute(caller, &destroy_payload()),
            Err(Denial::NotAuthorised { controller: caller, permission: Permissions::DELEGATE_CALL }
                .into())
        );
    }
    assert!(!fixture.chain.is_destroyed(ACCOUNT));
    assert_eq!(fixture.balance(ACCOUNT), INITIAL_BALANCE);
}

/// A controller holding `DELEGATECALL` can run self-destructing code in the account's context,
/// wiping it out and sweeping its balance.
#[test]
fn test_delegate_call_can_destroy_account() {
    let fixture = Lsp6Fixture::new();
    fixture.register(DESTRUCTOR, Destructor::new(ATTACKER));
    fixture.seed_permissions(CONTROLLER, Permissions::DELEGATE_CALL);

    fixture.execute(CONTROLLER, &destroy_payload()).unwrap();
    assert!(fixture.chain.is_destroyed(ACCOUNT));
    assert_eq!(fixture.balance(ATTACKER), INITIAL_BALANCE);
    assert_eq!(fixture.balance(ACCOUNT), U256::ZERO);

    assert_eq!(
        fixture.execute(OWNER, &transfer_payload(OWNER, U256::from(1))),
        Err(KeyManagerError::Account(AccountError::Destroyed))
    );
}

/// Calling the self-destructing code directly only destroys the code itself.
#[test]
fn test_plain_call_to_destructor_is_harmless_for_account() {
    let fixture = Lsp6Fixture::new();
    fixture.register(DESTRUCTOR, Destructor::new(ATTACKER));

    let payload = execute_payload(ExecutionRequest::call(DESTRUCTOR, U256::ZERO, Bytes::new()));
    fixture.execute(OWNER, &payload).unwrap();
    assert!(fixture.chain.is_destroyed(DESTRUCTOR));
    assert!(!fixture.chain.is_destroyed(ACCOUNT));
}

/// A controller holding only `CHANGEPERMISSIONS` can rewrite its own bitmask and then act
/// with full authority.
#[test]
fn test_change_permissions_self_escalation() {
    let fixture = Lsp6Fixture::new();
    fixture.seed_permissions(CONTROLLER, Permissions::CHANGE_PERMISSIONS);

    assert_eq!(
        fixture.execute(CONTROLLER, &transfer_payload(ATTACKER, AMOUNT)),
        Err(Denial::NotAuthorised { controller: CONTROLLER, permission: Permissions::CALL }.into())
    );

    fixture.set_permissions(CONTROLLER, CONTROLLER, Permissions::ALL).unwrap();
    assert_eq!(fixture.permissions_of(CONTROLLER), Permissions::ALL);

    fixture.execute(CONTROLLER, &transfer_payload(ATTACKER, AMOUNT)).unwrap();
    assert_eq!(fixture.balance(ATTACKER), AMOUNT);
}

/// A controller holding only `ADDPERMISSIONS` can mint a fully privileged controller.
#[test]
fn test_add_permissions_mints_new_controller() {
    let fixture = Lsp6Fixture::new();
    let accomplice = address!("acc0000000000000000000000000000000000001");
    fixture.seed_permissions(CONTROLLER, Permissions::ADD_PERMISSIONS);

    fixture.set_permissions(CONTROLLER, accomplice, Permissions::ALL).unwrap();
    assert_eq!(fixture.permissions_of(accomplice), Permissions::ALL);
    assert!(fixture.permission_store().unwrap().controllers().contains(&accomplice));

    fixture.execute(accomplice, &transfer_payload(ATTACKER, AMOUNT)).unwrap();
    assert_eq!(fixture.balance(ATTACKER), AMOUNT);

    // Editing an existing controller, itself included, still needs CHANGEPERMISSIONS.
    assert_eq!(
        fixture.set_permissions(CONTROLLER, CONTROLLER, Permissions::ALL),
        Err(Denial::NotAuthorised {
            controller: CONTROLLER,
            permission: Permissions::CHANGE_PERMISSIONS
        }
        .into())
    );
}
