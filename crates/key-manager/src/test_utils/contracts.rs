use std::cell::{Cell, RefCell};

use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use alloy_sol_types::{sol, SolCall};

use super::{CallContext, TestChain, TestContract, ERC165_INTERFACE_ID};
use crate::{abi::ILSP6KeyManager, AccountError};

sol! {
    /// A plain contract controllers interact with through the account.
    #[derive(Debug, PartialEq, Eq)]
    interface ITargetContract {
        function setName(string name) external;
        function getName() external view returns (string);
        function setNumber(uint256 number) external;
        function getNumber() external view returns (uint256);
    }
}

/// A contract storing a name and a number. Accepts plain value transfers.
#[derive(Debug, Default)]
pub struct TargetContract {
    name: RefCell<String>,
    number: Cell<U256>,
    interfaces: Vec<FixedBytes<4>>,
}

impl TargetContract {
    /// Creates a contract with empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the contract report `interface_id` as supported.
    pub fn with_interface(mut self, interface_id: FixedBytes<4>) -> Self {
        self.interfaces.push(interface_id);
        self
    }

    /// The stored name.
    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    /// The stored number.
    pub fn number(&self) -> U256 {
        self.number.get()
    }
}

fn revert<E>(_: E) -> AccountError {
    AccountError::Reverted(Bytes::new())
}

impl TestContract for TargetContract {
    fn call(&self, _chain: &TestChain, ctx: CallContext) -> Result<Bytes, AccountError> {
        let Some(selector) = ctx.data.get(..4).and_then(|selector| <[u8; 4]>::try_from(selector).ok())
        else {
            return Ok(Bytes::new());
        };
        let output = match selector {
            ITargetContract::setNameCall::SELECTOR => {
                let call = ITargetContract::setNameCall::abi_decode(&ctx.data, true).map_err(revert)?;
                *self.name.borrow_mut() = call.name;
                Vec::new()
            }
            ITargetContract::getNameCall::SELECTOR => {
                ITargetContract::getNameCall::abi_encode_returns(&(self.name(),))
            }
            ITargetContract::setNumberCall::SELECTOR => {
                let call =
                    ITargetContract::setNumberCall::abi_decode(&ctx.data, true).map_err(revert)?;
                self.number.set(call.number);
                Vec::new()
            }
            ITargetContract::getNumberCall::SELECTOR => {
                ITargetContract::getNumberCall::abi_encode_returns(&(self.number(),))
            }
            _ => return Err(AccountError::Reverted(Bytes::new())),
        };
        Ok(output.into())
    }

    fn supports_interface(&self, interface_id: FixedBytes<4>) -> bool {
        interface_id == ERC165_INTERFACE_ID || self.interfaces.contains(&interface_id)
    }
}

/// A contract whose value-receive hook calls back into a key manager with a prepared payload.
///
/// The hook fires once. By default a failed re-entry reverts the receive as well; a swallowing
/// attacker ignores the failure and keeps the value.
#[derive(Debug)]
pub struct ReentrantAttacker {
    key_manager: Address,
    payload: Bytes,
    swallow_failure: bool,
    armed: Cell<bool>,
    reentry_result: RefCell<Option<Result<Bytes, AccountError>>>,
}

impl ReentrantAttacker {
    /// Creates an attacker sending `payload` to `execute(bytes)` of `key_manager`.
    pub fn new(key_manager: Address, payload: impl Into<Bytes>) -> Self {
        Self {
            key_manager,
            payload: payload.into(),
            swallow_failure: false,
            armed: Cell::new(true),
            reentry_result: RefCell::new(None),
        }
    }

    /// Keeps the received value even when the re-entry fails.
    pub fn swallowing_failure(mut self) -> Self {
        self.swallow_failure = true;
        self
    }

    /// The outcome of the re-entry, once it happened.
    pub fn reentry_result(&self) -> Option<Result<Bytes, AccountError>> {
        self.reentry_result.borrow().clone()
    }
}

impl TestContract for ReentrantAttacker {
    fn call(&self, chain: &TestChain, ctx: CallContext) -> Result<Bytes, AccountError> {
        if !self.armed.replace(false) {
            return Ok(Bytes::new());
        }
        let calldata = ILSP6KeyManager::executeCall { payload: self.payload.clone() }.abi_encode();
        let result = chain.call(ctx.address, self.key_manager, U256::ZERO, calldata.into());
        *self.reentry_result.borrow_mut() = Some(result.clone());
        match result {
            Err(error) if !self.swallow_failure => Err(error),
            _ => Ok(Bytes::new()),
        }
    }
}

/// Code that destroys whichever contract runs it, sending the balance to `beneficiary`.
///
/// Called directly it destroys itself. Delegate-called it destroys the caller.
#[derive(Debug)]
pub struct Destructor {
    beneficiary: Address,
}

impl Destructor {
    /// Creates the code.
    pub const fn new(beneficiary: Address) -> Self {
        Self { beneficiary }
    }
}

impl TestContract for Destructor {
    fn call(&self, chain: &TestChain, ctx: CallContext) -> Result<Bytes, AccountError> {
        chain.self_destruct(ctx.address, self.beneficiary);
        Ok(Bytes::new())
    }
}
