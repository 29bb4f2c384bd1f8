use std::{
    cell::{Cell, RefCell},
    fmt::Debug,
    rc::{Rc, Weak},
};

use alloy_primitives::{
    fixed_bytes, keccak256,
    map::{HashMap, HashSet},
    Address, Bytes, FixedBytes, U256,
};

use crate::{AccountError, Clock, Erc725Account, KeyManager};

/// The ERC165 interface id of `supportsInterface(bytes4)`.
pub const ERC165_INTERFACE_ID: FixedBytes<4> = fixed_bytes!("01ffc9a7");

/// The environment a [`TestContract`] runs in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// The immediate caller.
    pub caller: Address,
    /// The address whose identity and balance the code runs with. For a delegate call this is
    /// the delegating contract, not the code address.
    pub address: Address,
    /// Value sent with the call.
    pub value: U256,
    /// Call data.
    pub data: Bytes,
}

/// Contract code living on a [`TestChain`].
pub trait TestContract: Debug {
    /// Runs the contract.
    fn call(&self, chain: &TestChain, ctx: CallContext) -> Result<Bytes, AccountError>;

    /// ERC165 probe.
    fn supports_interface(&self, interface_id: FixedBytes<4>) -> bool {
        interface_id == ERC165_INTERFACE_ID
    }
}

impl<T: TestContract> TestContract for Rc<T> {
    fn call(&self, chain: &TestChain, ctx: CallContext) -> Result<Bytes, AccountError> {
        (**self).call(chain, ctx)
    }

    fn supports_interface(&self, interface_id: FixedBytes<4>) -> bool {
        (**self).supports_interface(interface_id)
    }
}

/// A contract that may be dropped while it is still registered. Calls to a dropped contract
/// behave like calls to an empty account.
impl<T: TestContract> TestContract for Weak<T> {
    fn call(&self, chain: &TestChain, ctx: CallContext) -> Result<Bytes, AccountError> {
        self.upgrade().map_or(Ok(Bytes::new()), |contract| contract.call(chain, ctx))
    }

    fn supports_interface(&self, interface_id: FixedBytes<4>) -> bool {
        self.upgrade().is_some_and(|contract| contract.supports_interface(interface_id))
    }
}

/// A key manager answers calls through its ABI dispatch and reverts with its custom errors.
impl<A: Erc725Account + Debug, C: Clock + Debug> TestContract for KeyManager<A, C> {
    fn call(&self, _chain: &TestChain, ctx: CallContext) -> Result<Bytes, AccountError> {
        self.dispatch(ctx.caller, &ctx.data)
            .map_err(|error| AccountError::Reverted(error.abi_encode_revert()))
    }
}

/// A minimal chain: balances, contract code and self-destruction.
///
/// A call that fails leaves balances and destroyed contracts as they were before it started.
#[derive(Debug, Default)]
pub struct TestChain {
    balances: RefCell<HashMap<Address, U256>>,
    contracts: RefCell<HashMap<Address, Rc<dyn TestContract>>>,
    destroyed: RefCell<HashSet<Address>>,
    deployments: Cell<u64>,
}

impl TestChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `contract` at `address`.
    pub fn register(&self, address: Address, contract: impl TestContract + 'static) {
        self.contracts.borrow_mut().insert(address, Rc::new(contract));
    }

    /// The balance of `address`.
    pub fn balance(&self, address: Address) -> U256 {
        self.balances.borrow().get(&address).copied().unwrap_or_default()
    }

    /// Overrides the balance of `address`.
    pub fn set_balance(&self, address: Address, balance: U256) {
        self.balances.borrow_mut().insert(address, balance);
    }

    /// Returns `true` once the contract at `address` destroyed itself.
    pub fn is_destroyed(&self, address: Address) -> bool {
        self.destroyed.borrow().contains(&address)
    }

    /// Number of contracts deployed so far.
    pub fn deployments(&self) -> u64 {
        self.deployments.get()
    }

    fn contract(&self, address: Address) -> Option<Rc<dyn TestContract>> {
        if self.is_destroyed(address) {
            return None;
        }
        self.contracts.borrow().get(&address).cloned()
    }

    fn transfer(&self, from: Address, to: Address, value: U256) -> Result<(), AccountError> {
        if value.is_zero() {
            return Ok(());
        }
        let available = self.balance(from);
        if available < value {
            return Err(AccountError::InsufficientBalance { available, required: value });
        }
        self.set_balance(from, available - value);
        self.set_balance(to, self.balance(to) + value);
        Ok(())
    }

    fn atomically<T>(&self, f: impl FnOnce() -> Result<T, AccountError>) -> Result<T, AccountError> {
        let balances = self.balances.borrow().clone();
        let destroyed = self.destroyed.borrow().clone();
        let result = f();
        if result.is_err() {
            *self.balances.borrow_mut() = balances;
            *self.destroyed.borrow_mut() = destroyed;
        }
        result
    }

    /// Sends `value` and `data` from `caller` to `target`, running the code at `target`.
    pub fn call(
        &self,
        caller: Address,
        target: Address,
        value: U256,
        data: Bytes,
    ) -> Result<Bytes, AccountError> {
        self.atomically(|| {
            self.transfer(caller, target, value)?;
            match self.contract(target) {
                Some(contract) => {
                    contract.call(self, CallContext { caller, address: target, value, data })
                }
                None => Ok(Bytes::new()),
            }
        })
    }

    /// Runs the code at `code` in the context of `context`.
    pub fn delegate_call(
        &self,
        context: Address,
        caller: Address,
        code: Address,
        data: Bytes,
    ) -> Result<Bytes, AccountError> {
        self.atomically(|| match self.contract(code) {
            Some(contract) => {
                contract.call(self, CallContext { caller, address: context, value: U256::ZERO, data })
            }
            None => Ok(Bytes::new()),
        })
    }

    /// Deploys an empty contract from `deployer`, funding it with `value`.
    pub fn deploy(&self, deployer: Address, value: U256) -> Result<Address, AccountError> {
        self.atomically(|| {
            let index = self.deployments.get();
            let mut preimage = deployer.to_vec();
            preimage.extend_from_slice(&index.to_be_bytes());
            let address = Address::from_slice(&keccak256(preimage)[12..]);
            self.transfer(deployer, address, value)?;
            self.deployments.set(index + 1);
            Ok(address)
        })
    }

    /// Destroys the contract at `address`, sending its whole balance to `beneficiary`.
    pub fn self_destruct(&self, address: Address, beneficiary: Address) {
        let balance = self.balance(address);
        self.set_balance(address, U256::ZERO);
        self.set_balance(beneficiary, self.balance(beneficiary) + balance);
        self.destroyed.borrow_mut().insert(address);
    }

    /// ERC165 probe of the code at `target`.
    pub fn supports_interface(&self, target: Address, interface_id: FixedBytes<4>) -> bool {
        self.contract(target).is_some_and(|contract| contract.supports_interface(interface_id))
    }
}
