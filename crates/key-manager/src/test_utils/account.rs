use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use alloy_primitives::{map::HashMap, Address, Bytes, FixedBytes, B256, U256};

use super::TestChain;
use crate::{AccountError, Erc725Account, Operation};

/// An ERC725 account living on a [`TestChain`].
///
/// Only the owner may mutate it. Once the account has been destroyed (through a delegate call
/// into self-destructing code) every mutation fails with [`AccountError::Destroyed`].
#[derive(Debug)]
pub struct MemoryAccount {
    address: Address,
    owner: Cell<Address>,
    data: RefCell<HashMap<B256, Bytes>>,
    chain: Rc<TestChain>,
}

impl MemoryAccount {
    /// Creates an account at `address` owned by `owner`.
    pub fn new(address: Address, owner: Address, chain: Rc<TestChain>) -> Self {
        Self { address, owner: Cell::new(owner), data: RefCell::default(), chain }
    }

    /// The chain the account lives on.
    pub fn chain(&self) -> &TestChain {
        &self.chain
    }

    /// The balance of the account.
    pub fn balance(&self) -> U256 {
        self.chain.balance(self.address)
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), AccountError> {
        if self.chain.is_destroyed(self.address) {
            return Err(AccountError::Destroyed);
        }
        if caller != self.owner.get() {
            return Err(AccountError::NotOwner(caller));
        }
        Ok(())
    }
}

impl Erc725Account for MemoryAccount {
    fn address(&self) -> Address {
        self.address
    }

    fn owner(&self) -> Address {
        self.owner.get()
    }

    fn get_data(&self, key: B256) -> Bytes {
        self.data.borrow().get(&key).cloned().unwrap_or_default()
    }

    fn set_data(&self, caller: Address, key: B256, value: Bytes) -> Result<(), AccountError> {
        self.ensure_owner(caller)?;
        let mut data = self.data.borrow_mut();
        if value.is_empty() {
            data.remove(&key);
        } else {
            data.insert(key, value);
        }
        Ok(())
    }

    fn execute(
        &self,
        caller: Address,
        operation: Operation,
        target: Address,
        value: U256,
        data: Bytes,
    ) -> Result<Bytes, AccountError> {
        self.ensure_owner(caller)?;
        match operation {
            Operation::Call => self.chain.call(self.address, target, value, data),
            Operation::StaticCall | Operation::DelegateCall if !value.is_zero() => {
                Err(AccountError::ValueNotAllowed(operation))
            }
            Operation::StaticCall => self.chain.call(self.address, target, U256::ZERO, data),
            Operation::DelegateCall => self.chain.delegate_call(self.address, caller, target, data),
            Operation::Create | Operation::Create2 => {
                let deployed = self.chain.deploy(self.address, value)?;
                Ok(Bytes::copy_from_slice(deployed.as_slice()))
            }
        }
    }

    fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<(), AccountError> {
        self.ensure_owner(caller)?;
        self.owner.set(new_owner);
        Ok(())
    }

    fn renounce_ownership(&self, caller: Address) -> Result<(), AccountError> {
        self.ensure_owner(caller)?;
        self.owner.set(Address::ZERO);
        Ok(())
    }

    fn supports_interface(&self, target: Address, interface_id: FixedBytes<4>) -> bool {
        self.chain.supports_interface(target, interface_id)
    }
}
