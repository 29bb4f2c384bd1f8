//! The interface of the ERC725 account the key manager owns.
//!
//! The account is an external collaborator: it stores data, holds value and executes low-level
//! operations for its owner. The key manager only ever talks to it through [`Erc725Account`].

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use auto_impl::auto_impl;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::DataEntry;

/// A low-level operation the account can execute.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// `CALL`
    #[display("CALL")]
    Call,
    /// `CREATE`
    #[display("CREATE")]
    Create,
    /// `CREATE2`
    #[display("CREATE2")]
    Create2,
    /// `STATICCALL`
    #[display("STATICCALL")]
    StaticCall,
    /// `DELEGATECALL`
    #[display("DELEGATECALL")]
    DelegateCall,
}

impl Operation {
    /// The ERC725X operation type code.
    pub const fn code(self) -> u8 {
        match self {
            Self::Call => 0,
            Self::Create => 1,
            Self::Create2 => 2,
            Self::StaticCall => 3,
            Self::DelegateCall => 4,
        }
    }

    /// Parses an ERC725X operation type code.
    pub fn from_code(code: U256) -> Option<Self> {
        match u8::try_from(code).ok()? {
            0 => Some(Self::Call),
            1 => Some(Self::Create),
            2 => Some(Self::Create2),
            3 => Some(Self::StaticCall),
            4 => Some(Self::DelegateCall),
            _ => None,
        }
    }

    /// Returns `true` for `CREATE` and `CREATE2`.
    pub const fn is_deployment(self) -> bool {
        matches!(self, Self::Create | Self::Create2)
    }
}

/// Failures reported by the account.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    /// The caller is not the owner of the account.
    #[error("caller {0} is not the account owner")]
    NotOwner(Address),
    /// The account or an intermediate contract does not hold enough value.
    #[error("insufficient balance: {available} available, {required} required")]
    InsufficientBalance {
        /// The balance held.
        available: U256,
        /// The value requested.
        required: U256,
    },
    /// The operation does not accept value.
    #[error("{0} cannot transfer value")]
    ValueNotAllowed(Operation),
    /// The account no longer exists.
    #[error("account has been destroyed")]
    Destroyed,
    /// The executed call reverted with the given data.
    #[error("call reverted with 0x{}", alloy_primitives::hex::encode(.0))]
    Reverted(Bytes),
    /// Any other failure.
    #[error("{0}")]
    Custom(String),
}

/// An ERC725 account (ERC725X execution and ERC725Y data store).
///
/// Every mutating method takes the address of the caller. The account is expected to reject
/// callers other than its owner.
#[auto_impl(&, Rc, Arc, Box)]
pub trait Erc725Account {
    /// The address of the account.
    fn address(&self) -> Address;

    /// The current owner.
    fn owner(&self) -> Address;

    /// Reads a data key. Unset keys read as empty bytes.
    fn get_data(&self, key: B256) -> Bytes;

    /// Writes a data key. Writing empty bytes clears the key.
    fn set_data(&self, caller: Address, key: B256, value: Bytes) -> Result<(), AccountError>;

    /// Writes several data keys.
    fn set_data_batch(&self, caller: Address, entries: &[DataEntry]) -> Result<(), AccountError> {
        for entry in entries {
            self.set_data(caller, entry.key, entry.value.clone())?;
        }
        Ok(())
    }

    /// Executes a low-level operation and returns its output.
    ///
    /// For deployments the output is the 20-byte address of the new contract.
    fn execute(
        &self,
        caller: Address,
        operation: Operation,
        target: Address,
        value: U256,
        data: Bytes,
    ) -> Result<Bytes, AccountError>;

    /// Transfers ownership to `new_owner`.
    fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<(), AccountError>;

    /// Leaves the account without an owner.
    fn renounce_ownership(&self, caller: Address) -> Result<(), AccountError>;

    /// Probes `target` for an ERC165 interface.
    fn supports_interface(&self, target: Address, interface_id: FixedBytes<4>) -> bool;
}
