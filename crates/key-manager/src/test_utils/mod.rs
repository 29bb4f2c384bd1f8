//! Test utilities for the LSP6 key manager.
//!
//! A toy chain with an in-memory ERC725 account, contracts to attack the key manager with, a
//! manual clock and deterministic signers.

mod account;
mod chain;
mod clock;
mod contracts;
mod fixture;
mod signer;

pub use account::*;
pub use chain::*;
pub use clock::*;
pub use contracts::*;
pub use fixture::*;
pub use signer::*;
