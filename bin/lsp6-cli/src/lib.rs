//! Command-line helpers for LSP6 key managers.
//!
//! Converts permission names to and from the stored bitmask, derives a controller's reserved
//! data keys, packs relay nonces and signs relay calls off-chain.

pub mod common;
pub mod keys;
pub mod nonce;
pub mod permissions;
pub mod relay;

mod cmd;
pub use cmd::*;
