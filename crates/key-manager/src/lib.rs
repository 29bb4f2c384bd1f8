//! A permission-gated execution gateway (LSP6 key manager) for ERC725 accounts.
//!
//! The key manager owns an account and forwards to it only what the calling controller is
//! permitted to do. Permissions are stored in the account's own data store under reserved
//! LSP6 data keys.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod abi;
pub mod constants;
pub mod data_keys;
pub mod relay;

mod account;
pub use account::*;

mod allowed;
pub use allowed::*;

mod authorizer;
pub use authorizer::*;

mod clock;
pub use clock::*;

mod compact;
pub use compact::*;

mod config;
pub use config::*;

mod error;
pub use error::*;

mod event;
pub use event::*;

mod guard;
pub use guard::*;

mod key_manager;
pub use key_manager::*;

mod nonce;
pub use nonce::*;

mod permissions;
pub use permissions::*;

mod request;
pub use request::*;

mod store;
pub use store::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
