use alloy_primitives::{Address, Bytes, FixedBytes};
use serde::{Deserialize, Serialize};

use crate::Permissions;

/// Events emitted by the key manager.
///
/// Events of a failed instruction are discarded together with its other effects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyManagerEvent {
    /// A payload was forwarded to the account.
    Executed {
        /// The controller the payload was authorized for.
        caller: Address,
        /// The selector of the forwarded account function.
        selector: FixedBytes<4>,
        /// Whether the account call succeeded.
        success: bool,
        /// The data returned by the account.
        return_data: Bytes,
    },
    /// The permission bitmask of a controller was written.
    PermissionsSet {
        /// The controller.
        controller: Address,
        /// The new bitmask. Empty when revoked.
        permissions: Permissions,
    },
}
