//! The permission bitmask held by every controller.

use alloy_primitives::{B256, U256};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Capabilities of a controller over the account.
    ///
    /// A controller holds exactly one bitmask. Bits combine with `|` when granting and a
    /// capability check is `permissions.contains(required)`. The empty bitmask grants nothing,
    /// not even reading through the gateway.
    ///
    /// The `SUPER_*` bits bypass the restriction lists of their category.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Permissions: u64 {
        /// Transfer or renounce ownership of the account.
        const CHANGE_OWNER = 1 << 0;
        /// Grant permissions to a controller that holds none yet.
        const ADD_PERMISSIONS = 1 << 1;
        /// Edit the permissions of an existing controller.
        const CHANGE_PERMISSIONS = 1 << 2;
        /// Dispatch again while another dispatch of the same gateway is in flight.
        const REENTRANCY = 1 << 7;
        /// Transfer value to any target.
        const SUPER_TRANSFER_VALUE = 1 << 8;
        /// Transfer value to the targets in the allowed calls.
        const TRANSFER_VALUE = 1 << 9;
        /// Call any target.
        const SUPER_CALL = 1 << 10;
        /// Call the targets in the allowed calls.
        const CALL = 1 << 11;
        /// Static call any target.
        const SUPER_STATIC_CALL = 1 << 12;
        /// Static call the targets in the allowed calls.
        const STATIC_CALL = 1 << 13;
        /// Delegate call any target.
        const SUPER_DELEGATE_CALL = 1 << 14;
        /// Delegate call the targets in the allowed calls.
        const DELEGATE_CALL = 1 << 15;
        /// Deploy contracts with `CREATE` / `CREATE2`.
        const DEPLOY = 1 << 16;
        /// Write any non-reserved data key.
        const SUPER_SET_DATA = 1 << 17;
        /// Write the data keys in the allowed data keys.
        const SET_DATA = 1 << 18;
        /// Sign messages on behalf of the account (ERC1271).
        const SIGN = 1 << 21;
        /// Submit relay calls signed off-chain.
        const EXECUTE_RELAY_CALL = 1 << 22;
    }
}

impl Permissions {
    /// Every permission except the ones that must always be granted explicitly
    /// (`DELEGATE_CALL`, `SUPER_DELEGATE_CALL` and `REENTRANCY`).
    pub const ALL: Self = Self::all()
        .difference(Self::DELEGATE_CALL)
        .difference(Self::SUPER_DELEGATE_CALL)
        .difference(Self::REENTRANCY);

    /// Decodes a permission value read from the account's data store.
    ///
    /// Anything that is not a 32-byte word decodes to the empty bitmask. Unknown high bits are
    /// ignored.
    pub fn from_word(value: &[u8]) -> Self {
        if value.len() != 32 {
            return Self::empty();
        }
        let word = U256::from_be_slice(value);
        Self::from_bits_truncate(word.as_limbs()[0])
    }

    /// Encodes the bitmask as the 32-byte big-endian word stored in the account.
    pub fn to_word(self) -> B256 {
        B256::from(U256::from(self.bits()).to_be_bytes::<32>())
    }

    /// Returns the canonical LSP6 name of a single permission bit, e.g. `"TRANSFERVALUE"`.
    ///
    /// Returns `None` for combinations of bits.
    pub fn name(self) -> Option<&'static str> {
        NAMES.iter().find(|(flag, _)| *flag == self).map(|(_, name)| *name)
    }

    /// Parses a canonical LSP6 permission name (case-insensitive). The bitflags constant names
    /// (e.g. `TRANSFER_VALUE`) and `ALL_PERMISSIONS` are accepted as well.
    pub fn parse_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("ALL_PERMISSIONS") {
            return Some(Self::ALL);
        }
        NAMES
            .iter()
            .find(|(_, canonical)| canonical.eq_ignore_ascii_case(name))
            .map(|(flag, _)| *flag)
            .or_else(|| Self::from_name_constant(name))
    }

    fn from_name_constant(name: &str) -> Option<Self> {
        Self::all()
            .iter_names()
            .find(|(constant, _)| constant.eq_ignore_ascii_case(name))
            .map(|(_, flag)| flag)
    }

    /// Canonical names of every bit set in `self`, lowest bit first.
    pub fn names(self) -> Vec<&'static str> {
        self.iter().filter_map(Self::name).collect()
    }
}

const NAMES: [(Permissions, &str); 17] = [
    (Permissions::CHANGE_OWNER, "CHANGEOWNER"),
    (Permissions::ADD_PERMISSIONS, "ADDPERMISSIONS"),
    (Permissions::CHANGE_PERMISSIONS, "CHANGEPERMISSIONS"),
    (Permissions::REENTRANCY, "REENTRANCY"),
    (Permissions::SUPER_TRANSFER_VALUE, "SUPER_TRANSFERVALUE"),
    (Permissions::TRANSFER_VALUE, "TRANSFERVALUE"),
    (Permissions::SUPER_CALL, "SUPER_CALL"),
    (Permissions::CALL, "CALL"),
    (Permissions::SUPER_STATIC_CALL, "SUPER_STATICCALL"),
    (Permissions::STATIC_CALL, "STATICCALL"),
    (Permissions::SUPER_DELEGATE_CALL, "SUPER_DELEGATECALL"),
    (Permissions::DELEGATE_CALL, "DELEGATECALL"),
    (Permissions::DEPLOY, "DEPLOY"),
    (Permissions::SUPER_SET_DATA, "SUPER_SETDATA"),
    (Permissions::SET_DATA, "SETDATA"),
    (Permissions::SIGN, "SIGN"),
    (Permissions::EXECUTE_RELAY_CALL, "EXECUTE_RELAY_CALL"),
];
