//! Constants for the LSP6 key manager.
//!
//! They are grouped by the standard that defines them.

/// Constants of the LSP2 / LSP6 data key schema.
pub mod lsp6 {
    /// Name of the first word of every reserved permission data key.
    pub const ADDRESS_PERMISSIONS: &str = "AddressPermissions";
    /// Second word of the `AddressPermissions:Permissions:<address>` data key.
    pub const PERMISSIONS: &str = "Permissions";
    /// Second word of the `AddressPermissions:AllowedCalls:<address>` data key.
    pub const ALLOWED_CALLS: &str = "AllowedCalls";
    /// Second word of the `AddressPermissions:AllowedERC725YDataKeys:<address>` data key.
    pub const ALLOWED_ERC725Y_DATA_KEYS: &str = "AllowedERC725YDataKeys";
    /// Name of the LSP2 array listing every controller.
    pub const ADDRESS_PERMISSIONS_ARRAY: &str = "AddressPermissions[]";

    /// Length in bytes of a `MappingWithGrouping` key prefix (`bytes6 ++ bytes4 ++ 0x0000`).
    pub const MAPPING_PREFIX_LENGTH: usize = 12;
    /// Length in bytes of the prefix shared by the array index keys.
    pub const ARRAY_PREFIX_LENGTH: usize = 16;

    /// Length in bytes of a single encoded allowed call entry.
    pub const ALLOWED_CALL_ENTRY_LENGTH: usize = 32;
    /// Maximum length in bytes of an allowed data key prefix.
    pub const MAX_DATA_KEY_PREFIX_LENGTH: usize = 32;
    /// Number of `AddressPermissions[]` slots read when the array is searched. The stored length
    /// can be written by any controller holding `ADDPERMISSIONS`.
    pub const MAX_CONTROLLER_SCAN: u128 = 1024;
}

/// Constants of the LSP25 relay execution standard.
pub mod lsp25 {
    /// Version number bound into every relay call digest.
    pub const VERSION: u64 = 25;
    /// Prefix of an EIP-191 version 0 ("data with intended validator") message.
    pub const EIP191_PREFIX: [u8; 2] = [0x19, 0x00];
    /// Length of a serialized `r ++ s ++ v` signature.
    pub const SIGNATURE_LENGTH: usize = 65;
}

/// Constants of the ERC1271 signature validation standard.
pub mod erc1271 {
    use alloy_primitives::{fixed_bytes, FixedBytes};

    /// Returned by `isValidSignature` when the signer holds the `SIGN` permission.
    pub const MAGIC_VALUE: FixedBytes<4> = fixed_bytes!("1626ba7e");
    /// Returned by `isValidSignature` when the signature is rejected.
    pub const FAIL_VALUE: FixedBytes<4> = fixed_bytes!("ffffffff");
}

/// Wildcards accepted in allowed call entries.
pub mod wildcard {
    use alloy_primitives::{address, fixed_bytes, Address, FixedBytes};

    /// Matches any target address.
    pub const ANY_ADDRESS: Address = address!("ffffffffffffffffffffffffffffffffffffffff");
    /// Matches any standard interface.
    pub const ANY_INTERFACE_ID: FixedBytes<4> = fixed_bytes!("ffffffff");
    /// Matches any function selector.
    pub const ANY_SELECTOR: FixedBytes<4> = fixed_bytes!("ffffffff");
}
