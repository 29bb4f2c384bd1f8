//! `keys`: the reserved data keys of a controller.

use alloy_primitives::{Address, B256};
use clap::Parser;
use lsp6_key_manager::data_keys::{
    allowed_calls_key, allowed_data_keys_key, controller_index_key, controllers_length_key,
    permissions_key,
};
use serde::Serialize;

use crate::common::Result;

/// Print the data keys holding a controller's permissions
#[derive(Parser, Debug)]
pub struct Cmd {
    /// The controller address
    pub controller: Address,

    /// Also print the `AddressPermissions[]` keys for this array index
    #[arg(long)]
    pub index: Option<u128>,

    /// Print JSON instead of `name key` lines
    #[arg(long)]
    pub json: bool,
}

/// The reserved data keys of a controller.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ControllerKeys {
    /// `AddressPermissions:Permissions:<controller>`
    pub permissions: B256,
    /// `AddressPermissions:AllowedCalls:<controller>`
    pub allowed_calls: B256,
    /// `AddressPermissions:AllowedERC725YDataKeys:<controller>`
    pub allowed_erc725y_data_keys: B256,
    /// `AddressPermissions[]`, if an index was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_length: Option<B256>,
    /// `AddressPermissions[index]`, if an index was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_index: Option<B256>,
}

impl ControllerKeys {
    /// Derives the keys of `controller`.
    pub fn new(controller: Address, index: Option<u128>) -> Self {
        Self {
            permissions: permissions_key(controller),
            allowed_calls: allowed_calls_key(controller),
            allowed_erc725y_data_keys: allowed_data_keys_key(controller),
            array_length: index.map(|_| controllers_length_key()),
            array_index: index.map(controller_index_key),
        }
    }
}

impl Cmd {
    /// Derives the keys and returns what to print.
    pub fn output(&self) -> Result<String> {
        let keys = ControllerKeys::new(self.controller, self.index);
        if self.json {
            return Ok(serde_json::to_string_pretty(&keys)?);
        }
        let mut lines = vec![
            format!("Permissions {}", keys.permissions),
            format!("AllowedCalls {}", keys.allowed_calls),
            format!("AllowedERC725YDataKeys {}", keys.allowed_erc725y_data_keys),
        ];
        if let (Some(length), Some(index_key), Some(index)) =
            (keys.array_length, keys.array_index, self.index)
        {
            lines.push(format!("AddressPermissions[] {length}"));
            lines.push(format!("AddressPermissions[{index}] {index_key}"));
        }
        Ok(lines.join("\n"))
    }
}
