//! `permissions`: conversions between permission names and the stored 32-byte word.

use alloy_primitives::B256;
use clap::{Parser, Subcommand};
use lsp6_key_manager::Permissions;
use serde::Serialize;
use tracing::debug;

use crate::common::{decode_hex, CliError, Result};

/// Encode or decode permission bitmasks
#[derive(Parser, Debug)]
pub struct Cmd {
    /// The conversion to run
    #[command(subcommand)]
    pub action: Action,
}

/// Permission conversions.
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Decode a 32-byte permission word into permission names
    Decode {
        /// The hex-encoded word, as stored under `AddressPermissions:Permissions:<controller>`
        word: String,
        /// Print JSON instead of one name per line
        #[arg(long)]
        json: bool,
    },
    /// Encode permission names into a 32-byte word
    Encode {
        /// LSP6 permission names, e.g. `CALL TRANSFERVALUE` or `ALL_PERMISSIONS`
        #[arg(required = true)]
        names: Vec<String>,
    },
}

/// A decoded permission word.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DecodedPermissions {
    /// The word with unknown bits dropped.
    pub word: B256,
    /// Canonical names of the set bits, lowest bit first.
    pub permissions: Vec<&'static str>,
}

impl Cmd {
    /// Runs the conversion and returns what to print.
    pub fn output(&self) -> Result<String> {
        match &self.action {
            Action::Decode { word, json } => {
                let decoded = decode(word)?;
                if *json {
                    Ok(serde_json::to_string_pretty(&decoded)?)
                } else {
                    Ok(decoded.permissions.join("\n"))
                }
            }
            Action::Encode { names } => Ok(encode(names)?.to_word().to_string()),
        }
    }
}

/// Decodes a hex permission word.
pub fn decode(word: &str) -> Result<DecodedPermissions> {
    let bytes = decode_hex(word)?;
    if bytes.len() != 32 {
        return Err(CliError::InvalidPermissionWord(bytes.len()));
    }
    let permissions = Permissions::from_word(&bytes);
    debug!(?permissions, "Permission word decoded");
    Ok(DecodedPermissions { word: permissions.to_word(), permissions: permissions.names() })
}

/// Combines permission names into a bitmask.
pub fn encode<S: AsRef<str>>(names: &[S]) -> Result<Permissions> {
    names.iter().try_fold(Permissions::empty(), |acc, name| {
        let name = name.as_ref();
        Permissions::parse_name(name)
            .map(|permission| acc | permission)
            .ok_or_else(|| CliError::UnknownPermission(name.to_owned()))
    })
}
