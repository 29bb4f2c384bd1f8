//! `nonce`: packing and splitting relay call nonces.

use alloy_primitives::U256;
use clap::{Parser, Subcommand};
use lsp6_key_manager::RelayNonce;

use crate::common::Result;

/// Pack or split relay call nonces
#[derive(Parser, Debug)]
pub struct Cmd {
    /// The nonce operation
    #[command(subcommand)]
    pub action: Action,
}

/// `nonce` subcommands.
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Pack a channel and a sequence number into a relay nonce
    Pack {
        /// The nonce channel
        #[arg(long, default_value_t = 0)]
        channel: u128,
        /// The position in the channel
        #[arg(long, default_value_t = 0)]
        sequence: u128,
    },
    /// Split a relay nonce into its channel and sequence number
    Unpack {
        /// The nonce, decimal or `0x`-prefixed hex
        nonce: U256,
    },
}

impl Cmd {
    /// Runs the action and returns what to print.
    pub fn output(&self) -> Result<String> {
        Ok(match self.action {
            Action::Pack { channel, sequence } => {
                let nonce = RelayNonce::new(channel, sequence).packed();
                format!("{nonce} (0x{nonce:x})")
            }
            Action::Unpack { nonce } => {
                let RelayNonce { channel, sequence } = RelayNonce::unpack(nonce);
                format!("channel {channel}\nsequence {sequence}")
            }
        })
    }
}
