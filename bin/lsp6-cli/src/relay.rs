//! `relay`: signing relay calls off-chain.

use std::path::PathBuf;

use alloy_primitives::{Address, Bytes, B256, U256};
use clap::{Parser, Subcommand};
use k256::ecdsa::SigningKey;
use lsp6_key_manager::{
    relay::{public_key_to_address, relay_call_digest, sign_digest, ValidityWindow},
    KeyManagerConfig,
};
use serde::Serialize;
use tracing::info;

use crate::common::{load_hex, CliError, Result};

/// Sign relay calls
#[derive(Parser, Debug)]
pub struct Cmd {
    /// The relay operation
    #[command(subcommand)]
    pub action: Action,
}

/// `relay` subcommands.
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Compute the relay call digest and sign it
    Sign(SignArgs),
}

/// Arguments of `relay sign`.
#[derive(Parser, Debug)]
pub struct SignArgs {
    /// The key manager that will execute the call
    #[arg(long)]
    pub key_manager: Address,

    /// Chain id bound into the signature. Defaults to the configured chain id.
    #[arg(long)]
    pub chain_id: Option<u64>,

    /// The packed relay nonce, see `nonce pack`
    #[arg(long, default_value = "0")]
    pub nonce: U256,

    /// First valid timestamp, 0 for no start
    #[arg(long, default_value_t = 0)]
    pub from: u128,

    /// Last valid timestamp, 0 for no end
    #[arg(long, default_value_t = 0)]
    pub to: u128,

    /// Hex-encoded payload, an ABI-encoded account call
    #[arg(long)]
    pub payload: Option<String>,

    /// File holding the hex-encoded payload, `-` for stdin
    #[arg(long = "payload.file", visible_aliases = ["payload-file"])]
    pub payload_file: Option<PathBuf>,

    /// The signer's secp256k1 private key
    #[arg(long, env = "LSP6_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: B256,

    /// Print JSON instead of `name value` lines
    #[arg(long)]
    pub json: bool,
}

/// A signed relay call.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignedRelayCall {
    /// The digest that was signed.
    pub digest: B256,
    /// The address recovered from the private key.
    pub signer: Address,
    /// The 65-byte `r ++ s ++ v` signature.
    pub signature: Bytes,
    /// The packed validity window.
    pub validity_timestamps: U256,
}

impl SignArgs {
    /// Signs the relay call.
    pub fn sign(&self, config: &KeyManagerConfig) -> Result<SignedRelayCall> {
        let payload = load_hex(self.payload.as_deref(), self.payload_file.as_deref())?
            .ok_or(CliError::MissingPayload)?;
        let key = SigningKey::from_slice(self.private_key.as_slice())?;
        let chain_id = self.chain_id.unwrap_or(config.chain_id);
        let validity_timestamps = ValidityWindow::new(self.from, self.to).packed();

        let digest = relay_call_digest(
            self.key_manager,
            chain_id,
            self.nonce,
            validity_timestamps,
            U256::ZERO,
            &payload,
        );
        let signature = sign_digest(&key, digest)?;
        let signer = public_key_to_address(key.verifying_key());
        info!(
            %signer,
            key_manager = %self.key_manager,
            chain_id,
            nonce = %self.nonce,
            "Relay call signed"
        );

        Ok(SignedRelayCall { digest, signer, signature, validity_timestamps })
    }
}

impl Cmd {
    /// Runs the action and returns what to print.
    pub fn output(&self, config: &KeyManagerConfig) -> Result<String> {
        match &self.action {
            Action::Sign(args) => {
                let signed = args.sign(config)?;
                if args.json {
                    return Ok(serde_json::to_string_pretty(&signed)?);
                }
                Ok(format!(
                    "digest {}\nsigner {}\nsignature {}",
                    signed.digest, signed.signer, signed.signature
                ))
            }
        }
    }
}
