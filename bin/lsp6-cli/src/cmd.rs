use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::common::{load_config, CliError, LogArgs};

/// Command-line helpers for LSP6 key managers
#[derive(Parser, Debug)]
#[command(infer_subcommands = true, version = "0.1")]
pub struct MainCmd {
    /// Logging flags
    #[command(flatten)]
    pub log_args: LogArgs,

    /// JSON file with a key manager configuration
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// The `lsp6-cli` subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode or decode permission bitmasks
    Permissions(crate::permissions::Cmd),
    /// Print the data keys holding a controller's permissions
    Keys(crate::keys::Cmd),
    /// Pack or split relay call nonces
    Nonce(crate::nonce::Cmd),
    /// Sign relay calls
    Relay(crate::relay::Cmd),
}

/// Error types for the main command system
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A subcommand failed.
    #[error("{0}")]
    Cli(#[from] CliError),
}

impl MainCmd {
    /// Execute the main command and return what it prints.
    pub fn output(&self) -> Result<String, Error> {
        let output = match &self.command {
            Command::Permissions(cmd) => cmd.output()?,
            Command::Keys(cmd) => cmd.output()?,
            Command::Nonce(cmd) => cmd.output()?,
            Command::Relay(cmd) => cmd.output(&load_config(self.config.as_deref())?)?,
        };
        debug!(bytes = output.len(), "Command finished");
        Ok(output)
    }

    /// Execute the main command
    pub fn run(&self) -> Result<(), Error> {
        println!("{}", self.output()?);
        Ok(())
    }
}
