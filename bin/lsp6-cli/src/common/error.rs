use std::path::PathBuf;

use alloy_primitives::hex::FromHexError;

/// Errors of the `lsp6-cli` commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The log file could not be created.
    #[error("Failed to create log file {}: {error}", path.display())]
    LogFile {
        /// The requested path.
        path: PathBuf,
        /// The underlying failure.
        error: std::io::Error,
    },

    /// Failed to read a file.
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    /// The configuration file is not a valid key manager configuration.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Invalid hex string.
    #[error("Invalid hex string: {0}")]
    InvalidHex(#[from] FromHexError),

    /// A permission name that is not part of LSP6.
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    /// A permission value that is not a 32-byte word.
    #[error("Permission value must be 32 bytes, got {0}")]
    InvalidPermissionWord(usize),

    /// Neither `--payload` nor `--payload.file` was given.
    #[error("Missing payload: pass --payload or --payload.file")]
    MissingPayload,

    /// The private key is not a valid secp256k1 scalar, or signing failed.
    #[error("Signing error: {0}")]
    Signing(#[from] k256::ecdsa::Error),
}

/// Result type of the `lsp6-cli` commands.
pub type Result<T> = std::result::Result<T, CliError>;
