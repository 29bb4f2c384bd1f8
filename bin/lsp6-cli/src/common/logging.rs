//! Logging flags shared by every subcommand.
//!
//! - `-v` flags raise the verbosity
//! - `RUST_LOG` overrides the flags
//! - `--log.file` redirects logs away from stderr

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use super::{CliError, Result};

/// Logging configuration arguments.
#[derive(Debug, Clone, Default, Parser)]
pub struct LogArgs {
    /// Increase logging verbosity (-v = error, -vv = warn, -vvv = info, -vvvv = debug, -vvvvv =
    /// trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log file path. If specified, logs are written to this file instead of stderr.
    #[arg(long = "log.file", visible_aliases = ["log-file"], global = true)]
    pub log_file: Option<PathBuf>,

    /// Disable colorful console logging. Only applies when logging to stderr (no --log.file).
    #[arg(long = "log.no-color", visible_aliases = ["log-no-color"], global = true)]
    pub log_no_color: bool,
}

impl LogArgs {
    /// The filter selected by `RUST_LOG` or, failing that, by the `-v` flags. No flag means no
    /// logs.
    pub fn filter(&self) -> EnvFilter {
        if std::env::var("RUST_LOG").is_ok() {
            return EnvFilter::from_default_env();
        }
        let level = match self.verbose {
            0 => return EnvFilter::new("off"),
            1 => Level::ERROR,
            2 => Level::WARN,
            3 => Level::INFO,
            4 => Level::DEBUG,
            _ => Level::TRACE,
        };
        EnvFilter::new(format!("lsp6_cli={level},lsp6_key_manager={level}"))
    }

    /// Installs the global tracing subscriber.
    ///
    /// The log target is only shown from DEBUG on.
    pub fn init(&self) -> Result<()> {
        let show_target = self.verbose >= 4;

        if let Some(log_file) = &self.log_file {
            let file = std::fs::File::create(log_file).map_err(|error| CliError::LogFile {
                path: log_file.clone(),
                error,
            })?;
            fmt()
                .with_env_filter(self.filter())
                .with_target(show_target)
                .with_writer(file)
                .with_ansi(false)
                .init();
        } else {
            fmt()
                .with_env_filter(self.filter())
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .with_ansi(!self.log_no_color)
                .init();
        }
        Ok(())
    }
}
