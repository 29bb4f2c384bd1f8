mod config;
mod error;
mod hex;
mod logging;

pub use config::*;
pub use error::*;
pub use hex::*;
pub use logging::*;
