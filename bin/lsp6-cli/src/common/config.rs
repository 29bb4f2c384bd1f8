use std::path::Path;

use lsp6_key_manager::KeyManagerConfig;
use tracing::debug;

use super::Result;

/// Loads a [`KeyManagerConfig`] from a JSON file. Missing fields keep their defaults, and no
/// file means the default configuration.
pub fn load_config(path: Option<&Path>) -> Result<KeyManagerConfig> {
    let Some(path) = path else {
        return Ok(KeyManagerConfig::default());
    };
    let config: KeyManagerConfig = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    debug!(path = %path.display(), chain_id = config.chain_id, "Configuration loaded");
    Ok(config)
}
