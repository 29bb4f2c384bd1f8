use serde::{Deserialize, Serialize};

/// How the key manager treats a dispatch that starts while another one is in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentrancyPolicy {
    /// Reject every nested dispatch.
    #[default]
    Forbid,
    /// Admit a nested dispatch if its controller holds the `REENTRANCY` permission.
    PermissionGated,
}

/// Configuration of a key manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyManagerConfig {
    /// The chain id bound into relay call signatures.
    pub chain_id: u64,
    /// The reentrancy policy.
    pub reentrancy: ReentrancyPolicy,
    /// Whether the signer of a relay call must hold `EXECUTE_RELAY_CALL`.
    pub relay_requires_permission: bool,
}

impl Default for KeyManagerConfig {
    fn default() -> Self {
        Self { chain_id: 1, reentrancy: ReentrancyPolicy::Forbid, relay_requires_permission: true }
    }
}

impl KeyManagerConfig {
    /// Sets the chain id.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Sets the reentrancy policy.
    pub fn with_reentrancy(mut self, reentrancy: ReentrancyPolicy) -> Self {
        self.reentrancy = reentrancy;
        self
    }

    /// Sets whether relay signers need `EXECUTE_RELAY_CALL`.
    pub fn with_relay_requires_permission(mut self, required: bool) -> Self {
        self.relay_requires_permission = required;
        self
    }
}
