//! Flag input behaviour.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagConfig {
    /// Quiet period before a well-formed flag is auto-submitted.
    pub debounce_ms: u64,
    /// How long correct / already-solved feedback stays visible.
    pub success_ttl_ms: u64,
    /// How long incorrect / error feedback stays visible.
    pub failure_ttl_ms: u64,
}

impl Default for FlagConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            success_ttl_ms: 3000,
            failure_ttl_ms: 5000,
        }
    }
}

impl FlagConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn success_ttl(&self) -> Duration {
        Duration::from_millis(self.success_ttl_ms)
    }

    pub fn failure_ttl(&self) -> Duration {
        Duration::from_millis(self.failure_ttl_ms)
    }
}
