//! Workspace session and poller tuning.

use std::time::Duration;

use dojo_common::Service;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Service shown when a workspace opens with no history.
    pub default_service: Service,
    /// Delay between reachability probes (valid range: 100-60000).
    pub probe_interval_ms: u64,
    /// Probes before the poller gives up (valid range: 1-600).
    pub probe_max_attempts: u32,
    /// Consecutive unverifiable probes after which the service is assumed
    /// reachable (valid range: 3-100).
    pub fail_open_after: u32,
    /// Pause after a first start is confirmed, before clearing
    /// `is_starting` (valid range: 0-10000).
    pub start_grace_ms: u64,
    /// Status refresh interval while a session is active but has no
    /// service URL yet (valid range: 5-600).
    pub status_refresh_secs: u64,
    /// Entries kept in the service-selection history (valid range: 1-50).
    pub service_history_len: usize,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            default_service: Service::Terminal,
            probe_interval_ms: 1000,
            probe_max_attempts: 30,
            fail_open_after: 3,
            start_grace_ms: 500,
            status_refresh_secs: 30,
            service_history_len: 10,
        }
    }
}

impl WorkspaceConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn start_grace(&self) -> Duration {
        Duration::from_millis(self.start_grace_ms)
    }

    pub fn status_refresh(&self) -> Duration {
        Duration::from_secs(self.status_refresh_secs)
    }
}
