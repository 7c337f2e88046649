//! Persisted client state: auth token and user, theme choice and the
//! service-selection history.
//!
//! Stored as JSON next to the platform data directory and written
//! atomically (write to `.tmp`, then rename).

use std::path::{Path, PathBuf};

use dojo_common::{ConfigError, Service};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientState {
    pub auth_token: Option<String>,
    /// Account the token belongs to, used to scope solve lists.
    pub username: Option<String>,
    pub theme: Option<String>,
    /// Most recent first, no duplicates.
    pub service_history: Vec<Service>,
}

impl ClientState {
    /// Move `service` to the front of the history, trimming to `max_len`.
    pub fn record_service(&mut self, service: Service, max_len: usize) {
        self.service_history.retain(|s| *s != service);
        self.service_history.insert(0, service);
        self.service_history.truncate(max_len.max(1));
    }

    /// The last service the user selected, if any.
    pub fn last_service(&self) -> Option<Service> {
        self.service_history.first().copied()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.auth_token = Some(token.into());
    }

    /// Forget the token and the user it belongs to.
    pub fn clear_token(&mut self) {
        self.auth_token = None;
        self.username = None;
    }
}

/// Platform path of the state file (`<data_dir>/dojo/state.json`).
pub fn default_state_path() -> Result<PathBuf, ConfigError> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ConfigError::StateError("could not determine data directory".into()))?;
    Ok(data_dir.join("dojo").join("state.json"))
}

/// Load state from `path`; a missing file yields the empty state.
pub fn load_state_from_path(path: &Path) -> Result<ClientState, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ClientState::default()),
        Err(e) => {
            return Err(ConfigError::StateError(format!(
                "failed to read {}: {e}",
                path.display()
            )))
        }
    };
    serde_json::from_str(&content)
        .map_err(|e| ConfigError::StateError(format!("failed to parse {}: {e}", path.display())))
}

/// Write state to `path`, creating parent directories as needed.
pub fn save_state_to_path(state: &ClientState, path: &Path) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| ConfigError::StateError(format!("failed to serialize state: {e}")))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::StateError(format!(
                "failed to create state directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &json).map_err(|e| {
        ConfigError::StateError(format!("failed to write {}: {e}", tmp_path.display()))
    })?;

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        tracing::warn!("atomic rename failed ({}), falling back to direct write", e);
        std::fs::write(path, &json).map_err(|e2| {
            ConfigError::StateError(format!("failed to write {}: {e2}", path.display()))
        })?;
    }

    tracing::debug!(path = %path.display(), "client state saved");
    Ok(())
}
