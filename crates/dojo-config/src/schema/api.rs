//! Remote API connection settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the JSON API, without a trailing slash.
    pub base_url: String,
    /// Origin that relative workspace URLs (`/workspace/...`) resolve against.
    pub workspace_origin: String,
    pub connect_timeout_secs: u32,
    pub request_timeout_secs: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost/pwncollege_api/v1".into(),
            workspace_origin: "http://localhost".into(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}
