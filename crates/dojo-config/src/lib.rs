//! Dojo client configuration.
//!
//! TOML-based configuration with serde defaults for every section, plus the
//! small JSON state file that remembers the auth token, theme and service
//! selection between runs.
//!
//! ```rust,no_run
//! use dojo_config::load_config;
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("{}", config.api.base_url);
//! ```

pub mod client_state;
pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use client_state::{default_state_path, load_state_from_path, save_state_to_path, ClientState};
pub use schema::{DojoConfig, CONFIG_SCHEMA_VERSION};

use std::path::Path;

use dojo_common::ConfigError;

/// Environment variable overriding `api.base_url`.
pub const ENV_API_URL: &str = "DOJO_API_URL";
/// Environment variable overriding `api.workspace_origin`.
pub const ENV_WORKSPACE_ORIGIN: &str = "DOJO_WORKSPACE_ORIGIN";
/// Environment variable supplying an auth token without logging in.
pub const ENV_TOKEN: &str = "DOJO_TOKEN";

/// Load config from `path`, or from the platform default path when `None`,
/// then apply environment overrides and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<DojoConfig, ConfigError> {
    let mut config = match path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validation::validate(&config)?;
    Ok(config)
}

/// Apply `DOJO_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides(config: &mut DojoConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
        tracing::debug!("api.base_url overridden from {ENV_API_URL}");
        config.api.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(origin) = lookup(ENV_WORKSPACE_ORIGIN).filter(|v| !v.is_empty()) {
        tracing::debug!("api.workspace_origin overridden from {ENV_WORKSPACE_ORIGIN}");
        config.api.workspace_origin = origin.trim_end_matches('/').to_string();
    }
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &DojoConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
