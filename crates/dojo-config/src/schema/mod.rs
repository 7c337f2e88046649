//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod api;
mod flag;
mod system;
mod workspace;

pub use api::*;
pub use flag::*;
pub use system::*;
pub use workspace::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DojoConfig {
    pub api: ApiConfig,
    pub workspace: WorkspaceConfig,
    pub flag: FlagConfig,
    pub appearance: AppearanceConfig,
    pub logging: LoggingConfig,
}
