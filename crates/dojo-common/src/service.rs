//! Workspace service modalities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One named workspace modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Terminal,
    Code,
    Desktop,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::Terminal, Service::Code, Service::Desktop];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Terminal => "terminal",
            Service::Code => "code",
            Service::Desktop => "desktop",
        }
    }

    /// Human-readable label for loading and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Service::Terminal => "Terminal",
            Service::Code => "VS Code",
            Service::Desktop => "Desktop",
        }
    }

    /// Port the workspace container exposes for this service.
    pub fn port(&self) -> u16 {
        match self {
            Service::Terminal => 7681,
            Service::Code => 8080,
            Service::Desktop => 6080,
        }
    }

    /// Proxy path of this service on the workspace origin.
    pub fn workspace_path(&self) -> String {
        format!("/workspace/{}/", self.as_str())
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "terminal" => Ok(Service::Terminal),
            "code" | "vscode" => Ok(Service::Code),
            "desktop" => Ok(Service::Desktop),
            other => Err(format!("unknown workspace service: {other}")),
        }
    }
}
