//! Wire types for the dojo REST API.

use chrono::{DateTime, Utc};
use dojo_common::{ChallengeRef, Service};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dojo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub official: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub challenges: Vec<Challenge>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Module {
    pub fn challenge(&self, challenge_id: &str) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.id == challenge_id)
    }

    pub fn resource(&self, resource_id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == resource_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solve {
    pub module_id: String,
    pub challenge_id: String,
    pub timestamp: DateTime<Utc>,
    /// Present on dojo-wide listings; the server sends it as a number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Correct,
    Incorrect,
    AlreadySolved,
}

/// Challenge the remote workspace is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteChallenge {
    #[serde(alias = "dojo")]
    pub dojo_id: String,
    #[serde(alias = "module")]
    pub module_id: String,
    #[serde(alias = "challenge")]
    pub challenge_id: String,
    #[serde(default)]
    pub challenge_name: Option<String>,
}

impl RemoteChallenge {
    pub fn target(&self) -> ChallengeRef {
        ChallengeRef::new(&self.dojo_id, &self.module_id, &self.challenge_id)
    }
}

/// Result of `GET /workspace`. Fetched fresh, never used as navigation truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceStatus {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub iframe_src: Option<String>,
    #[serde(default)]
    pub current_challenge: Option<RemoteChallenge>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceQuery {
    pub service: Option<Service>,
    pub theme: Option<String>,
}

impl WorkspaceQuery {
    pub fn for_service(service: Service) -> Self {
        Self {
            service: Some(service),
            theme: None,
        }
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(service) = self.service {
            pairs.push(("service", service.as_str().to_string()));
        }
        if let Some(theme) = &self.theme {
            pairs.push(("theme", theme.clone()));
        }
        pairs
    }
}
