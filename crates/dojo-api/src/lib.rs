//! Remote dojo API for the workspace client.
//!
//! Provides:
//! - The [`DojoApi`] trait consumed by the workspace core
//! - Wire types for catalog, solve and workspace responses
//! - [`HttpDojoApi`], the reqwest implementation with bearer auth
//! - [`HttpProbe`], the HEAD-based reachability probe used by the poller

pub mod http;
pub mod probe;
pub mod types;

use async_trait::async_trait;
use dojo_common::{ChallengeRef, DojoError};

pub use http::{AuthSession, HttpApiConfig, HttpDojoApi, RegisterRequest};
pub use probe::{workspace_url, HttpProbe, Probe, ProbeOutcome};
pub use types::{
    Challenge, Dojo, Module, RemoteChallenge, Resource, Solve, SolveStatus, WorkspaceQuery,
    WorkspaceStatus,
};

/// Everything the workspace core needs from the server.
///
/// Mutating calls (`submit_solve`, `start_challenge`, `reset_home`,
/// `terminate_workspace`) are never retried by implementations.
#[async_trait]
pub trait DojoApi: Send + Sync {
    async fn list_dojos(&self) -> Result<Vec<Dojo>, ApiError>;

    async fn list_modules(&self, dojo_id: &str) -> Result<Vec<Module>, ApiError>;

    async fn list_solves(
        &self,
        dojo_id: &str,
        username: Option<&str>,
    ) -> Result<Vec<Solve>, ApiError>;

    async fn challenge_description(&self, target: &ChallengeRef) -> Result<String, ApiError>;

    async fn submit_solve(
        &self,
        target: &ChallengeRef,
        submission: &str,
    ) -> Result<SolveStatus, ApiError>;

    async fn start_challenge(&self, target: &ChallengeRef, practice: bool) -> Result<(), ApiError>;

    async fn workspace_status(&self, query: &WorkspaceQuery) -> Result<WorkspaceStatus, ApiError>;

    async fn reset_home(&self) -> Result<(), ApiError>;

    async fn terminate_workspace(&self) -> Result<(), ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Transport failure; no response was received.
    #[error("network error: {0}")]
    Network(String),
    /// Non-2xx response without a structured error body.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    /// Structured `success: false` response; the message is shown verbatim.
    #[error("{0}")]
    Rejected(String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// Message suitable for showing next to the control that triggered it.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "Network error".to_string(),
            ApiError::Http { status, .. } => format!("HTTP {status}"),
            ApiError::Rejected(msg) => msg.clone(),
            ApiError::Parse(_) => "Unexpected response from server".to_string(),
        }
    }
}

impl From<ApiError> for DojoError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(msg) => DojoError::Network(msg),
            other => DojoError::Api(other.to_string()),
        }
    }
}
