//! DojoApi trait implementation for HttpDojoApi.

use async_trait::async_trait;
use dojo_common::ChallengeRef;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::types::{Dojo, Module, Solve, SolveStatus, WorkspaceQuery, WorkspaceStatus};
use crate::{ApiError, DojoApi};

use super::client::{ensure_success, error_message, HttpDojoApi};

#[derive(Deserialize)]
struct DojosBody {
    #[serde(default)]
    dojos: Vec<Dojo>,
}

#[derive(Deserialize)]
struct ModulesBody {
    #[serde(default)]
    modules: Vec<Module>,
}

#[derive(Deserialize)]
struct SolvesBody {
    #[serde(default)]
    solves: Vec<Solve>,
}

#[derive(Deserialize)]
struct DescriptionBody {
    #[serde(default)]
    description: Option<String>,
}

#[async_trait]
impl DojoApi for HttpDojoApi {
    async fn list_dojos(&self) -> Result<Vec<Dojo>, ApiError> {
        let body: DojosBody = self.get_json("/dojos", &[]).await?;
        Ok(body.dojos)
    }

    async fn list_modules(&self, dojo_id: &str) -> Result<Vec<Module>, ApiError> {
        let body: ModulesBody = self
            .get_json(&format!("/dojos/{dojo_id}/modules"), &[])
            .await?;
        Ok(body.modules)
    }

    async fn list_solves(
        &self,
        dojo_id: &str,
        username: Option<&str>,
    ) -> Result<Vec<Solve>, ApiError> {
        let query: Vec<(&str, String)> = username
            .map(|u| vec![("username", u.to_string())])
            .unwrap_or_default();
        let body: SolvesBody = self
            .get_json(&format!("/dojos/{dojo_id}/solves"), &query)
            .await?;
        Ok(body.solves)
    }

    async fn challenge_description(&self, target: &ChallengeRef) -> Result<String, ApiError> {
        let body: DescriptionBody = self
            .get_json(&format!("/dojos/{}/description", target.api_path()), &[])
            .await?;
        Ok(body.description.unwrap_or_default())
    }

    async fn submit_solve(
        &self,
        target: &ChallengeRef,
        submission: &str,
    ) -> Result<SolveStatus, ApiError> {
        let body = json!({ "submission": submission });
        let value = self
            .post_value(&format!("/dojos/{}/solve", target.api_path()), Some(&body))
            .await?;

        // A wrong flag may come back as `success: false` with a status.
        match value.get("status").and_then(Value::as_str) {
            Some(status) => {
                let status: SolveStatus = serde_json::from_value(Value::String(status.into()))
                    .map_err(|e| ApiError::Parse(format!("unknown solve status: {e}")))?;
                debug!(challenge = %target, ?status, "solve submitted");
                Ok(status)
            }
            None => {
                ensure_success(&value)?;
                Err(ApiError::Parse("solve response missing status".into()))
            }
        }
    }

    async fn start_challenge(&self, target: &ChallengeRef, practice: bool) -> Result<(), ApiError> {
        let body = json!({
            "dojo": target.dojo_id,
            "module": target.module_id,
            "challenge": target.challenge_id,
            "practice": practice,
        });
        let value = self.post_value("/docker", Some(&body)).await?;
        ensure_success(&value)?;
        info!(challenge = %target, practice, "challenge start accepted");
        Ok(())
    }

    async fn workspace_status(&self, query: &WorkspaceQuery) -> Result<WorkspaceStatus, ApiError> {
        let value = self.get_value("/workspace", &query.pairs()).await?;
        // Inactive workspaces report `success: false` with no error text.
        if value.get("success").and_then(Value::as_bool) == Some(false) {
            if let Some(message) = error_message(&value) {
                return Err(ApiError::Rejected(message));
            }
        }
        serde_json::from_value(value).map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn reset_home(&self) -> Result<(), ApiError> {
        let value = self.post_value("/workspace/reset_home", None).await?;
        ensure_success(&value)
    }

    async fn terminate_workspace(&self) -> Result<(), ApiError> {
        let value = self.post_value("/workspace/terminate", None).await?;
        ensure_success(&value)?;
        info!("workspace terminated");
        Ok(())
    }
}

