//! Account endpoints: login, registration, password reset, logout.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::ApiError;

use super::client::{ensure_success, HttpDojoApi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl HttpDojoApi {
    /// Log in with a username or email. On success the returned token is
    /// attached to every later request.
    pub async fn login(&self, name: &str, password: &str) -> Result<AuthSession, ApiError> {
        let body = json!({ "name": name, "password": password });
        let value = self.post_value("/auth/login", Some(&body)).await?;
        ensure_success(&value)?;
        let session = auth_session(&value);
        match &session.token {
            Some(token) => self.set_token(token.clone()),
            None => return Err(ApiError::Parse("login response missing token".into())),
        }
        info!(user = name, "logged in");
        Ok(session)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthSession, ApiError> {
        let body =
            serde_json::to_value(request).map_err(|e| ApiError::Parse(e.to_string()))?;
        let value = self.post_value("/auth/register", Some(&body)).await?;
        ensure_success(&value)?;
        let session = auth_session(&value);
        if let Some(token) = &session.token {
            self.set_token(token.clone());
        }
        info!(user = %request.name, "registered");
        Ok(session)
    }

    /// Request a password-reset email; returns the server's message.
    pub async fn forgot_password(&self, email: &str) -> Result<String, ApiError> {
        let body = json!({ "email": email });
        let value = self.post_value("/auth/forgot-password", Some(&body)).await?;
        ensure_success(&value)?;
        Ok(value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("If that account exists, a reset email has been sent.")
            .to_string())
    }

    /// Forget the token. No server round-trip.
    pub fn logout(&self) {
        self.clear_token();
        info!("logged out");
    }
}

/// Token and username from either `{data:{token,..}}` or a flat body.
fn auth_session(value: &Value) -> AuthSession {
    let data = value.get("data").unwrap_or(value);
    let field = |key: &str| {
        data.get(key)
            .or_else(|| value.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let username = field("username").or_else(|| {
        data.get("user")
            .and_then(|u| u.get("username").or_else(|| u.get("name")))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    AuthSession {
        token: field("token"),
        username,
    }
}
