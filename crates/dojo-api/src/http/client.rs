//! HTTP client struct, request plumbing and response classification.

use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::ApiError;

use super::config::HttpApiConfig;

/// reqwest-backed dojo API client.
pub struct HttpDojoApi {
    pub(crate) config: HttpApiConfig,
    pub(crate) http: reqwest::Client,
    token: RwLock<Option<String>>,
}

impl HttpDojoApi {
    pub fn new(config: HttpApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
        let token = RwLock::new(config.token.clone());
        Ok(Self {
            config,
            http,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.into());
        }
    }

    pub fn clear_token(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let value = self.get_value(path, query).await?;
        decode(value)
    }

    pub(crate) async fn get_value(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ApiError> {
        debug!(path, "GET");
        let request = self.http.get(self.url(path)).query(query);
        self.send(request).await
    }

    pub(crate) async fn post_value(
        &self,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        debug!(path, "POST");
        let mut request = self.http.post(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request).await
    }

    /// Send a request and return its JSON body.
    ///
    /// Non-2xx responses become `Rejected` when the body carries an error
    /// message, otherwise `Http`. A 2xx body is returned as-is; callers
    /// decide what `success: false` means for their endpoint.
    async fn send(&self, mut request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        if let Some(token) = self.token() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            let parsed = serde_json::from_slice::<Value>(&bytes).ok();
            if let Some(message) = parsed.as_ref().and_then(error_message) {
                return Err(ApiError::Rejected(message));
            }
            let text: String = String::from_utf8_lossy(&bytes).chars().take(200).collect();
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: text,
            });
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Parse(e.to_string()))
    }
}

/// Fail with `Rejected` when the body says `success: false`.
pub(crate) fn ensure_success(value: &Value) -> Result<(), ApiError> {
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = error_message(value).unwrap_or_else(|| "Request failed".to_string());
        return Err(ApiError::Rejected(message));
    }
    Ok(())
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    ensure_success(&value)?;
    serde_json::from_value(value).map_err(|e| ApiError::Parse(e.to_string()))
}

/// Pull a human-readable message out of an error body.
///
/// `errors` may be a string, a list of strings, or a map of field name to
/// a string or list of strings.
pub(crate) fn error_message(value: &Value) -> Option<String> {
    if let Some(errors) = value.get("errors") {
        let mut parts = Vec::new();
        collect_strings(errors, &mut parts);
        if !parts.is_empty() {
            return Some(parts.join("; "));
        }
    }
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if !s.is_empty() => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}
