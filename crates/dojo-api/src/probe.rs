//! Reachability probing for workspace service URLs.

use std::time::Duration;

use async_trait::async_trait;
use dojo_common::Service;
use tracing::debug;

/// What a single reachability check observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The service answered with a success status.
    Reachable,
    /// The service answered, but not yet usefully (gateway error, 404 while
    /// the container boots, ...).
    NotReady,
    /// Nothing observable came back: transport failure, blocked request.
    Unverifiable,
}

#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// HEAD-request probe.
pub struct HttpProbe {
    http: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, crate::ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::ApiError::Network(format!("failed to build probe client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        match self.http.head(url).send().await {
            Ok(response) => classify_status(response.status().as_u16()),
            Err(e) => {
                debug!(url, error = %e, "probe got no response");
                ProbeOutcome::Unverifiable
            }
        }
    }
}

/// Map an HTTP status to a probe outcome.
pub fn classify_status(status: u16) -> ProbeOutcome {
    match status {
        200..=399 => ProbeOutcome::Reachable,
        502..=504 => ProbeOutcome::NotReady,
        other => {
            debug!(status = other, "unexpected probe status, treating as not ready");
            ProbeOutcome::NotReady
        }
    }
}

/// Resolve the URL the poller should probe for `service`.
///
/// An absolute `iframe_src` is used as-is, a rooted one is joined to
/// `origin`, and without one the conventional `/workspace/<service>/`
/// path is used.
pub fn workspace_url(origin: &str, iframe_src: Option<&str>, service: Service) -> String {
    let origin = origin.trim_end_matches('/');
    match iframe_src {
        Some(src) if src.starts_with("http://") || src.starts_with("https://") => src.to_string(),
        Some(src) if src.starts_with('/') => format!("{origin}{src}"),
        Some(src) if !src.is_empty() => format!("{origin}/{src}"),
        _ => format!("{origin}{}", service.workspace_path()),
    }
}
