//! Per-section validators.

use crate::schema::DojoConfig;

use super::helpers::{validate_http_url, validate_range};

pub(crate) fn validate_api(errors: &mut Vec<String>, config: &DojoConfig) {
    validate_http_url(errors, "api.base_url", &config.api.base_url);
    validate_http_url(errors, "api.workspace_origin", &config.api.workspace_origin);
    validate_range(
        errors,
        "api.connect_timeout_secs",
        config.api.connect_timeout_secs,
        1,
        120,
    );
    validate_range(
        errors,
        "api.request_timeout_secs",
        config.api.request_timeout_secs,
        1,
        600,
    );
}

pub(crate) fn validate_workspace(errors: &mut Vec<String>, config: &DojoConfig) {
    let ws = &config.workspace;
    validate_range(errors, "workspace.probe_interval_ms", ws.probe_interval_ms, 100, 60_000);
    validate_range(errors, "workspace.probe_max_attempts", ws.probe_max_attempts, 1, 600);
    validate_range(errors, "workspace.fail_open_after", ws.fail_open_after, 3, 100);
    validate_range(errors, "workspace.start_grace_ms", ws.start_grace_ms, 0, 10_000);
    validate_range(errors, "workspace.status_refresh_secs", ws.status_refresh_secs, 5, 600);
    validate_range(errors, "workspace.service_history_len", ws.service_history_len, 1, 50);
}

pub(crate) fn validate_flag(errors: &mut Vec<String>, config: &DojoConfig) {
    let flag = &config.flag;
    validate_range(errors, "flag.debounce_ms", flag.debounce_ms, 0, 5_000);
    validate_range(errors, "flag.success_ttl_ms", flag.success_ttl_ms, 500, 30_000);
    validate_range(errors, "flag.failure_ttl_ms", flag.failure_ttl_ms, 500, 30_000);
}
