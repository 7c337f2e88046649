//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Dojo client configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.
# DOJO_API_URL, DOJO_WORKSPACE_ORIGIN and DOJO_TOKEN override this file.

[api]
base_url = "http://localhost/pwncollege_api/v1"
workspace_origin = "http://localhost"
# connect_timeout_secs = 10   # 1-120
# request_timeout_secs = 30   # 1-600

[workspace]
# default_service = "terminal"  # terminal | code | desktop
# probe_interval_ms = 1000      # 100-60000
# probe_max_attempts = 30       # 1-600
# fail_open_after = 3           # 3-100
# start_grace_ms = 500          # 0-10000
# status_refresh_secs = 30      # 5-600
# service_history_len = 10      # 1-50

[flag]
# debounce_ms = 500             # 0-5000
# success_ttl_ms = 3000         # 500-30000
# failure_ttl_ms = 5000         # 500-30000

[appearance]
# theme = "dark"

[logging]
# level = "info"                # trace | debug | info | warn | error
"##
    .to_string()
}
