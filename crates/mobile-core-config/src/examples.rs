// crates/mobile-core-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for operators and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for Mobile Core configuration. The example is parsed
//! and validated by the crate tests so it cannot drift from the model.

/// Returns a canonical example `mobile-core.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "127.0.0.1:3001"
max_body_bytes = 1048576
token_headers = ["authorization", "x-forwarded-access-token"]

[server.audit]
enabled = true
# path = "mobile-core-audit.jsonl"

# [server.tls]
# cert_path = "tls/server.crt"
# key_path = "tls/server.key"

[cluster]
host = "https://openshift.default.svc"
namespace = "mobile"
resource = "deploymentconfigs"
skip_tls_verify = false
connect_timeout_ms = 5000
request_timeout_ms = 10000
max_response_bytes = 1048576

[store]
type = "sqlite"
path = "mobile-core.db"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000

[registry]
name = "mcp-mobile-keys"
max_update_attempts = 8
"#,
    )
}
