// crates/control-check-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and `config example`.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for Control Check configuration. The output is static
//! and must always parse and validate.

/// Returns a canonical example `control-check.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"dry_run = true
default_target = "https://example.com"

[assist]
mode = "fallback"

[assist.chat]
endpoint = "https://api.openai.com/v1"
model = "gpt-5-mini"
api_key_env = "OPENAI_API_KEY"
timeout_ms = 60000

[tools.http]
allow_http = true
timeout_ms = 10000
body_sample_bytes = 512
# allowed_hosts = ["example.com"]

[tools.ssh]
host = "localhost"
user = "ubuntu"
port = 22
# identity_file = "~/.ssh/id_ed25519"
connect_timeout_ms = 8000
exec_timeout_ms = 10000

[tools.database]
host = "localhost"
port = 3306
user = "readonly"
password_env = "CONTROL_CHECK_DB_PASSWORD"
connect_timeout_ms = 5000
query_timeout_ms = 30000
max_rows = 1000

[store]
type = "sqlite"
path = "control-check.db"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000

[audit]
type = "file"
path = "control-check-audit.jsonl"

[decision]
header_merge = "last_wins"

[[controls]]
control_id = "U34"
kind = "unclassified"
title = "U34: Server banner disclosure"
check = "Inspect the Server response header for version disclosure."
standard = "Server header must not reveal product versions."
improvement = "Suppress version tokens in the web server configuration."
"#,
    )
}
