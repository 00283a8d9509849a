//! Shared helpers for the integration tests

use cloudsweep::config::{parse_config, Config};
use cloudsweep::remote::DropboxClient;
use serde_json::{json, Value};
use std::path::Path;
use wiremock::MockServer;

pub const TOKEN: &str = "test-token";

/// Builds a validated config pointing at the mock server
///
/// `extra` is appended verbatim, e.g. `[[target]]` tables.
pub fn test_config(
    server: &MockServer,
    dir: &Path,
    checkpoint_interval: usize,
    extra: &str,
) -> Config {
    let toml = format!(
        r#"
[remote]
api-base = "{base}/2/"
token-env = "CLOUDSWEEP_IT_TOKEN_UNUSED"
max-retries = 1
retry-base-delay = 1
request-timeout = 5

[crawler]
checkpoint-interval = {interval}

[deleter]
chunk-size = 2
poll-interval = 1
inter-batch-delay = 0
error-backoff = 0
max-poll-attempts = 3

[output]
database-path = "{db}"
plan-dir = "{dir}"
{extra}
"#,
        base = server.uri(),
        interval = checkpoint_interval,
        db = dir.join("sweep.db").display(),
        dir = dir.display(),
        extra = extra,
    );
    parse_config(&toml).expect("test config should be valid")
}

pub fn client(config: &Config) -> DropboxClient {
    DropboxClient::new(&config.remote, TOKEN.to_string()).expect("client should build")
}

pub fn file_json(path: &str, size: u64, hash: &str) -> Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    json!({
        ".tag": "file",
        "name": name,
        "path_display": path,
        "path_lower": path.to_lowercase(),
        "id": format!("id:{}", path),
        "client_modified": "2019-03-01T12:00:00Z",
        "server_modified": "2019-03-01T12:00:05Z",
        "rev": "015",
        "size": size,
        "content_hash": hash,
    })
}

pub fn folder_json(path: &str) -> Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    json!({
        ".tag": "folder",
        "name": name,
        "path_display": path,
        "path_lower": path.to_lowercase(),
        "id": format!("id:{}", path),
    })
}

pub fn page_json(entries: Vec<Value>, cursor: &str, has_more: bool) -> Value {
    json!({
        "entries": entries,
        "cursor": cursor,
        "has_more": has_more,
    })
}

pub fn success_json() -> Value {
    json!({
        ".tag": "success",
        "metadata": { ".tag": "file", "name": "x", "path_display": "/x" }
    })
}

pub fn not_found_json() -> Value {
    json!({
        ".tag": "failure",
        "failure": { ".tag": "path_lookup", "path_lookup": { ".tag": "not_found" } }
    })
}

pub fn failure_json(tag: &str) -> Value {
    json!({
        ".tag": "failure",
        "failure": { ".tag": "path_write", "path_write": { ".tag": tag } }
    })
}
