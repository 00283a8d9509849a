//! HTTP client for the Dropbox v2 JSON API
//!
//! This module handles all HTTP requests against the remote store, including:
//! - Building the HTTP client and resolving endpoint URLs
//! - Decoding listing pages into `RemoteRecord`s
//! - Bulk delete submission and async job checks
//! - Bounded retry of throttled and failed requests
//! - Error classification

use crate::config::RemoteConfig;
use crate::model::{parse_timestamp, Entry, FolderRef, RemoteRecord};
use crate::remote::{
    DeleteSubmitter, ItemResult, JobStatus, Page, PageFetcher, RemoteError, SubmitResult,
};
use crate::{ConfigError, ConfigResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const LIST_FOLDER: &str = "files/list_folder";
const LIST_FOLDER_CONTINUE: &str = "files/list_folder/continue";
const DELETE_BATCH: &str = "files/delete_batch";
const DELETE_BATCH_CHECK: &str = "files/delete_batch/check";

/// Largest page the listing endpoint will return
const LIST_PAGE_LIMIT: u32 = 2000;

/// Upper bound for a single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Reads the bearer token from the configured environment variable or file
///
/// The token is treated as an opaque string; surrounding whitespace is
/// trimmed.
pub fn load_token(config: &RemoteConfig) -> ConfigResult<String> {
    if let Ok(token) = std::env::var(&config.token_env) {
        let token = token.trim();
        if !token.is_empty() {
            return Ok(token.to_string());
        }
    }

    if let Some(path) = &config.token_file {
        let token = std::fs::read_to_string(path)?;
        let token = token.trim();
        if !token.is_empty() {
            return Ok(token.to_string());
        }
    }

    Err(ConfigError::MissingToken {
        env: config.token_env.clone(),
        file: config
            .token_file
            .clone()
            .unwrap_or_else(|| "a token file".to_string()),
    })
}

/// Dropbox API client implementing both remote traits
pub struct DropboxClient {
    client: Client,
    base: Url,
    token: String,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl DropboxClient {
    /// Builds a client for the configured API base
    ///
    /// # Arguments
    ///
    /// * `config` - Remote endpoint and retry settings
    /// * `token` - Opaque bearer token
    pub fn new(config: &RemoteConfig, token: String) -> crate::Result<Self> {
        let mut base = config.api_base.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.api_base, e)))?;

        let client = Client::builder()
            .user_agent(concat!("cloudsweep/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            base,
            token,
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay),
        })
    }

    /// POSTs a JSON body, retrying transient failures with exponential backoff
    async fn call<Req, Resp>(&self, endpoint: &str, body: &Req) -> Result<Resp, RemoteError>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let mut attempt = 0;
        loop {
            match self.call_once(endpoint, body).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = retry_delay(&e, self.retry_base_delay, attempt);
                    attempt += 1;
                    tracing::warn!(
                        "{} (attempt {}/{}), retrying in {:?}",
                        e,
                        attempt,
                        self.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    async fn call_once<Req, Resp>(&self, endpoint: &str, body: &Req) -> Result<Resp, RemoteError>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.base.join(endpoint).map_err(|e| RemoteError::Api {
            endpoint: endpoint.to_string(),
            status: 0,
            summary: format!("cannot build URL: {}", e),
        })?;

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::Transient {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
                retry_after: None,
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let text = response.text().await.map_err(|e| RemoteError::Transient {
            endpoint: endpoint.to_string(),
            message: format!("reading body: {}", e),
            retry_after: None,
        })?;

        if !status.is_success() {
            return Err(classify_status(endpoint, status, retry_after, &text));
        }

        serde_json::from_str(&text).map_err(|e| RemoteError::Malformed {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_BACKOFF)
}

/// Delay before retrying `error`; a server hint wins but is capped too
fn retry_delay(error: &RemoteError, base: Duration, attempt: u32) -> Duration {
    error
        .retry_after()
        .unwrap_or_else(|| backoff_delay(base, attempt))
        .min(MAX_BACKOFF)
}

/// Maps a non-success HTTP status to a `RemoteError`
fn classify_status(
    endpoint: &str,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> RemoteError {
    let summary = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error_summary")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect());

    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return RemoteError::Transient {
            endpoint: endpoint.to_string(),
            message: format!("HTTP {}: {}", status.as_u16(), summary),
            retry_after,
        };
    }

    if status == StatusCode::CONFLICT && summary.contains("not_found") {
        return RemoteError::NotFound(summary);
    }

    RemoteError::Api {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        summary,
    }
}

/// Flattens a tagged union value into a reason like `path_lookup/not_found`
fn describe_tagged(value: &Value) -> String {
    let mut parts = Vec::new();
    let mut current = value;
    while let Some(tag) = current.get(".tag").and_then(Value::as_str) {
        parts.push(tag.to_string());
        match current.get(tag) {
            Some(next) => current = next,
            None => break,
        }
    }

    if parts.is_empty() {
        value.to_string()
    } else {
        parts.join("/")
    }
}

// ===== Wire types =====

#[derive(Debug, Deserialize)]
struct ListFolderResponse {
    entries: Vec<Value>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
enum WireMetadata {
    File {
        #[serde(default)]
        name: String,
        path_display: Option<String>,
        path_lower: Option<String>,
        size: Option<u64>,
        client_modified: Option<String>,
        content_hash: Option<String>,
    },
    Folder {
        #[serde(default)]
        name: String,
        path_display: Option<String>,
        path_lower: Option<String>,
    },
    Deleted {
        #[serde(default)]
        name: String,
        path_display: Option<String>,
        path_lower: Option<String>,
    },
}

fn display_path(name: &str, display: Option<String>, lower: Option<String>) -> Option<String> {
    display
        .or(lower)
        .or_else(|| (!name.is_empty()).then(|| format!("/{}", name)))
}

impl WireMetadata {
    /// Converts to a record, degrading missing fields
    ///
    /// Returns `None` only when no path can be recovered.
    fn into_record(self) -> Option<RemoteRecord> {
        let record = match self {
            WireMetadata::File {
                name,
                path_display,
                path_lower,
                size,
                client_modified,
                content_hash,
            } => {
                let path = display_path(&name, path_display, path_lower)?;
                let size = size.unwrap_or_else(|| {
                    tracing::warn!("Listing record {} has no size; recording 0 bytes", path);
                    0
                });
                let name = if name.is_empty() {
                    path.rsplit('/').next().unwrap_or_default().to_string()
                } else {
                    name
                };
                let modified_at = client_modified.as_deref().and_then(parse_timestamp);
                RemoteRecord::File(Entry::new(path, name, size, modified_at, content_hash))
            }
            WireMetadata::Folder {
                name,
                path_display,
                path_lower,
            } => RemoteRecord::Folder(FolderRef {
                path: display_path(&name, path_display, path_lower)?,
                name,
            }),
            WireMetadata::Deleted {
                name,
                path_display,
                path_lower,
            } => RemoteRecord::Deleted {
                path: display_path(&name, path_display, path_lower)?,
            },
        };
        Some(record)
    }
}

/// Decodes one listing record, skipping it if it cannot be used
fn decode_record(value: Value) -> Option<RemoteRecord> {
    match WireMetadata::deserialize(&value) {
        Ok(meta) => {
            let record = meta.into_record();
            if record.is_none() {
                tracing::warn!("Skipping listing record without a path: {}", value);
            }
            record
        }
        Err(e) => {
            tracing::warn!("Skipping undecodable listing record ({}): {}", e, value);
            None
        }
    }
}

impl From<ListFolderResponse> for Page {
    fn from(response: ListFolderResponse) -> Self {
        Page {
            records: response.entries.into_iter().filter_map(decode_record).collect(),
            cursor: response.cursor,
            has_more: response.has_more,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
enum WireLaunch {
    AsyncJobId { async_job_id: String },
    Complete { entries: Vec<WireEntryResult> },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
enum WireEntryResult {
    Success {},
    Failure { failure: Value },
}

impl From<WireEntryResult> for ItemResult {
    fn from(result: WireEntryResult) -> Self {
        match result {
            WireEntryResult::Success {} => ItemResult::Success,
            WireEntryResult::Failure { failure } => ItemResult::Failure(describe_tagged(&failure)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
enum WireJobStatus {
    InProgress,
    Complete { entries: Vec<WireEntryResult> },
    Failed {
        #[serde(default)]
        failed: Option<Value>,
    },
}

#[async_trait]
impl PageFetcher for DropboxClient {
    async fn list_first(&self, root: &str) -> Result<Page, RemoteError> {
        let body = json!({
            "path": root,
            "recursive": true,
            "include_deleted": false,
            "limit": LIST_PAGE_LIMIT,
        });
        let response: ListFolderResponse = self.call(LIST_FOLDER, &body).await?;
        Ok(response.into())
    }

    async fn list_continue(&self, cursor: &str) -> Result<Page, RemoteError> {
        let body = json!({ "cursor": cursor });
        let response: ListFolderResponse = self.call(LIST_FOLDER_CONTINUE, &body).await?;
        Ok(response.into())
    }
}

#[async_trait]
impl DeleteSubmitter for DropboxClient {
    async fn submit(&self, paths: &[String]) -> Result<SubmitResult, RemoteError> {
        let entries: Vec<Value> = paths.iter().map(|p| json!({ "path": p })).collect();
        let body = json!({ "entries": entries });

        match self.call::<_, WireLaunch>(DELETE_BATCH, &body).await? {
            WireLaunch::AsyncJobId { async_job_id } => Ok(SubmitResult::Async(async_job_id)),
            WireLaunch::Complete { entries } => Ok(SubmitResult::Complete(
                entries.into_iter().map(ItemResult::from).collect(),
            )),
            WireLaunch::Other => Err(RemoteError::Malformed {
                endpoint: DELETE_BATCH.to_string(),
                message: "unexpected launch tag".to_string(),
            }),
        }
    }

    async fn poll_job(&self, job_id: &str) -> Result<JobStatus, RemoteError> {
        let body = json!({ "async_job_id": job_id });

        let status = match self.call::<_, WireJobStatus>(DELETE_BATCH_CHECK, &body).await? {
            WireJobStatus::InProgress => JobStatus::InProgress,
            WireJobStatus::Complete { entries } => {
                JobStatus::Complete(entries.into_iter().map(ItemResult::from).collect())
            }
            WireJobStatus::Failed { failed } => JobStatus::Failed(
                failed
                    .as_ref()
                    .map(describe_tagged)
                    .unwrap_or_else(|| "failed".to_string()),
            ),
        };
        Ok(status)
    }
}
