//! Remote file store collaborators
//!
//! The crawler and the batch deleter only see the two traits defined here.
//! [`DropboxClient`] implements both over the HTTP JSON API; tests substitute
//! in-memory fakes.

mod http;

pub use http::{load_token, DropboxClient};

use crate::model::RemoteRecord;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by remote collaborators
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Network failure, throttling or server error; worth retrying later
    #[error("{endpoint}: transient failure: {message}")]
    Transient {
        endpoint: String,
        message: String,
        retry_after: Option<Duration>,
    },

    /// The addressed path does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The remote rejected the request
    #[error("{endpoint}: HTTP {status}: {summary}")]
    Api {
        endpoint: String,
        status: u16,
        summary: String,
    },

    /// A response body could not be decoded
    #[error("{endpoint}: malformed response: {message}")]
    Malformed { endpoint: String, message: String },
}

impl RemoteError {
    /// Returns true for errors that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Server-requested wait before the next attempt, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Transient { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// One page of a recursive listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub records: Vec<RemoteRecord>,
    /// Cursor that resumes after this page
    pub cursor: String,
    pub has_more: bool,
}

/// Paginated, cursor-based listing
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Starts a recursive listing of `root` ("" for the whole store)
    async fn list_first(&self, root: &str) -> Result<Page, RemoteError>;

    /// Fetches the page following `cursor`
    async fn list_continue(&self, cursor: &str) -> Result<Page, RemoteError>;
}

/// Per-path result reported by the remote for a delete batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemResult {
    Success,
    Failure(String),
}

/// Immediate answer to a batch submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResult {
    /// Results in submission order
    Complete(Vec<ItemResult>),
    /// The remote accepted the batch as an async job
    Async(String),
}

/// State of an async delete job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    InProgress,
    Complete(Vec<ItemResult>),
    /// The job as a whole failed
    Failed(String),
}

/// Bulk delete submission and async job polling
#[async_trait]
pub trait DeleteSubmitter: Send + Sync {
    async fn submit(&self, paths: &[String]) -> Result<SubmitResult, RemoteError>;

    async fn poll_job(&self, job_id: &str) -> Result<JobStatus, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let err = RemoteError::Transient {
            endpoint: "files/list_folder".into(),
            message: "HTTP 503".into(),
            retry_after: Some(Duration::from_secs(3)),
        };
        assert!(err.is_transient());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));

        let err = RemoteError::NotFound("path/not_found/".into());
        assert!(!err.is_transient());
        assert_eq!(err.retry_after(), None);
    }
}
