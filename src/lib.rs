//! Cloudsweep: inventory, deduplicate and bulk-clean a remote file store
//!
//! This crate crawls a paginated remote listing API into a resumable local
//! inventory, groups files by content fingerprint, derives a deletion plan
//! under configurable keep policies, and executes that plan as rate-limited
//! batch deletes.

pub mod config;
pub mod crawler;
pub mod dedupe;
pub mod deleter;
pub mod inventory;
pub mod model;
pub mod output;
pub mod remote;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Cloudsweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Remote error: {0}")]
    Remote(#[from] remote::RemoteError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] crawler::CrawlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Plan file {path}: {source}")]
    PlanFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No completed scan found in database; run `scan` first")]
    NoScan,

    #[error("Unknown target '{0}'")]
    UnknownTarget(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("No API token found (set ${env} or create {file})")]
    MissingToken { env: String, file: String },
}

/// Result type alias for Cloudsweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{CrawlCheckpoint, Entry, FolderRef, ItemOutcome, PathOutcome, RemoteRecord};
