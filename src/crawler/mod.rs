//! Crawler module for resumable inventory scans
//!
//! This module contains the core crawling logic, including:
//! - Page accumulation with checkpoint boundaries
//! - The crawl loop with save-on-failure and cancellation
//! - Crawl error classification

mod accumulator;
mod coordinator;

pub use accumulator::Accumulator;
pub use coordinator::{CrawlOutput, CrawlSettings, Crawler};

use crate::config::Config;
use crate::remote::{PageFetcher, RemoteError};
use crate::storage::{CheckpointStore, InventoryStore, SqliteStorage, StorageError};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use thiserror::Error;

/// Errors that stop a crawl
#[derive(Debug, Error)]
pub enum CrawlError {
    /// A page could not be fetched; progress up to the last good page was saved
    #[error("listing failed after {entries} files (resumable: {resumable}): {source}")]
    Fetch {
        entries: usize,
        resumable: bool,
        #[source]
        source: RemoteError,
    },

    /// A checkpoint could not be written while the listing was healthy
    #[error("failed to write checkpoint: {0}")]
    Checkpoint(#[from] StorageError),

    /// A page failed and the checkpoint after it could not be saved either
    #[error("listing failed ({fetch}) and the checkpoint could not be saved: {source}")]
    CheckpointAfterFetch {
        fetch: RemoteError,
        #[source]
        source: StorageError,
    },

    /// The stored checkpoint was taken under a different listing root
    #[error(
        "checkpoint was taken under root '{checkpoint_root}' but the configured root is \
         '{configured_root}'"
    )]
    RootMismatch {
        checkpoint_root: String,
        configured_root: String,
    },

    /// The cancel flag was raised between pages
    #[error("crawl interrupted after {entries} files (resumable: {resumable})")]
    Interrupted { entries: usize, resumable: bool },
}

impl CrawlError {
    /// Returns true if a checkpoint exists to resume from
    pub fn is_resumable(&self) -> bool {
        match self {
            Self::Fetch { resumable, .. } | Self::Interrupted { resumable, .. } => *resumable,
            Self::Checkpoint(_) | Self::CheckpointAfterFetch { .. } | Self::RootMismatch { .. } => {
                false
            }
        }
    }
}

/// Result of a finished scan
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub scan_id: i64,
    pub files: usize,
    pub folders: usize,
    pub pages_fetched: usize,
    pub resumed: bool,
}

/// Runs a complete scan and records it in the database
///
/// This is the main entry point for inventory scans. It will:
/// 1. Load the checkpoint unless `fresh` is set
/// 2. Crawl the listing to the end
/// 3. Store the inventory as a new scan
///
/// # Arguments
///
/// * `fetcher` - Source of listing pages
/// * `storage` - Database holding checkpoints and scans
/// * `config` - Loaded configuration
/// * `config_hash` - Hash recorded with the scan
/// * `fresh` - Ignore and discard any existing checkpoint
/// * `cancel` - Optional interrupt flag
pub async fn scan<F: PageFetcher>(
    fetcher: F,
    storage: SqliteStorage,
    config: &Config,
    config_hash: &str,
    fresh: bool,
    cancel: Option<Arc<AtomicBool>>,
) -> crate::Result<ScanOutcome> {
    let resume = if fresh {
        tracing::info!("Starting fresh scan (ignoring any checkpoint)");
        None
    } else {
        storage.load_checkpoint()?
    };

    let mut crawler = Crawler::new(fetcher, storage, CrawlSettings::from(&config.crawler));
    if let Some(cancel) = cancel {
        crawler = crawler.with_cancel(cancel);
    }

    let output = crawler.run(resume).await?;
    let mut storage = crawler.into_store();

    let scan_id = storage.record_scan(
        &config.crawler.root_path,
        config_hash,
        &output.entries,
        &output.folders,
    )?;
    tracing::info!("Recorded scan {}", scan_id);

    Ok(ScanOutcome {
        scan_id,
        files: output.entries.len(),
        folders: output.folders.len(),
        pages_fetched: output.pages_fetched,
        resumed: output.resumed,
    })
}
